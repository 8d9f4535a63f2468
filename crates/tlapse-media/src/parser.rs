//! Text-to-value parsers applied to OCR output.

use std::sync::OnceLock;

use regex::Regex;

/// Turns raw OCR text into a value.
///
/// Injected into the pipeline at construction; any
/// `Fn(&str) -> Option<f64>` closure is also a parser.
pub trait ReadingParser: Send + Sync {
    fn parse(&self, raw_text: &str) -> Option<f64>;
}

impl<F> ReadingParser for F
where
    F: Fn(&str) -> Option<f64> + Send + Sync,
{
    fn parse(&self, raw_text: &str) -> Option<f64> {
        self(raw_text)
    }
}

/// Default parser for trail-camera footers carrying two temperature
/// readings, Celsius first: `... -3°C 27°F`.
///
/// Takes the text between the first and second `°`, and returns its second
/// space-separated token (the Fahrenheit value).
#[derive(Debug, Clone, Copy, Default)]
pub struct FooterTemperatureParser;

impl ReadingParser for FooterTemperatureParser {
    fn parse(&self, raw_text: &str) -> Option<f64> {
        let segment = raw_text.split('°').nth(1)?;
        let token = segment.split(' ').nth(1)?;
        token.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Returns the first signed decimal number found anywhere in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstNumberParser;

fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("valid number pattern"))
}

impl ReadingParser for FirstNumberParser {
    fn parse(&self, raw_text: &str) -> Option<f64> {
        number_pattern()
            .find(raw_text)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_parser_takes_fahrenheit() {
        let parser = FooterTemperatureParser;
        assert_eq!(parser.parse("2023-01-14 07:32 -3°C 27°F"), Some(27.0));
        assert_eq!(parser.parse("12°C 54°F CAM1"), Some(54.0));
    }

    #[test]
    fn test_footer_parser_rejects_malformed_text() {
        let parser = FooterTemperatureParser;
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("no degrees here"), None);
        assert_eq!(parser.parse("12°C"), None);
        assert_eq!(parser.parse("12°C ??°F"), None);
    }

    #[test]
    fn test_first_number_parser() {
        let parser = FirstNumberParser;
        assert_eq!(parser.parse("72°F / 22°C"), Some(72.0));
        assert_eq!(parser.parse("temp: -4.5 C"), Some(-4.5));
        assert_eq!(parser.parse("---"), None);
    }

    #[test]
    fn test_closure_parser() {
        let parser = |raw: &str| -> Option<f64> { raw.trim().strip_suffix('F')?.parse().ok() };
        assert_eq!(parser.parse(" 41F "), Some(41.0));
        assert_eq!(parser.parse("41C"), None);
    }
}
