//! RGBA colors for the graph overlay.

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// An 8-bit RGBA color.
///
/// Accepted from JSON as a name (`"white"`), a hex string (`"#1dd6ff"` or
/// `"#1dd6ffff"`) or an array of three or four channel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels in `[r, g, b, a]` order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "white" => Color::WHITE,
            "black" => Color::BLACK,
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "lime" => Color::rgb(0, 255, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "cyan" => Color::rgb(0, 255, 255),
            "magenta" => Color::rgb(255, 0, 255),
            "orange" => Color::rgb(255, 165, 0),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            "transparent" => Color::TRANSPARENT,
            _ => return None,
        };
        Some(color)
    }

    fn from_hex(hex: &str) -> Option<Self> {
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Color::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix('#') {
            Some(hex) => Color::from_hex(hex),
            None => Color::named(&trimmed.to_lowercase()),
        };
        parsed.ok_or_else(|| ConfigError::InvalidColor(s.to_string()))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Text(String),
    Rgba([u8; 4]),
    Rgb([u8; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = ConfigError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Text(text) => text.parse(),
            ColorRepr::Rgba([r, g, b, a]) => Ok(Color::rgba(r, g, b, a)),
            ColorRepr::Rgb([r, g, b]) => Ok(Color::rgb(r, g, b)),
        }
    }
}

impl JsonSchema for Color {
    fn schema_name() -> String {
        "Color".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        // Serialized form is always the four-channel array.
        <[u8; 4]>::json_schema(gen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_hex() {
        assert_eq!("White".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(
            "#1dd6ff".parse::<Color>().unwrap(),
            Color::rgba(29, 214, 255, 255)
        );
        assert_eq!(
            "#000000c8".parse::<Color>().unwrap(),
            Color::rgba(0, 0, 0, 200)
        );
        assert!("#12345".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn test_deserialize_variants() {
        let named: Color = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(named, Color::BLACK);

        let rgba: Color = serde_json::from_str("[255, 255, 255, 150]").unwrap();
        assert_eq!(rgba, Color::rgba(255, 255, 255, 150));

        let rgb: Color = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(rgb, Color::rgb(1, 2, 3));

        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn test_serializes_as_array() {
        let json = serde_json::to_string(&Color::rgba(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "[1,2,3,4]");
    }
}
