use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One frame's extracted value.
///
/// `value` is `None` when OCR or parsing failed; `raw_text` keeps whatever
/// the OCR engine returned so failures can be diagnosed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reading {
    /// Sequence index of the frame this reading belongs to
    pub index: usize,
    pub value: Option<f64>,
    pub raw_text: String,
}

impl Reading {
    pub fn present(index: usize, value: f64, raw_text: impl Into<String>) -> Self {
        Self {
            index,
            value: Some(value),
            raw_text: raw_text.into(),
        }
    }

    pub fn absent(index: usize, raw_text: impl Into<String>) -> Self {
        Self {
            index,
            value: None,
            raw_text: raw_text.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}
