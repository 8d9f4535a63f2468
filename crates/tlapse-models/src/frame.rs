//! Frame identity and playback ordering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// A single source image in playback order.
///
/// Frames are produced by the frame source and consumed read-only by every
/// later stage. `index` is 0-based and contiguous across a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Frame {
    /// Stable identifier: the path relative to the images directory
    pub id: String,
    /// Absolute or caller-relative path to the source image
    pub path: PathBuf,
    /// Playback position (0-based, contiguous)
    pub index: usize,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            index,
        }
    }

    /// Lowercased file extension of the source, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

/// How discovered images are put into playback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrder {
    /// File creation (birth) timestamp
    Created,
    /// Last-modified timestamp
    Modified,
    /// File name, byte-wise
    #[default]
    Filename,
}

impl FrameOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameOrder::Created => "created",
            FrameOrder::Modified => "modified",
            FrameOrder::Filename => "filename",
        }
    }
}

impl fmt::Display for FrameOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FrameOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" | "ctime" => Ok(FrameOrder::Created),
            "modified" | "mtime" => Ok(FrameOrder::Modified),
            "filename" | "name" => Ok(FrameOrder::Filename),
            _ => Err(ConfigError::InvalidOrder(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_str() {
        assert_eq!("created".parse::<FrameOrder>().unwrap(), FrameOrder::Created);
        assert_eq!("MTIME".parse::<FrameOrder>().unwrap(), FrameOrder::Modified);
        assert_eq!("name".parse::<FrameOrder>().unwrap(), FrameOrder::Filename);
        assert!("random".parse::<FrameOrder>().is_err());
    }

    #[test]
    fn test_order_serde_roundtrip_name() {
        let json = serde_json::to_string(&FrameOrder::Modified).unwrap();
        assert_eq!(json, "\"modified\"");
    }

    #[test]
    fn test_frame_extension_is_lowercased() {
        let frame = Frame::new("IMG_001.JPG", "/photos/IMG_001.JPG", 0);
        assert_eq!(frame.extension().as_deref(), Some("jpg"));
    }
}
