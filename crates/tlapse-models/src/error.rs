//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid option values or option combinations, detected before any frame
/// is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Malformed region of interest ({x0}, {y0}, {x1}, {y1}): requires x0 < x1 and y0 < y1")]
    InvalidRoi { x0: u32, y0: u32, x1: u32, y1: u32 },

    #[error("Cannot parse region of interest '{0}': expected x0,y0,x1,y1")]
    InvalidRoiSpec(String),

    #[error("images_per_second must be greater than zero")]
    ZeroImageRate,

    #[error("framerate ({framerate}) must be at least images_per_second ({images_per_second})")]
    FramerateBelowImageRate {
        framerate: u32,
        images_per_second: u32,
    },

    #[error("Graph of {width}x{height} cannot fit a padding of {padding} on each side")]
    GraphTooSmall { width: u32, height: u32, padding: u32 },

    #[error("Tick interval must be a positive number, got {0}")]
    InvalidTickInterval(f64),

    #[error("Label font size must be positive, got {0}")]
    InvalidFontSize(f32),

    #[error("Worker count must be at least 1")]
    ZeroWorkers,

    #[error("At least one file extension must be configured")]
    NoExtensions,

    #[error("Font file not found: {0}")]
    FontNotFound(PathBuf),

    #[error("Unknown color: {0}")]
    InvalidColor(String),

    #[error("Unknown frame order '{0}': expected created, modified or filename")]
    InvalidOrder(String),

    #[error("Unknown graph anchor '{0}'")]
    InvalidAnchor(String),
}
