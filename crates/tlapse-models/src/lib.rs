//! Shared data models for the timelapse pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Frames and their playback order
//! - OCR regions of interest and per-frame readings
//! - Graph overlay and encoding configuration
//! - The validated, immutable run configuration

pub mod color;
pub mod config;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod graph;
pub mod options;
pub mod reading;
pub mod rect;

// Re-export common types
pub use color::Color;
pub use config::{dwell_frames, TimelapseConfig};
pub use encoding::EncodingConfig;
pub use error::{ConfigError, ConfigResult};
pub use frame::{Frame, FrameOrder};
pub use graph::{GraphAnchor, GraphConfig};
pub use options::TimelapseOptions;
pub use reading::Reading;
pub use rect::Roi;
