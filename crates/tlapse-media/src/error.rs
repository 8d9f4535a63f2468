//! Error types for the timelapse pipeline.
//!
//! [`MediaError`] is fatal to a `make_video` call. [`ExtractionError`] and
//! [`CompositeError`] are per-frame and only ever logged and counted.

use std::path::PathBuf;
use thiserror::Error;
use tlapse_models::{ConfigError, Roi};

use crate::ocr::OcrError;

/// Result type for pipeline operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No images matching {extensions:?} found in {dir}")]
    EmptyInput {
        dir: PathBuf,
        extensions: Vec<String>,
    },

    #[error("Cannot list source directory {path}: {source}")]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Cannot load font {path}: {message}")]
    InvalidFont { path: PathBuf, message: String },

    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(#[source] OcrError),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Encoding failed: {message}")]
    EncodeFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("No frame of {discovered} could be staged for encoding")]
    NothingStaged { discovered: usize },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an encoder failure error.
    pub fn encode_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn unreadable_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::UnreadableSource {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Pipeline stage the error belongs to, for logs and reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::EmptyInput { .. } | Self::UnreadableSource { .. } => "frame_source",
            Self::Configuration(_) | Self::InvalidFont { .. } => "configuration",
            Self::OcrUnavailable(_) => "extraction",
            Self::NothingStaged { .. } => "staging",
            Self::FfmpegNotFound | Self::EncodeFailed { .. } | Self::Timeout(_) => "encoding",
            Self::Io(_) | Self::Image(_) | Self::Internal(_) => "pipeline",
        }
    }
}

/// Why a frame produced no value. Never aborts a run.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Region {roi:?} lies outside the {width}x{height} frame")]
    RoiOutOfBounds { roi: Roi, width: u32, height: u32 },

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("OCR engine panicked on {path}")]
    OcrPanicked { path: PathBuf },

    #[error("No value in OCR text {raw_text:?}")]
    Parse { raw_text: String },

    #[error("Parser panicked on OCR text {raw_text:?}")]
    ParserPanicked { raw_text: String },
}

impl ExtractionError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::RoiOutOfBounds { .. } => "roi_out_of_bounds",
            Self::Ocr(_) => "ocr",
            Self::OcrPanicked { .. } => "ocr_panic",
            Self::Parse { .. } => "parse",
            Self::ParserPanicked { .. } => "parser_panic",
        }
    }
}

/// Why a frame fell back to its uncomposited source. Never aborts a run.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Rendering panicked for frame {index}")]
    Render { index: usize },

    #[error("Cannot write staged frame {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot copy {path} into staging: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompositeError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::Render { .. } => "render",
            Self::Write { .. } => "write",
            Self::Copy { .. } => "copy",
        }
    }
}
