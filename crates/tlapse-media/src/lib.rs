#![deny(unreachable_patterns)]
//! Timelapse frame pipeline.
//!
//! This crate provides:
//! - Deterministic frame discovery and ordering
//! - Parallel OCR value extraction from a region of each frame
//! - Series accumulation with global min/max
//! - Progressive graph rendering composited onto every frame
//! - Contiguous frame staging and FFmpeg encoding with atomic output

pub mod command;
pub mod compositor;
pub mod encoder;
pub mod error;
pub mod extract;
pub mod fs_utils;
pub mod graph;
pub mod ocr;
pub mod parser;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod series;
pub mod source;
pub mod stage;
pub mod telemetry;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use compositor::GraphCompositor;
pub use encoder::{encode_atomically, EncodeJob, FfmpegEncoder, FrameEncoder};
pub use error::{CompositeError, ExtractionError, MediaError, MediaResult};
pub use extract::ValueExtractor;
pub use graph::GraphRenderer;
pub use ocr::{OcrEngine, OcrError, TesseractOcr};
pub use parser::{FirstNumberParser, FooterTemperatureParser, ReadingParser};
pub use pipeline::{RenderedFrames, RunReport, StageTimings, Timelapse};
pub use progress::EncodeProgress;
pub use series::{scale, Series, SeriesBounds};
pub use source::enumerate_frames;
pub use stage::{StagedSequence, StagingArea, StagingReport};
