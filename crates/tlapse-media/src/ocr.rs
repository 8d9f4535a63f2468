//! OCR collaborator.
//!
//! The pipeline only needs "image in, text out". [`TesseractOcr`] shells out
//! to the `tesseract` CLI; any `Fn(&DynamicImage) -> Result<String, OcrError>`
//! closure also works as an engine.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::debug;

/// Errors from an OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract not found in PATH")]
    EngineNotFound,

    #[error("OCR engine failed: {message}")]
    Failed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot write OCR input image: {0}")]
    Image(#[from] image::ImageError),
}

impl OcrError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            exit_code: None,
        }
    }
}

/// Recognizes text in an already-cropped image.
///
/// Called concurrently from worker threads.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

impl<F> OcrEngine for F
where
    F: Fn(&DynamicImage) -> Result<String, OcrError> + Send + Sync,
{
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        self(image)
    }
}

/// Runs the `tesseract` command-line tool on each crop.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
    /// Tesseract page segmentation mode (`--psm`)
    page_seg_mode: Option<u8>,
}

impl TesseractOcr {
    /// Locate `tesseract` in PATH.
    pub fn new() -> Result<Self, OcrError> {
        let binary = which::which("tesseract").map_err(|_| OcrError::EngineNotFound)?;
        Ok(Self::with_binary(binary))
    }

    /// Use a specific tesseract executable.
    pub fn with_binary(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            language: "eng".to_string(),
            page_seg_mode: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Single text line (`7`) suits a footer strip well.
    pub fn with_page_seg_mode(mut self, mode: u8) -> Self {
        self.page_seg_mode = Some(mode);
        self
    }

    fn build_args(&self, input: &Path) -> Vec<String> {
        let mut args = vec![
            input.to_string_lossy().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
        ];
        if let Some(psm) = self.page_seg_mode {
            args.push("--psm".to_string());
            args.push(psm.to_string());
        }
        args
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("tlapse-roi-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let args = self.build_args(input.path());
        debug!("Running OCR: {} {}", self.binary.display(), args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed {
                message: stderr.trim().to_string(),
                exit_code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
