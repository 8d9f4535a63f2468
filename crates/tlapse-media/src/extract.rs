//! Value extraction: crop, OCR, parse.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use tlapse_models::{Frame, Reading, Roi};

use crate::error::ExtractionError;
use crate::ocr::OcrEngine;
use crate::parser::ReadingParser;
use crate::telemetry;

/// Extracts one [`Reading`] per frame from a fixed region of interest.
///
/// Failures never propagate: a frame whose image cannot be decoded, whose
/// region falls outside the image, whose OCR fails or whose text does not
/// parse yields an absent reading that keeps any OCR text for diagnostics.
#[derive(Clone)]
pub struct ValueExtractor {
    roi: Roi,
    ocr: Arc<dyn OcrEngine>,
    parser: Arc<dyn ReadingParser>,
}

impl ValueExtractor {
    pub fn new(roi: Roi, ocr: Arc<dyn OcrEngine>, parser: Arc<dyn ReadingParser>) -> Self {
        Self { roi, ocr, parser }
    }

    pub fn roi(&self) -> Roi {
        self.roi
    }

    /// Extract a reading for a single frame.
    pub fn extract(&self, frame: &Frame) -> Reading {
        let raw_text = match self.read_text(frame) {
            Ok(text) => text,
            Err(e) => {
                self.report_failure(frame, &e);
                return Reading::absent(frame.index, String::new());
            }
        };

        match self.parse(&raw_text) {
            Ok(value) => {
                debug!(frame = frame.index, value, "Extracted value");
                Reading::present(frame.index, value, raw_text)
            }
            Err(e) => {
                self.report_failure(frame, &e);
                Reading::absent(frame.index, raw_text)
            }
        }
    }

    /// Extract readings for all frames on `pool`.
    ///
    /// The result is in frame order and has one reading per frame.
    pub fn extract_all(&self, frames: &[Frame], pool: &ThreadPool) -> Vec<Reading> {
        let started = Instant::now();
        info!(
            frames = frames.len(),
            workers = pool.current_num_threads(),
            "Extracting values"
        );

        let readings: Vec<Reading> =
            pool.install(|| frames.par_iter().map(|frame| self.extract(frame)).collect());

        let absent = readings.iter().filter(|r| !r.is_present()).count();
        let elapsed = started.elapsed();
        telemetry::record_stage_duration("extraction", elapsed.as_secs_f64());
        info!(
            frames = readings.len(),
            absent,
            elapsed_ms = elapsed.as_millis() as u64,
            "Extraction completed"
        );

        readings
    }

    /// Decode, crop to the region and run OCR.
    fn read_text(&self, frame: &Frame) -> Result<String, ExtractionError> {
        let image = image::open(&frame.path).map_err(|source| ExtractionError::Decode {
            path: frame.path.clone(),
            source,
        })?;

        if !self.roi.fits_within(image.width(), image.height()) {
            return Err(ExtractionError::RoiOutOfBounds {
                roi: self.roi,
                width: image.width(),
                height: image.height(),
            });
        }

        let crop = image.crop_imm(self.roi.x0, self.roi.y0, self.roi.width(), self.roi.height());
        let text = panic::catch_unwind(AssertUnwindSafe(|| self.ocr.recognize(&crop))).map_err(
            |_| ExtractionError::OcrPanicked {
                path: frame.path.clone(),
            },
        )??;
        Ok(text)
    }

    /// Run the parser, treating a panic in caller-supplied code as a miss.
    fn parse(&self, raw_text: &str) -> Result<f64, ExtractionError> {
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| self.parser.parse(raw_text)))
            .map_err(|_| ExtractionError::ParserPanicked {
                raw_text: raw_text.to_string(),
            })?;

        parsed
            .filter(|v| v.is_finite())
            .ok_or_else(|| ExtractionError::Parse {
                raw_text: raw_text.to_string(),
            })
    }

    fn report_failure(&self, frame: &Frame, error: &ExtractionError) {
        telemetry::record_extraction_failure(error.reason());
        warn!(
            frame = frame.index,
            path = %frame.path.display(),
            error = %error,
            "Value extraction failed, reading left empty"
        );
    }
}
