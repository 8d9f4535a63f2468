//! Run orchestration.
//!
//! Stages run strictly one after another: discovery, extraction, series
//! finalization, staging (with compositing), encoding. Extraction must
//! finish before compositing starts because every graph is scaled against
//! the global min/max.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use tlapse_models::{Frame, TimelapseConfig, TimelapseOptions};

use crate::compositor::GraphCompositor;
use crate::encoder::{encode_atomically, EncodeJob, FfmpegEncoder, FrameEncoder};
use crate::error::{MediaError, MediaResult};
use crate::extract::ValueExtractor;
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::parser::{FooterTemperatureParser, ReadingParser};
use crate::pool::build_pool;
use crate::series::{Series, SeriesBounds};
use crate::source::enumerate_frames;
use crate::stage::{StagingArea, StagingReport};

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub discovery_ms: u64,
    pub extraction_ms: u64,
    pub staging_ms: u64,
    pub encoding_ms: u64,
}

/// Frames staged for encoding, plus what it took to get there.
///
/// Owns the staging directory; it is removed when this value is dropped.
#[derive(Debug)]
pub struct RenderedFrames {
    pub staging: StagingArea,
    pub frames: Vec<Frame>,
    /// `None` when no value series was extracted
    pub series: Option<Series>,
    pub graph_drawn: bool,
    pub report: StagingReport,
    pub timings: StageTimings,
}

/// Summary of a successful `make_video` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub output: PathBuf,
    pub frames_discovered: usize,
    pub readings_present: usize,
    pub readings_absent: usize,
    pub bounds: Option<SeriesBounds>,
    pub graph_drawn: bool,
    pub frames_composited: usize,
    pub frames_passed_through: usize,
    pub frames_dropped: usize,
    pub composite_failures: usize,
    pub frames_staged: usize,
    pub dwell_frames: u32,
    pub encoded_frames: u64,
    pub timings: StageTimings,
    pub elapsed_ms: u64,
}

/// A configured timelapse pipeline.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct Timelapse {
    config: Arc<TimelapseConfig>,
    /// Resolved lazily so runs without a graph never need tesseract.
    ocr: Option<Arc<dyn OcrEngine>>,
    parser: Arc<dyn ReadingParser>,
    encoder: Arc<dyn FrameEncoder>,
}

impl Timelapse {
    /// Pipeline with the footer parser, tesseract OCR and FFmpeg.
    pub fn new(config: TimelapseConfig) -> Self {
        Self {
            config: Arc::new(config),
            ocr: None,
            parser: Arc::new(FooterTemperatureParser),
            encoder: Arc::new(FfmpegEncoder::new()),
        }
    }

    /// Validate `options` and build a pipeline from them.
    pub fn from_options(options: TimelapseOptions) -> MediaResult<Self> {
        Ok(Self::new(TimelapseConfig::new(options)?))
    }

    pub fn with_ocr(mut self, ocr: impl OcrEngine + 'static) -> Self {
        self.ocr = Some(Arc::new(ocr));
        self
    }

    pub fn with_parser(mut self, parser: impl ReadingParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn with_encoder(mut self, encoder: impl FrameEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn config(&self) -> &TimelapseConfig {
        &self.config
    }

    /// Discover source frames in playback order.
    pub fn load_frames(&self) -> MediaResult<Vec<Frame>> {
        enumerate_frames(
            &self.config.images_dir,
            self.config.recursive,
            &self.config.extensions,
            self.config.order,
        )
    }

    /// Run every stage up to encoding. Blocks on the worker pool.
    ///
    /// A graph is drawn only when `with_graph` is set, a region is
    /// configured and at least one reading has a value; otherwise frames
    /// are staged unchanged.
    pub fn render_frames(&self, with_graph: bool) -> MediaResult<RenderedFrames> {
        let mut timings = StageTimings::default();

        let started = Instant::now();
        let frames = self.load_frames()?;
        timings.discovery_ms = started.elapsed().as_millis() as u64;

        let roi = match (with_graph, self.config.roi()) {
            (true, Some(roi)) => Some(roi),
            (true, None) => {
                warn!("Graph requested but no region of interest configured, skipping extraction");
                None
            }
            (false, _) => None,
        };

        // Resolve collaborators before any per-frame work starts.
        let prepared = match roi {
            Some(roi) => {
                let ocr = self.ocr_engine()?;
                let compositor = GraphCompositor::new(self.config.graph().clone(), frames.len())?;
                if !compositor.renderer().draws_labels() {
                    info!("No label font configured, graph drawn without min/max labels");
                }
                Some((ValueExtractor::new(roi, ocr, Arc::clone(&self.parser)), compositor))
            }
            None => None,
        };

        let pool = build_pool(self.config.workers())?;

        let mut series = None;
        let mut compositor = None;
        if let Some((extractor, graph)) = prepared {
            let started = Instant::now();
            let readings = extractor.extract_all(&frames, &pool);
            let finalized = Series::finalize(readings);
            timings.extraction_ms = started.elapsed().as_millis() as u64;

            if finalized.bounds().is_some() {
                compositor = Some(graph);
            }
            series = Some(finalized);
        }

        let started = Instant::now();
        let staging = StagingArea::create(self.config.staging_dir.as_deref())?;
        let overlay = compositor.as_ref().zip(series.as_ref());
        let report = staging.stage(&frames, overlay, &pool)?;
        timings.staging_ms = started.elapsed().as_millis() as u64;

        Ok(RenderedFrames {
            staging,
            frames,
            graph_drawn: compositor.is_some(),
            series,
            report,
            timings,
        })
    }

    /// Produce the video at `output`.
    ///
    /// On error nothing is written to `output`; a file already there is left
    /// untouched.
    pub async fn make_video(&self, with_graph: bool, output: impl AsRef<Path>) -> MediaResult<RunReport> {
        let output = output.as_ref().to_path_buf();
        match self.run(with_graph, output.clone()).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(
                    stage = e.stage(),
                    output = %output.display(),
                    error = %e,
                    "Timelapse run failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&self, with_graph: bool, output: PathBuf) -> MediaResult<RunReport> {
        let started = Instant::now();
        info!(
            images_dir = %self.config.images_dir.display(),
            output = %output.display(),
            with_graph,
            workers = self.config.workers(),
            "Starting timelapse"
        );

        let pipeline = self.clone();
        let rendered = tokio::task::spawn_blocking(move || pipeline.render_frames(with_graph))
            .await
            .map_err(|e| MediaError::internal(format!("Render task failed: {e}")))??;

        let job = EncodeJob::new(rendered.report.sequence.clone(), &self.config, &output);
        let encode_started = Instant::now();
        let encoded_frames = encode_atomically(self.encoder.as_ref(), &job).await?;

        let mut timings = rendered.timings;
        timings.encoding_ms = encode_started.elapsed().as_millis() as u64;

        let (readings_present, readings_absent, bounds) = match &rendered.series {
            Some(series) => (series.present_count(), series.absent_count(), series.bounds()),
            None => (0, 0, None),
        };

        let report = RunReport {
            output,
            frames_discovered: rendered.frames.len(),
            readings_present,
            readings_absent,
            bounds,
            graph_drawn: rendered.graph_drawn,
            frames_composited: rendered.report.composited,
            frames_passed_through: rendered.report.passed_through,
            frames_dropped: rendered.report.dropped,
            composite_failures: rendered.report.composite_failures,
            frames_staged: rendered.report.sequence.count,
            dwell_frames: job.dwell_frames,
            encoded_frames,
            timings,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            output = %report.output.display(),
            frames = report.frames_staged,
            encoded_frames = report.encoded_frames,
            elapsed_ms = report.elapsed_ms,
            "Timelapse completed"
        );

        Ok(report)
    }

    fn ocr_engine(&self) -> MediaResult<Arc<dyn OcrEngine>> {
        match &self.ocr {
            Some(ocr) => Ok(Arc::clone(ocr)),
            None => {
                let engine = TesseractOcr::new().map_err(MediaError::OcrUnavailable)?;
                Ok(Arc::new(engine.with_page_seg_mode(7)))
            }
        }
    }
}
