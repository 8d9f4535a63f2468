//! Frame staging.
//!
//! Every frame is written into a private per-run directory, composited when
//! a graph is drawn and passed through unchanged otherwise (or when
//! compositing fails). Survivors are then renumbered into a gap-free
//! `frame_1..frame_N` sequence, which is what the encoder consumes: a frame
//! that could not be staged at all is dropped rather than leaving a hole.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use tlapse_models::Frame;

use crate::compositor::{save_jpeg, GraphCompositor};
use crate::error::{CompositeError, MediaError, MediaResult};
use crate::series::Series;
use crate::telemetry;

/// Staged frame files are named `frame_<n>.jpg`, numbered from this value.
pub const FIRST_FRAME_NUMBER: u32 = 1;

/// A private directory for one run's staged frames.
///
/// Removed with its contents when dropped.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

/// How a single frame was staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Staged {
    Composited,
    PassedThrough { composite_failed: bool },
    Dropped { composite_failed: bool },
}

/// A contiguous, numbered image sequence ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedSequence {
    pub dir: PathBuf,
    /// Zero-padded width of the frame number
    pub digits: usize,
    pub count: usize,
}

impl StagedSequence {
    fn new(dir: PathBuf, count: usize) -> Self {
        Self {
            dir,
            digits: count.to_string().len(),
            count,
        }
    }

    /// printf-style pattern for the image2 demuxer, e.g. `frame_%03d.jpg`.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(format!("frame_%0{}d.jpg", self.digits))
    }

    /// Path of the `n`th staged frame (1-based).
    pub fn path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("frame_{:0width$}.jpg", n, width = self.digits))
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        (FIRST_FRAME_NUMBER as usize..FIRST_FRAME_NUMBER as usize + self.count)
            .map(|n| self.path(n))
            .collect()
    }

    /// Whether every numbered file from the first to the last exists.
    pub fn is_contiguous(&self) -> bool {
        self.paths().iter().all(|p| p.is_file())
    }
}

/// Outcome of staging a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagingReport {
    pub composited: usize,
    pub passed_through: usize,
    pub dropped: usize,
    /// Frames whose compositing failed, whether or not they were then
    /// staged unchanged
    pub composite_failures: usize,
    pub sequence: StagedSequence,
}

impl StagingArea {
    /// Create a fresh staging directory under `parent`, or the system temp
    /// directory.
    pub fn create(parent: Option<&Path>) -> MediaResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tlapse-stage-");
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        debug!(dir = %dir.path().display(), "Created staging directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Stage `frames` on `pool`, compositing with `overlay` when given.
    ///
    /// # Errors
    ///
    /// - [`MediaError::NothingStaged`] if every frame was dropped
    /// - [`MediaError::Io`] if the renumbering pass fails
    pub fn stage(
        &self,
        frames: &[Frame],
        overlay: Option<(&GraphCompositor, &Series)>,
        pool: &ThreadPool,
    ) -> MediaResult<StagingReport> {
        let started = Instant::now();
        info!(
            frames = frames.len(),
            composite = overlay.is_some(),
            dir = %self.path().display(),
            "Staging frames"
        );

        let outcomes: Vec<Staged> = pool.install(|| {
            frames
                .par_iter()
                .map(|frame| self.stage_one(frame, overlay))
                .collect()
        });

        let mut composited = 0;
        let mut passed_through = 0;
        let mut dropped = 0;
        let mut composite_failures = 0;
        let mut survivors = Vec::with_capacity(frames.len());

        for (frame, outcome) in frames.iter().zip(&outcomes) {
            match *outcome {
                Staged::Composited => {
                    composited += 1;
                    survivors.push(frame.index);
                }
                Staged::PassedThrough { composite_failed } => {
                    passed_through += 1;
                    composite_failures += usize::from(composite_failed);
                    survivors.push(frame.index);
                }
                Staged::Dropped { composite_failed } => {
                    dropped += 1;
                    composite_failures += usize::from(composite_failed);
                }
            }
        }

        if survivors.is_empty() {
            return Err(MediaError::NothingStaged {
                discovered: frames.len(),
            });
        }

        let sequence = StagedSequence::new(self.path().to_path_buf(), survivors.len());
        for (n, index) in (FIRST_FRAME_NUMBER as usize..).zip(&survivors) {
            std::fs::rename(self.work_path(*index), sequence.path(n))?;
        }

        let elapsed = started.elapsed();
        telemetry::record_stage_duration("staging", elapsed.as_secs_f64());
        info!(
            staged = sequence.count,
            composited,
            passed_through,
            dropped,
            composite_failures,
            elapsed_ms = elapsed.as_millis() as u64,
            "Staging completed"
        );

        Ok(StagingReport {
            composited,
            passed_through,
            dropped,
            composite_failures,
            sequence,
        })
    }

    /// Pre-renumbering file for the frame at `index`.
    fn work_path(&self, index: usize) -> PathBuf {
        self.path().join(format!("work_{index:08}.jpg"))
    }

    fn stage_one(&self, frame: &Frame, overlay: Option<(&GraphCompositor, &Series)>) -> Staged {
        let dest = self.work_path(frame.index);

        let mut composite_failed = false;
        if let Some((compositor, series)) = overlay {
            match compositor.compose_file(frame, series, &dest) {
                Ok(()) => {
                    telemetry::record_frame_staged("composited");
                    return Staged::Composited;
                }
                Err(e) => {
                    composite_failed = true;
                    telemetry::record_composite_failure(e.reason());
                    warn!(
                        frame = frame.index,
                        path = %frame.path.display(),
                        error = %e,
                        "Compositing failed, staging source frame unchanged"
                    );
                }
            }
        }

        match pass_through(frame, &dest) {
            Ok(()) => {
                telemetry::record_frame_staged("passthrough");
                Staged::PassedThrough { composite_failed }
            }
            Err(e) => {
                telemetry::record_frame_dropped();
                warn!(
                    frame = frame.index,
                    path = %frame.path.display(),
                    error = %e,
                    "Frame could not be staged, dropping it"
                );
                Staged::Dropped { composite_failed }
            }
        }
    }
}

/// Stage the source unchanged: JPEGs are copied byte for byte, other
/// formats are re-encoded as JPEG.
fn pass_through(frame: &Frame, dest: &Path) -> Result<(), CompositeError> {
    match frame.extension().as_deref() {
        Some("jpg" | "jpeg") => std::fs::copy(&frame.path, dest)
            .map(|_| ())
            .map_err(|source| CompositeError::Copy {
                path: frame.path.clone(),
                source,
            }),
        _ => {
            let image = image::open(&frame.path).map_err(|source| CompositeError::Decode {
                path: frame.path.clone(),
                source,
            })?;
            save_jpeg(&image, dest)
        }
    }
}
