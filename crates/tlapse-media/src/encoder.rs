//! Video encoding of a staged sequence.
//!
//! Each source image is held for `dwell_frames` output frames by reading the
//! sequence at `framerate / dwell_frames` images per second and emitting at
//! `framerate`. Output is written to a hidden partial file and only moved to
//! the requested path on success, so a failed run never leaves a truncated
//! video behind.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use tlapse_models::{EncodingConfig, TimelapseConfig};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_parent, move_file, partial_output_path, remove_if_exists};
use crate::stage::{StagedSequence, FIRST_FRAME_NUMBER};
use crate::telemetry;

/// Everything an encoder needs to turn a staged sequence into a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeJob {
    pub sequence: StagedSequence,
    pub images_per_second: u32,
    /// Output frame rate
    pub framerate: u32,
    /// Output frames per source image
    pub dwell_frames: u32,
    pub output: PathBuf,
    pub encoding: EncodingConfig,
    pub timeout_secs: Option<u64>,
}

impl EncodeJob {
    pub fn new(sequence: StagedSequence, config: &TimelapseConfig, output: impl Into<PathBuf>) -> Self {
        Self {
            sequence,
            images_per_second: config.images_per_second,
            framerate: config.framerate,
            dwell_frames: config.dwell_frames(),
            output: output.into(),
            encoding: config.encoding.clone(),
            timeout_secs: config.encode_timeout_secs,
        }
    }

    /// Rate at which staged images are read, as an FFmpeg rational.
    pub fn input_framerate(&self) -> String {
        format!("{}/{}", self.framerate, self.dwell_frames)
    }

    /// Total frames in the encoded video.
    pub fn encoded_frame_count(&self) -> u64 {
        self.sequence.count as u64 * u64::from(self.dwell_frames)
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.encoded_frame_count() as f64 / f64::from(self.framerate.max(1))
    }

    fn with_output(&self, output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            ..self.clone()
        }
    }
}

/// Turns a staged sequence into a video file at `job.output`.
///
/// Implementations may leave a partial file behind on error;
/// [`encode_atomically`] cleans it up.
#[async_trait]
pub trait FrameEncoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob) -> MediaResult<()>;
}

/// Encodes with the `ffmpeg` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runner(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// The FFmpeg invocation for `job`.
    pub fn command(job: &EncodeJob) -> FfmpegCommand {
        FfmpegCommand::new(job.sequence.pattern(), &job.output)
            .image_sequence(FIRST_FRAME_NUMBER, job.input_framerate())
            .output_rate(job.framerate)
            .encoding(&job.encoding)
    }
}

#[async_trait]
impl FrameEncoder for FfmpegEncoder {
    async fn encode(&self, job: &EncodeJob) -> MediaResult<()> {
        let cmd = Self::command(job);
        let runner = match job.timeout_secs {
            Some(secs) => self.runner.clone().with_timeout(secs),
            None => self.runner.clone(),
        };

        let total_frames = job.encoded_frame_count();
        runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    frame = progress.frame,
                    total_frames,
                    fraction = progress.fraction(total_frames),
                    eta_secs = progress.eta_seconds(total_frames),
                    speed = progress.speed,
                    "Encoding progress"
                );
            })
            .await
    }
}

/// Run `encoder` against a partial sibling of `job.output`, then publish.
///
/// Returns the number of encoded frames. On any failure the partial file is
/// removed and `job.output` is left as it was.
pub async fn encode_atomically(encoder: &dyn FrameEncoder, job: &EncodeJob) -> MediaResult<u64> {
    let started = Instant::now();
    ensure_parent(&job.output).await?;

    let partial = partial_output_path(&job.output);
    info!(
        frames = job.sequence.count,
        dwell_frames = job.dwell_frames,
        input_rate = %job.input_framerate(),
        framerate = job.framerate,
        output = %job.output.display(),
        "Encoding video"
    );

    let result = match encoder.encode(&job.with_output(&partial)).await {
        Ok(()) if !partial.is_file() => Err(MediaError::encode_failed(
            "Encoder reported success but produced no output",
            None,
            None,
        )),
        Ok(()) => move_file(&partial, &job.output).await,
        Err(e) => Err(e),
    };

    telemetry::record_stage_duration("encoding", started.elapsed().as_secs_f64());
    telemetry::record_encode(result.is_ok());

    match result {
        Ok(()) => {
            info!(
                output = %job.output.display(),
                encoded_frames = job.encoded_frame_count(),
                duration_secs = job.duration_secs(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Video written"
            );
            Ok(job.encoded_frame_count())
        }
        Err(e) => {
            if let Err(cleanup) = remove_if_exists(&partial).await {
                warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial output");
            }
            error!(output = %job.output.display(), error = %e, "Encoding failed");
            Err(e)
        }
    }
}
