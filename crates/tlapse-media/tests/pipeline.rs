//! End-to-end `make_video` tests with a fake OCR engine and a recording
//! encoder.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use tlapse_media::{
    EncodeJob, FirstNumberParser, FrameEncoder, MediaError, MediaResult, OcrError, Timelapse,
};
use tlapse_models::{GraphAnchor, GraphConfig, Roi, TimelapseOptions};

/// What the encoder saw while the staging directory still existed.
#[derive(Debug, Clone)]
struct Recorded {
    job: EncodeJob,
    contiguous: bool,
    /// Red channel sampled from each staged frame, in sequence order
    reds: Vec<u8>,
}

#[derive(Clone, Default)]
struct RecordingEncoder {
    calls: Arc<Mutex<Vec<Recorded>>>,
    fail: bool,
}

impl RecordingEncoder {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameEncoder for RecordingEncoder {
    async fn encode(&self, job: &EncodeJob) -> MediaResult<()> {
        let reds = job
            .sequence
            .paths()
            .iter()
            .map(|p| image::open(p).unwrap().to_rgb8().get_pixel(60, 44)[0])
            .collect();
        self.calls.lock().unwrap().push(Recorded {
            job: job.clone(),
            contiguous: job.sequence.is_contiguous(),
            reds,
        });

        // Something lands at the partial path either way.
        tokio::fs::write(&job.output, b"fake video").await?;
        if self.fail {
            return Err(MediaError::encode_failed(
                "FFmpeg exited with non-zero status",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }
        Ok(())
    }
}

/// Five 64x48 frames `a.png`..`e.png`, solid red at `value * 20`.
fn write_frames(dir: &Path, values: &[u8]) {
    for (name, value) in ["a", "b", "c", "d", "e"].iter().zip(values) {
        RgbImage::from_pixel(64, 48, Rgb([value * 20, 0, 0]))
            .save(dir.join(format!("{name}.png")))
            .unwrap();
    }
}

/// OCR fake that reports the crop's red channel divided by 20.
fn red_ocr(crop: &DynamicImage) -> Result<String, OcrError> {
    let red = crop.to_rgb8().get_pixel(0, 0)[0];
    Ok(format!("T {} F", red / 20))
}

fn small_graph() -> GraphConfig {
    GraphConfig::default()
        .with_size(40, 20)
        .with_padding(4)
        .with_anchor(GraphAnchor::TopLeft, 0, 0)
}

fn options(images: &Path, staging: &Path) -> TimelapseOptions {
    TimelapseOptions::new(images)
        .with_staging_dir(staging)
        .with_workers(2)
        .with_graph(small_graph())
}

struct Fixture {
    images: TempDir,
    staging: TempDir,
    out: TempDir,
}

impl Fixture {
    fn new(values: &[u8]) -> Self {
        let fixture = Self {
            images: TempDir::new().unwrap(),
            staging: TempDir::new().unwrap(),
            out: TempDir::new().unwrap(),
        };
        write_frames(fixture.images.path(), values);
        fixture
    }

    fn options(&self) -> TimelapseOptions {
        options(self.images.path(), self.staging.path())
    }

    fn output(&self) -> PathBuf {
        self.out.path().join("timelapse.mp4")
    }

    fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.staging.path()).unwrap().count() == 0
    }
}

#[tokio::test]
async fn test_plain_run_stages_every_frame_in_order() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    let encoder = RecordingEncoder::default();
    let timelapse = Timelapse::from_options(fx.options())
        .unwrap()
        .with_encoder(encoder.clone());

    let report = timelapse.make_video(true, fx.output()).await.unwrap();

    assert_eq!(report.frames_discovered, 5);
    assert_eq!(report.frames_staged, 5);
    assert!(!report.graph_drawn, "no region configured, so no graph");
    assert_eq!(report.frames_passed_through, 5);

    let calls = encoder.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contiguous);
    assert_eq!(calls[0].job.sequence.count, 5);
    for (got, want) in calls[0].reds.iter().zip([20u8, 40, 60, 80, 100]) {
        assert!(got.abs_diff(want) < 10, "staged order broken: {got} vs {want}");
    }

    assert_eq!(std::fs::read(fx.output()).unwrap(), b"fake video");
    assert!(fx.staging_is_empty(), "staging directory must be cleaned up");
}

#[tokio::test]
async fn test_dwell_frames_follow_rates() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    let encoder = RecordingEncoder::default();
    let timelapse = Timelapse::from_options(fx.options().with_rates(5, 25))
        .unwrap()
        .with_encoder(encoder.clone());

    let report = timelapse.make_video(false, fx.output()).await.unwrap();

    assert_eq!(report.dwell_frames, 5);
    assert_eq!(report.encoded_frames, 25);
    let job = &encoder.calls()[0].job;
    assert_eq!(job.input_framerate(), "25/5");
    assert_eq!(job.framerate, 25);
}

#[tokio::test]
async fn test_framerate_below_image_rate_is_rejected_up_front() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);

    let err = Timelapse::from_options(fx.options().with_rates(15, 10))
        .err()
        .unwrap();

    assert!(matches!(err, MediaError::Configuration(_)));
    assert_eq!(err.stage(), "configuration");
    assert!(!fx.output().exists());
}

#[tokio::test]
async fn test_graph_is_composited_from_extracted_values() {
    let fx = Fixture::new(&[3, 1, 4, 1, 5]);
    let encoder = RecordingEncoder::default();
    let timelapse = Timelapse::from_options(fx.options().with_roi(Roi::new(0, 0, 8, 8)))
        .unwrap()
        .with_ocr(red_ocr)
        .with_parser(FirstNumberParser)
        .with_encoder(encoder.clone());

    let report = timelapse.make_video(true, fx.output()).await.unwrap();

    assert!(report.graph_drawn);
    assert_eq!(report.readings_present, 5);
    assert_eq!(report.readings_absent, 0);
    let bounds = report.bounds.unwrap();
    assert_eq!((bounds.min, bounds.max), (1.0, 5.0));
    assert_eq!(report.frames_composited, 5);
    assert_eq!(report.frames_staged, 5);
    assert!(encoder.calls()[0].contiguous);
}

#[tokio::test]
async fn test_all_absent_readings_pass_frames_through() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    let encoder = RecordingEncoder::default();
    let timelapse = Timelapse::from_options(fx.options().with_roi(Roi::new(0, 0, 8, 8)))
        .unwrap()
        .with_ocr(|_: &DynamicImage| Ok::<_, OcrError>("~~ unreadable ~~".to_string()))
        .with_parser(FirstNumberParser)
        .with_encoder(encoder.clone());

    let report = timelapse.make_video(true, fx.output()).await.unwrap();

    assert!(!report.graph_drawn);
    assert!(report.bounds.is_none());
    assert_eq!(report.readings_absent, 5);
    assert_eq!(report.frames_passed_through, 5);
    assert_eq!(report.frames_composited, 0);
    assert!(fx.output().exists());
}

#[tokio::test]
async fn test_ocr_panic_on_one_frame_does_not_abort_run() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    let encoder = RecordingEncoder::default();
    let timelapse = Timelapse::from_options(fx.options().with_roi(Roi::new(0, 0, 8, 8)))
        .unwrap()
        .with_ocr(|crop: &DynamicImage| {
            if crop.to_rgb8().get_pixel(0, 0)[0] == 60 {
                panic!("ocr engine crashed on frame c");
            }
            red_ocr(crop)
        })
        .with_parser(FirstNumberParser)
        .with_encoder(encoder.clone());

    let report = timelapse.make_video(true, fx.output()).await.unwrap();

    assert_eq!(report.readings_present, 4);
    assert_eq!(report.readings_absent, 1);
    assert!(report.graph_drawn);
    assert_eq!(report.frames_staged, 5);
    assert!(fx.output().exists());
}

#[tokio::test]
async fn test_without_graph_never_runs_ocr() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let timelapse = Timelapse::from_options(fx.options().with_roi(Roi::new(0, 0, 8, 8)))
        .unwrap()
        .with_ocr(move |_: &DynamicImage| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, OcrError>("1".to_string())
        })
        .with_encoder(RecordingEncoder::default());

    let report = timelapse.make_video(false, fx.output()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!report.graph_drawn);
    assert_eq!(report.readings_present + report.readings_absent, 0);
}

#[tokio::test]
async fn test_encode_failure_leaves_no_output() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    let timelapse = Timelapse::from_options(fx.options())
        .unwrap()
        .with_encoder(RecordingEncoder::failing());

    let err = timelapse.make_video(false, fx.output()).await.unwrap_err();

    match err {
        MediaError::EncodeFailed {
            stderr, exit_code, ..
        } => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr.as_deref(), Some("Conversion failed!"));
        }
        other => panic!("expected EncodeFailed, got {other:?}"),
    }
    assert!(!fx.output().exists());
    assert_eq!(std::fs::read_dir(fx.out.path()).unwrap().count(), 0);
    assert!(fx.staging_is_empty());
}

#[tokio::test]
async fn test_empty_directory_aborts_before_encoding() {
    let images = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    std::fs::write(images.path().join("notes.txt"), b"no photos").unwrap();
    let encoder = RecordingEncoder::default();

    let timelapse = Timelapse::from_options(options(images.path(), staging.path()))
        .unwrap()
        .with_encoder(encoder.clone());
    let err = timelapse
        .make_video(false, images.path().join("out.mp4"))
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::EmptyInput { .. }));
    assert!(encoder.calls().is_empty());
}

#[tokio::test]
async fn test_corrupt_frame_is_skipped_without_gap() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    std::fs::write(fx.images.path().join("c.png"), b"truncated").unwrap();
    let encoder = RecordingEncoder::default();
    let timelapse = Timelapse::from_options(fx.options())
        .unwrap()
        .with_encoder(encoder.clone());

    let report = timelapse.make_video(false, fx.output()).await.unwrap();

    assert_eq!(report.frames_discovered, 5);
    assert_eq!(report.frames_dropped, 1);
    assert_eq!(report.frames_staged, 4);
    let recorded = &encoder.calls()[0];
    assert!(recorded.contiguous);
    for (got, want) in recorded.reds.iter().zip([20u8, 40, 80, 100]) {
        assert!(got.abs_diff(want) < 10);
    }
}

#[tokio::test]
#[ignore = "requires ffmpeg in PATH"]
async fn test_real_ffmpeg_encode() {
    let fx = Fixture::new(&[1, 2, 3, 4, 5]);
    let timelapse = Timelapse::from_options(fx.options().with_rates(5, 25)).unwrap();

    let report = timelapse.make_video(false, fx.output()).await.unwrap();

    assert_eq!(report.encoded_frames, 25);
    assert!(std::fs::metadata(fx.output()).unwrap().len() > 0);
}
