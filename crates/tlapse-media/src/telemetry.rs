//! Pipeline metrics.
//!
//! Recording is a no-op unless the embedding process installs a `metrics`
//! recorder.

use ::metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_DISCOVERED_TOTAL: &str = "tlapse_frames_discovered_total";
    pub const EXTRACTION_FAILURES_TOTAL: &str = "tlapse_extraction_failures_total";
    pub const COMPOSITE_FAILURES_TOTAL: &str = "tlapse_composite_failures_total";
    pub const FRAMES_STAGED_TOTAL: &str = "tlapse_frames_staged_total";
    pub const FRAMES_DROPPED_TOTAL: &str = "tlapse_frames_dropped_total";
    pub const STAGE_DURATION_SECONDS: &str = "tlapse_stage_duration_seconds";
    pub const ENCODES_TOTAL: &str = "tlapse_encodes_total";
}

pub fn record_frames_discovered(count: usize) {
    counter!(names::FRAMES_DISCOVERED_TOTAL).increment(count as u64);
}

pub fn record_extraction_failure(reason: &'static str) {
    counter!(names::EXTRACTION_FAILURES_TOTAL, "reason" => reason).increment(1);
}

pub fn record_composite_failure(reason: &'static str) {
    counter!(names::COMPOSITE_FAILURES_TOTAL, "reason" => reason).increment(1);
}

/// Record a staged frame; `kind` is `composited` or `passthrough`.
pub fn record_frame_staged(kind: &'static str) {
    counter!(names::FRAMES_STAGED_TOTAL, "kind" => kind).increment(1);
}

pub fn record_frame_dropped() {
    counter!(names::FRAMES_DROPPED_TOTAL).increment(1);
}

pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

pub fn record_encode(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(names::ENCODES_TOTAL, "status" => status).increment(1);
}
