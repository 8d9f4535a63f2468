//! The settable option surface of a timelapse run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::encoding::EncodingConfig;
use crate::frame::FrameOrder;
use crate::graph::GraphConfig;
use crate::rect::Roi;

/// Default number of source images shown per second of video
pub const DEFAULT_IMAGES_PER_SECOND: u32 = 15;
/// Default encoder timebase
pub const DEFAULT_FRAMERATE: u32 = 25;
/// Extensions matched verbatim against file names
pub const DEFAULT_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".PNG", ".JPG", ".JPEG"];

/// Every option of a run, each with a documented default.
///
/// Options are freely settable; [`crate::TimelapseConfig::new`] validates
/// them once and freezes the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TimelapseOptions {
    /// Directory holding the source photographs
    pub images_dir: PathBuf,
    /// Parent directory for per-run staging folders (system temp when unset)
    pub staging_dir: Option<PathBuf>,
    /// Walk subdirectories too
    pub recursive: bool,
    /// File name suffixes to accept, matched case-sensitively
    pub extensions: Vec<String>,
    pub order: FrameOrder,
    /// OCR region; no region means no value series and no graph
    pub roi: Option<Roi>,
    /// Source images shown per second of output video
    pub images_per_second: u32,
    /// Output video frame rate
    pub framerate: u32,
    /// Worker pool size (host core count when unset)
    pub workers: Option<usize>,
    pub graph: GraphConfig,
    pub encoding: EncodingConfig,
    /// Kill the encoder after this many seconds
    pub encode_timeout_secs: Option<u64>,
}

impl Default for TimelapseOptions {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("."),
            staging_dir: None,
            recursive: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            order: FrameOrder::default(),
            roi: None,
            images_per_second: DEFAULT_IMAGES_PER_SECOND,
            framerate: DEFAULT_FRAMERATE,
            workers: None,
            graph: GraphConfig::default(),
            encoding: EncodingConfig::default(),
            encode_timeout_secs: None,
        }
    }
}

impl TimelapseOptions {
    /// Options for the given image directory, everything else default.
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_order(mut self, order: FrameOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.roi = Some(roi);
        self
    }

    /// Set display rate and encoder timebase.
    pub fn with_rates(mut self, images_per_second: u32, framerate: u32) -> Self {
        self.images_per_second = images_per_second;
        self.framerate = framerate;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_graph(mut self, graph: GraphConfig) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TimelapseOptions::default();
        assert_eq!(options.images_per_second, 15);
        assert_eq!(options.framerate, 25);
        assert_eq!(options.order, FrameOrder::Filename);
        assert!(options.roi.is_none());
        assert!(options.extensions.contains(&".jpg".to_string()));
        assert!(options.extensions.contains(&".JPG".to_string()));
    }

    #[test]
    fn test_json_overrides() {
        let json = r#"{
            "images_dir": "/photos",
            "order": "modified",
            "roi": {"x0": 0, "y0": 10, "x1": 100, "y1": 40},
            "graph": {"point_size": 8, "line_color": "red"}
        }"#;
        let options: TimelapseOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.images_dir, PathBuf::from("/photos"));
        assert_eq!(options.order, FrameOrder::Modified);
        assert_eq!(options.roi, Some(Roi::new(0, 10, 100, 40)));
        assert_eq!(options.graph.point_size, Some(8));
        assert_eq!(options.framerate, DEFAULT_FRAMERATE);
    }
}
