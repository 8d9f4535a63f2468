//! Worker configuration.
//!
//! Options start from defaults, are replaced by the JSON file named in
//! `TIMELAPSE_CONFIG` when set, then individual `TIMELAPSE_*` variables
//! override single fields.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use tlapse_models::{FrameOrder, Roi, TimelapseOptions};

/// Default output path when `TIMELAPSE_OUTPUT` is unset.
pub const DEFAULT_OUTPUT: &str = "timelapse.mp4";

/// Worker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub options: TimelapseOptions,
    pub output: PathBuf,
    /// Extract values and draw the graph
    pub with_graph: bool,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut options = match var("TIMELAPSE_CONFIG") {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read TIMELAPSE_CONFIG file {path}"))?;
                serde_json::from_str::<TimelapseOptions>(&json)
                    .with_context(|| format!("Invalid options in {path}"))?
            }
            None => TimelapseOptions::default(),
        };

        if let Some(dir) = var("TIMELAPSE_IMAGES_DIR") {
            options.images_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("TIMELAPSE_STAGING_DIR") {
            options.staging_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = var("TIMELAPSE_RECURSIVE") {
            options.recursive = parse_bool("TIMELAPSE_RECURSIVE", &value)?;
        }
        if let Some(value) = var("TIMELAPSE_ORDER") {
            options.order = parse_var::<FrameOrder>("TIMELAPSE_ORDER", &value)?;
        }
        if let Some(value) = var("TIMELAPSE_ROI") {
            options.roi = Some(parse_var::<Roi>("TIMELAPSE_ROI", &value)?);
        }
        if let Some(value) = var("TIMELAPSE_IMAGES_PER_SECOND") {
            options.images_per_second = parse_var("TIMELAPSE_IMAGES_PER_SECOND", &value)?;
        }
        if let Some(value) = var("TIMELAPSE_FRAMERATE") {
            options.framerate = parse_var("TIMELAPSE_FRAMERATE", &value)?;
        }
        if let Some(value) = var("TIMELAPSE_WORKERS") {
            options.workers = Some(parse_var("TIMELAPSE_WORKERS", &value)?);
        }
        if let Some(font) = var("TIMELAPSE_FONT") {
            options.graph.font = Some(PathBuf::from(font));
        }
        if let Some(value) = var("TIMELAPSE_POINT_SIZE") {
            let size = parse_var("TIMELAPSE_POINT_SIZE", &value)?;
            options.graph = options.graph.with_point_size(size);
        }
        if let Some(value) = var("TIMELAPSE_NVENC") {
            if parse_bool("TIMELAPSE_NVENC", &value)? {
                options.encoding = options.encoding.with_nvenc();
            }
        }
        if let Some(value) = var("TIMELAPSE_CRF") {
            let crf = parse_var("TIMELAPSE_CRF", &value)?;
            options.encoding = options.encoding.with_crf(crf);
        }

        let with_graph = match var("TIMELAPSE_WITH_GRAPH") {
            Some(value) => parse_bool("TIMELAPSE_WITH_GRAPH", &value)?,
            None => true,
        };

        Ok(Self {
            options,
            output: var("TIMELAPSE_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            with_graph,
        })
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("Invalid value for {key}: {value:?}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Invalid value for {key}: {value:?} (expected true or false)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = WorkerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.options, TimelapseOptions::default());
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert!(config.with_graph);
    }

    #[test]
    fn test_environment_overrides() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("TIMELAPSE_IMAGES_DIR", "/photos"),
            ("TIMELAPSE_OUTPUT", "/videos/out.mp4"),
            ("TIMELAPSE_RECURSIVE", "yes"),
            ("TIMELAPSE_ORDER", "mtime"),
            ("TIMELAPSE_ROI", "0,3174,4412,3308"),
            ("TIMELAPSE_IMAGES_PER_SECOND", "5"),
            ("TIMELAPSE_FRAMERATE", "30"),
            ("TIMELAPSE_WORKERS", "3"),
            ("TIMELAPSE_WITH_GRAPH", "false"),
            ("TIMELAPSE_FONT", "/fonts/Arial.ttf"),
        ]))
        .unwrap();

        let options = &config.options;
        assert_eq!(options.images_dir, PathBuf::from("/photos"));
        assert!(options.recursive);
        assert_eq!(options.order, FrameOrder::Modified);
        assert_eq!(options.roi, Some(Roi::new(0, 3174, 4412, 3308)));
        assert_eq!((options.images_per_second, options.framerate), (5, 30));
        assert_eq!(options.workers, Some(3));
        assert_eq!(options.graph.font, Some(PathBuf::from("/fonts/Arial.ttf")));
        assert_eq!(config.output, PathBuf::from("/videos/out.mp4"));
        assert!(!config.with_graph);
    }

    #[test]
    fn test_marker_and_encoder_overrides() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("TIMELAPSE_POINT_SIZE", "8"),
            ("TIMELAPSE_NVENC", "true"),
            ("TIMELAPSE_CRF", "18"),
        ]))
        .unwrap();

        assert_eq!(config.options.graph.point_size, Some(8));
        let encoding = &config.options.encoding;
        assert!(encoding.use_nvenc);
        assert_eq!(encoding.codec, "h264_nvenc");
        assert_eq!(encoding.crf, 18);

        let err = WorkerConfig::from_lookup(lookup(&[("TIMELAPSE_CRF", "300")])).unwrap_err();
        assert!(err.to_string().contains("TIMELAPSE_CRF"));
    }

    #[test]
    fn test_json_file_then_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("timelapse.json");
        std::fs::write(
            &path,
            r#"{"images_dir": "/from/json", "framerate": 50, "graph": {"point_size": 10}}"#,
        )
        .unwrap();

        let config = WorkerConfig::from_lookup(lookup(&[
            ("TIMELAPSE_CONFIG", path.to_str().unwrap()),
            ("TIMELAPSE_FRAMERATE", "60"),
        ]))
        .unwrap();

        assert_eq!(config.options.images_dir, PathBuf::from("/from/json"));
        assert_eq!(config.options.framerate, 60);
        assert_eq!(config.options.graph.point_size, Some(10));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = WorkerConfig::from_lookup(lookup(&[("TIMELAPSE_FRAMERATE", "fast")])).unwrap_err();
        assert!(err.to_string().contains("TIMELAPSE_FRAMERATE"));

        let err = WorkerConfig::from_lookup(lookup(&[("TIMELAPSE_ROI", "1,2,3")])).unwrap_err();
        assert!(err.to_string().contains("TIMELAPSE_ROI"));

        let err = WorkerConfig::from_lookup(lookup(&[("TIMELAPSE_WITH_GRAPH", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("TIMELAPSE_WITH_GRAPH"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = WorkerConfig::from_lookup(lookup(&[("TIMELAPSE_CONFIG", "/no/such/file.json")]))
            .unwrap_err();
        assert!(err.to_string().contains("TIMELAPSE_CONFIG"));
    }

    #[test]
    fn test_blank_variables_are_ignored() {
        let config = WorkerConfig::from_lookup(lookup(&[("TIMELAPSE_FRAMERATE", "  ")])).unwrap();
        assert_eq!(config.options.framerate, TimelapseOptions::default().framerate);
    }
}
