//! Validated, immutable run configuration.

use std::ops::Deref;

use crate::error::{ConfigError, ConfigResult};
use crate::graph::GraphConfig;
use crate::options::TimelapseOptions;
use crate::rect::Roi;

/// Encoded frames emitted per source image.
///
/// `framerate / images_per_second`, rounded, never below one. Fails when the
/// encoder timebase is slower than the image rate, since images would be
/// dropped.
pub fn dwell_frames(images_per_second: u32, framerate: u32) -> ConfigResult<u32> {
    if images_per_second == 0 {
        return Err(ConfigError::ZeroImageRate);
    }
    if framerate < images_per_second {
        return Err(ConfigError::FramerateBelowImageRate {
            framerate,
            images_per_second,
        });
    }

    let dwell = (f64::from(framerate) / f64::from(images_per_second)).round() as u32;
    Ok(dwell.max(1))
}

/// Options that passed validation.
///
/// Constructed once before any frame work begins and shared read-only by
/// every stage. Dereferences to the underlying [`TimelapseOptions`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseConfig {
    options: TimelapseOptions,
    workers: usize,
    dwell_frames: u32,
}

impl TimelapseConfig {
    /// Validate options and freeze them.
    pub fn new(options: TimelapseOptions) -> ConfigResult<Self> {
        let dwell_frames = dwell_frames(options.images_per_second, options.framerate)?;

        if let Some(roi) = &options.roi {
            roi.validate()?;
        }

        options.graph.validate()?;

        if options.extensions.iter().all(|ext| ext.is_empty()) {
            return Err(ConfigError::NoExtensions);
        }

        let workers = match options.workers {
            Some(0) => return Err(ConfigError::ZeroWorkers),
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };

        Ok(Self {
            options,
            workers,
            dwell_frames,
        })
    }

    pub fn options(&self) -> &TimelapseOptions {
        &self.options
    }

    pub fn graph(&self) -> &GraphConfig {
        &self.options.graph
    }

    pub fn roi(&self) -> Option<Roi> {
        self.options.roi
    }

    /// Resolved worker pool size.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Encoded frames per source image.
    pub fn dwell_frames(&self) -> u32 {
        self.dwell_frames
    }
}

impl Deref for TimelapseConfig {
    type Target = TimelapseOptions;

    fn deref(&self) -> &Self::Target {
        &self.options
    }
}

impl TryFrom<TimelapseOptions> for TimelapseConfig {
    type Error = ConfigError;

    fn try_from(options: TimelapseOptions) -> Result<Self, Self::Error> {
        Self::new(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dwell_frames() {
        assert_eq!(dwell_frames(5, 25).unwrap(), 5);
        assert_eq!(dwell_frames(15, 25).unwrap(), 2);
        assert_eq!(dwell_frames(25, 25).unwrap(), 1);
        assert_eq!(dwell_frames(10, 24).unwrap(), 2);
    }

    #[test]
    fn test_framerate_below_image_rate_rejected() {
        assert_eq!(
            dwell_frames(15, 10),
            Err(ConfigError::FramerateBelowImageRate {
                framerate: 10,
                images_per_second: 15
            })
        );
        assert_eq!(dwell_frames(0, 10), Err(ConfigError::ZeroImageRate));
    }

    #[test]
    fn test_config_validates_options() {
        let options = TimelapseOptions::new("/photos").with_rates(15, 10);
        assert!(matches!(
            TimelapseConfig::new(options),
            Err(ConfigError::FramerateBelowImageRate { .. })
        ));

        let options = TimelapseOptions::new("/photos").with_roi(Roi::new(50, 0, 10, 10));
        assert!(matches!(
            TimelapseConfig::new(options),
            Err(ConfigError::InvalidRoi { .. })
        ));

        let options = TimelapseOptions::new("/photos").with_workers(0);
        assert_eq!(TimelapseConfig::new(options), Err(ConfigError::ZeroWorkers));

        let options = TimelapseOptions {
            extensions: vec![],
            ..TimelapseOptions::new("/photos")
        };
        assert_eq!(TimelapseConfig::new(options), Err(ConfigError::NoExtensions));
    }

    #[test]
    fn test_config_resolves_defaults() {
        let config = TimelapseConfig::new(TimelapseOptions::new("/photos")).unwrap();
        assert!(config.workers() >= 1);
        assert_eq!(config.dwell_frames(), 2);
        assert_eq!(config.images_per_second, 15);

        let config =
            TimelapseConfig::new(TimelapseOptions::new("/photos").with_workers(3)).unwrap();
        assert_eq!(config.workers(), 3);
    }
}
