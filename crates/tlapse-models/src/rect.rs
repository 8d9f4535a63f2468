use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// A pixel-space rectangle of a source image examined by OCR.
///
/// Corners are `(x0, y0)` top-left inclusive and `(x1, y1)` bottom-right
/// exclusive, with the origin at the top-left of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Roi {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Default for Roi {
    /// The footer strip of a 4412x3308 trail-camera photo.
    fn default() -> Self {
        Self::new(0, 3174, 4412, 3308)
    }
}

impl Roi {
    /// Create a new region.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Check the corner ordering invariant.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.x0 < self.x1 && self.y0 < self.y1 {
            Ok(())
        } else {
            Err(ConfigError::InvalidRoi {
                x0: self.x0,
                y0: self.y0,
                x1: self.x1,
                y1: self.y1,
            })
        }
    }

    /// Whether the region lies entirely inside an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 <= width && self.y1 <= height
    }
}

impl FromStr for Roi {
    type Err = ConfigError;

    /// Parse `x0,y0,x1,y1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ConfigError::InvalidRoiSpec(s.to_string()))?;

        match parts.as_slice() {
            [x0, y0, x1, y1] => {
                let roi = Roi::new(*x0, *y0, *x1, *y1);
                roi.validate()?;
                Ok(roi)
            }
            _ => Err(ConfigError::InvalidRoiSpec(s.to_string())),
        }
    }
}
