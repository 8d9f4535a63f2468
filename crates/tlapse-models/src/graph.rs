//! Graph overlay configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::color::Color;
use crate::error::{ConfigError, ConfigResult};

/// Default graph canvas size (fits a 4412px wide frame with side margins)
pub const DEFAULT_GRAPH_WIDTH: u32 = 4086;
pub const DEFAULT_GRAPH_HEIGHT: u32 = 650;
/// Default inner padding between the canvas edge and the plot area
pub const DEFAULT_PADDING: u32 = 60;
/// Default offset of the canvas from the anchored frame edges
pub const DEFAULT_MARGIN_X: u32 = 190;
pub const DEFAULT_MARGIN_Y: u32 = 75;
/// Y-axis ticks are drawn at every multiple of this value
pub const DEFAULT_TICK_INTERVAL: f64 = 10.0;
pub const DEFAULT_TICK_LENGTH: u32 = 20;
/// Water freezing point in Fahrenheit
pub const DEFAULT_REFERENCE_VALUE: f64 = 32.0;
pub const DEFAULT_FONT_SIZE: f32 = 40.0;

/// Which corner of the frame the graph canvas is offset from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphAnchor {
    TopLeft,
    TopRight,
    #[default]
    BottomLeft,
    BottomRight,
}

impl GraphAnchor {
    /// Top-left canvas position on a frame of the given size.
    ///
    /// May be negative or overflow the frame when the canvas is larger than
    /// the frame; compositing clips it.
    pub fn position(
        &self,
        frame_width: u32,
        frame_height: u32,
        canvas_width: u32,
        canvas_height: u32,
        margin_x: u32,
        margin_y: u32,
    ) -> (i64, i64) {
        let left = i64::from(margin_x);
        let top = i64::from(margin_y);
        let right = i64::from(frame_width) - i64::from(canvas_width) - i64::from(margin_x);
        let bottom = i64::from(frame_height) - i64::from(canvas_height) - i64::from(margin_y);

        match self {
            GraphAnchor::TopLeft => (left, top),
            GraphAnchor::TopRight => (right, top),
            GraphAnchor::BottomLeft => (left, bottom),
            GraphAnchor::BottomRight => (right, bottom),
        }
    }
}

impl FromStr for GraphAnchor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "top_left" => Ok(GraphAnchor::TopLeft),
            "top_right" => Ok(GraphAnchor::TopRight),
            "bottom_left" => Ok(GraphAnchor::BottomLeft),
            "bottom_right" => Ok(GraphAnchor::BottomRight),
            _ => Err(ConfigError::InvalidAnchor(s.to_string())),
        }
    }
}

impl fmt::Display for GraphAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphAnchor::TopLeft => "top_left",
            GraphAnchor::TopRight => "top_right",
            GraphAnchor::BottomLeft => "bottom_left",
            GraphAnchor::BottomRight => "bottom_right",
        };
        f.write_str(name)
    }
}

/// Rendering options for the graph overlay.
///
/// Shared read-only by every compositor worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GraphConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Gap between canvas edge and the plotted area, on every side
    pub padding: u32,
    /// Horizontal offset from the anchored frame edge
    pub margin_x: u32,
    /// Vertical offset from the anchored frame edge
    pub margin_y: u32,
    pub anchor: GraphAnchor,

    pub background_color: Color,
    pub border_color: Color,
    /// Axis lines
    pub grid_color: Color,
    pub grid_width: u32,
    pub line_color: Color,
    pub line_width: u32,

    pub tick_color: Color,
    pub tick_interval: f64,
    /// Horizontal length of each tick mark, centered on the Y axis
    pub tick_length: u32,

    /// Horizontal reference line (e.g. freezing point); `None` disables it
    pub reference_value: Option<f64>,
    pub reference_color: Color,

    /// Marker diameter; `None` draws the line only
    pub point_size: Option<u32>,
    pub point_color: Color,
    pub point_outline: Color,

    /// TrueType/OpenType font for min/max labels.
    ///
    /// No system font is looked up: with the default `None` the graph is
    /// drawn without min/max labels. Set this (or `TIMELAPSE_FONT` for the
    /// worker) to a font such as Courier New to get them.
    pub font: Option<PathBuf>,
    pub font_size: f32,
    pub label_color: Color,
    /// Appended to min/max labels
    pub label_suffix: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRAPH_WIDTH,
            height: DEFAULT_GRAPH_HEIGHT,
            padding: DEFAULT_PADDING,
            margin_x: DEFAULT_MARGIN_X,
            margin_y: DEFAULT_MARGIN_Y,
            anchor: GraphAnchor::default(),
            background_color: Color::rgba(0, 0, 0, 200),
            border_color: Color::WHITE,
            grid_color: Color::rgba(255, 255, 255, 150),
            grid_width: 2,
            line_color: Color::WHITE,
            line_width: 2,
            tick_color: Color::WHITE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            tick_length: DEFAULT_TICK_LENGTH,
            reference_value: Some(DEFAULT_REFERENCE_VALUE),
            reference_color: Color::rgba(29, 214, 255, 255),
            point_size: None,
            point_color: Color::WHITE,
            point_outline: Color::BLACK,
            font: None,
            font_size: DEFAULT_FONT_SIZE,
            label_color: Color::rgba(255, 255, 255, 150),
            label_suffix: "°".to_string(),
        }
    }
}

impl GraphConfig {
    /// Set canvas dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Set anchor corner and margins.
    pub fn with_anchor(mut self, anchor: GraphAnchor, margin_x: u32, margin_y: u32) -> Self {
        self.anchor = anchor;
        self.margin_x = margin_x;
        self.margin_y = margin_y;
        self
    }

    pub fn with_point_size(mut self, size: u32) -> Self {
        self.point_size = Some(size);
        self
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font = Some(path.into());
        self
    }

    /// Plot area width (canvas minus padding on both sides).
    pub fn plot_width(&self) -> u32 {
        self.width.saturating_sub(self.padding * 2)
    }

    /// Plot area height (canvas minus padding on both sides).
    pub fn plot_height(&self) -> u32 {
        self.height.saturating_sub(self.padding * 2)
    }

    /// Validate rendering options.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.plot_width() == 0 || self.plot_height() == 0 {
            return Err(ConfigError::GraphTooSmall {
                width: self.width,
                height: self.height,
                padding: self.padding,
            });
        }

        if !(self.tick_interval.is_finite() && self.tick_interval > 0.0) {
            return Err(ConfigError::InvalidTickInterval(self.tick_interval));
        }

        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ConfigError::InvalidFontSize(self.font_size));
        }

        if let Some(font) = &self.font {
            if !font.is_file() {
                return Err(ConfigError::FontNotFound(font.clone()));
            }
        }

        Ok(())
    }
}
