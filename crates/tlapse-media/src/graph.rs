//! Graph rendering.
//!
//! Draws the overlay onto a fresh transparent canvas of the configured size:
//! background and border, axes, Y ticks, the reference line, min/max labels
//! and the series polyline revealed up to the current frame.
//!
//! Absent readings are skipped: the line joins consecutive present points,
//! each placed at its own frame's X position.

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut, Blend, Canvas,
};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use tracing::debug;

use tlapse_models::{Color, GraphConfig};

use crate::error::{MediaError, MediaResult};
use crate::series::{scale, Series, SeriesBounds};

/// Renders graph canvases for one run.
///
/// Holds the immutable graph configuration, the parsed label font and the
/// run's frame count, which fixes horizontal spacing.
pub struct GraphRenderer {
    config: GraphConfig,
    font: Option<Font<'static>>,
    total_frames: usize,
}

impl GraphRenderer {
    /// Create a renderer, loading the label font if one is configured.
    pub fn new(config: GraphConfig, total_frames: usize) -> MediaResult<Self> {
        let font = match &config.font {
            Some(path) => Some(load_font(path)?),
            None => {
                debug!("No label font configured, min/max labels disabled");
                None
            }
        };

        Ok(Self {
            config,
            font,
            total_frames,
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Whether min/max labels are drawn, i.e. a label font is loaded.
    pub fn draws_labels(&self) -> bool {
        self.font.is_some()
    }

    /// Canvas coordinates of every present point up to and including frame
    /// `index`.
    pub fn plot_points(&self, series: &Series, bounds: SeriesBounds, index: usize) -> Vec<(f32, f32)> {
        series
            .points_up_to(index)
            .map(|(i, value)| {
                (
                    x_position(i, self.total_frames, self.config.width, self.config.padding) as f32,
                    self.y(value, bounds) as f32,
                )
            })
            .collect()
    }

    /// Render the graph for frame `index`.
    pub fn render(&self, series: &Series, bounds: SeriesBounds, index: usize) -> RgbaImage {
        let cfg = &self.config;
        let background = RgbaImage::from_pixel(cfg.width, cfg.height, pixel(cfg.background_color));
        let mut canvas = Blend(background);

        let frame_rect = Rect::at(0, 0).of_size(cfg.width, cfg.height);
        draw_hollow_rect_mut(&mut canvas, frame_rect, pixel(cfg.border_color));

        let padding = cfg.padding as f32;
        let left = padding;
        let right = cfg.width as f32 - padding;
        let top = padding;
        let bottom = cfg.height as f32 - padding;

        let grid = pixel(cfg.grid_color);
        draw_thick_line(&mut canvas, (left, bottom), (left, top), cfg.grid_width, grid);
        draw_thick_line(&mut canvas, (left, bottom), (right, bottom), cfg.grid_width, grid);

        let half_tick = cfg.tick_length as f32 / 2.0;
        let tick = pixel(cfg.tick_color);
        for value in tick_values(bounds, cfg.tick_interval, cfg.plot_height()) {
            let y = self.y(value, bounds) as f32;
            draw_thick_line(
                &mut canvas,
                (left - half_tick, y),
                (left + half_tick, y),
                cfg.grid_width,
                tick,
            );
        }

        if let Some(reference) = cfg.reference_value.filter(|v| bounds.contains(*v)) {
            let y = self.y(reference, bounds) as f32;
            draw_line_segment_mut(&mut canvas, (left, y), (right, y), pixel(cfg.reference_color));
        }

        if let Some(font) = &self.font {
            self.draw_labels(&mut canvas, font, bounds);
        }

        let points = self.plot_points(series, bounds, index);
        let line = pixel(cfg.line_color);
        for segment in points.windows(2) {
            draw_thick_line(&mut canvas, segment[0], segment[1], cfg.line_width, line);
        }

        if let Some(size) = cfg.point_size {
            let radius = (size / 2).max(1) as i32;
            for &(x, y) in &points {
                let center = (x.round() as i32, y.round() as i32);
                draw_filled_circle_mut(&mut canvas, center, radius, pixel(cfg.point_color));
                draw_hollow_circle_mut(&mut canvas, center, radius, pixel(cfg.point_outline));
            }
        }

        canvas.0
    }

    fn y(&self, value: f64, bounds: SeriesBounds) -> f64 {
        scale(value, bounds.min, bounds.max, self.config.height, self.config.padding)
    }

    fn draw_labels<C>(&self, canvas: &mut C, font: &Font<'static>, bounds: SeriesBounds)
    where
        C: Canvas<Pixel = Rgba<u8>>,
    {
        let cfg = &self.config;
        let size = Scale::uniform(cfg.font_size);
        let color = pixel(cfg.label_color);
        let x = (cfg.padding / 3) as i32;
        let half_font = (cfg.font_size / 2.0) as i32;
        let half_padding = (cfg.padding / 2) as i32;

        let max_label = format!("{}{}", format_value(bounds.max), cfg.label_suffix);
        let min_label = format!("{}{}", format_value(bounds.min), cfg.label_suffix);

        draw_text_mut(canvas, color, x, half_padding - half_font, size, font, &max_label);
        draw_text_mut(
            canvas,
            color,
            x,
            cfg.height as i32 - half_padding - half_font,
            size,
            font,
            &min_label,
        );
    }
}

/// Horizontal position of frame `index` on the canvas.
///
/// Frames are spread evenly over `[padding, width - padding]`; the line grows
/// to the right as playback advances. A single-frame run sits at the left
/// edge of the plot area.
pub fn x_position(index: usize, total_frames: usize, width: u32, padding: u32) -> f64 {
    let left = f64::from(padding);
    if total_frames <= 1 {
        return left;
    }

    let plot_width = f64::from(width) - 2.0 * f64::from(padding);
    left + plot_width * index as f64 / (total_frames - 1) as f64
}

/// Multiples of `interval` within the bounds.
///
/// Empty when the ticks would be packed tighter than one per pixel of
/// `plot_height`.
pub fn tick_values(bounds: SeriesBounds, interval: f64, plot_height: u32) -> Vec<f64> {
    let first = (bounds.min / interval).ceil();
    let last = (bounds.max / interval).floor();
    if !(first.is_finite() && last.is_finite()) || last < first {
        return Vec::new();
    }

    // Tick multiples are enumerated as i64; `as` would saturate outside it.
    if first < i64::MIN as f64 || last >= i64::MAX as f64 {
        return Vec::new();
    }

    let count = last - first + 1.0;
    if count > f64::from(plot_height.max(1)) {
        return Vec::new();
    }

    (first as i64..=last as i64)
        .map(|k| k as f64 * interval)
        .collect()
}

/// Label text for a value: whole numbers without a fraction, others with one
/// decimal.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}

fn pixel(color: Color) -> Rgba<u8> {
    Rgba(color.to_array())
}

/// A line `width` pixels thick, built from parallel one-pixel segments.
fn draw_thick_line<C>(canvas: &mut C, start: (f32, f32), end: (f32, f32), width: u32, color: Rgba<u8>)
where
    C: Canvas<Pixel = Rgba<u8>>,
{
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();

    if width <= 1 || length == 0.0 {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }

    // Unit normal to the segment.
    let (nx, ny) = (-dy / length, dx / length);
    let half = (width as f32 - 1.0) / 2.0;
    for i in 0..width {
        let offset = i as f32 - half;
        draw_line_segment_mut(
            canvas,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            color,
        );
    }
}

fn load_font(path: &Path) -> MediaResult<Font<'static>> {
    let bytes = std::fs::read(path).map_err(|e| MediaError::InvalidFont {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Font::try_from_vec(bytes).ok_or_else(|| MediaError::InvalidFont {
        path: path.to_path_buf(),
        message: "not a TrueType or OpenType font".to_string(),
    })
}
