//! Graph compositing onto frames.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::trace;

use tlapse_models::{Frame, GraphConfig};

use crate::error::{CompositeError, MediaResult};
use crate::graph::GraphRenderer;
use crate::series::Series;

/// Overlays the progressive graph onto each frame.
///
/// Output frames keep the source dimensions; the canvas is placed relative to
/// the configured anchor corner and clipped at the frame edges.
pub struct GraphCompositor {
    renderer: GraphRenderer,
}

impl GraphCompositor {
    pub fn new(config: GraphConfig, total_frames: usize) -> MediaResult<Self> {
        Ok(Self {
            renderer: GraphRenderer::new(config, total_frames)?,
        })
    }

    pub fn renderer(&self) -> &GraphRenderer {
        &self.renderer
    }

    /// Composite the graph for frame `index` onto `source`.
    ///
    /// With no value anywhere in the series the frame is returned unchanged.
    pub fn compose(&self, source: &DynamicImage, series: &Series, index: usize) -> RgbaImage {
        let mut frame = source.to_rgba8();
        let Some(bounds) = series.bounds() else {
            return frame;
        };

        let graph = self.renderer.render(series, bounds, index);
        let cfg = self.renderer.config();
        let (x, y) = cfg.anchor.position(
            frame.width(),
            frame.height(),
            graph.width(),
            graph.height(),
            cfg.margin_x,
            cfg.margin_y,
        );
        trace!(frame = index, x, y, "Overlaying graph");

        image::imageops::overlay(&mut frame, &graph, x, y);
        frame
    }

    /// Decode `frame`, composite it and write the result to `dest` as JPEG.
    pub fn compose_file(
        &self,
        frame: &Frame,
        series: &Series,
        dest: &Path,
    ) -> Result<(), CompositeError> {
        let source = image::open(&frame.path).map_err(|source| CompositeError::Decode {
            path: frame.path.clone(),
            source,
        })?;

        let composed =
            panic::catch_unwind(AssertUnwindSafe(|| self.compose(&source, series, frame.index)))
                .map_err(|_| CompositeError::Render { index: frame.index })?;

        save_jpeg(&DynamicImage::ImageRgba8(composed), dest)
    }
}

/// Write `image` as an RGB JPEG. JPEG has no alpha channel.
pub(crate) fn save_jpeg(image: &DynamicImage, dest: &Path) -> Result<(), CompositeError> {
    image
        .to_rgb8()
        .save_with_format(dest, ImageFormat::Jpeg)
        .map_err(|source| CompositeError::Write {
            path: dest.to_path_buf(),
            source,
        })
}
