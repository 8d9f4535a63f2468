//! Series accumulation and value-to-pixel scaling.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tlapse_models::Reading;

/// Global extent of the present values of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesBounds {
    pub min: f64,
    pub max: f64,
}

impl SeriesBounds {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Readings of a whole run, in frame order, plus their bounds.
///
/// `bounds` is `None` when no reading has a value; the run then skips
/// compositing altogether.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    readings: Vec<Reading>,
    bounds: Option<SeriesBounds>,
}

impl Series {
    /// Order readings by frame index and compute min/max in one pass.
    pub fn finalize(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.index);

        let mut bounds: Option<SeriesBounds> = None;
        for value in readings.iter().filter_map(|r| r.value) {
            bounds = Some(match bounds {
                None => SeriesBounds {
                    min: value,
                    max: value,
                },
                Some(b) => SeriesBounds {
                    min: b.min.min(value),
                    max: b.max.max(value),
                },
            });
        }

        let series = Self { readings, bounds };
        match series.bounds {
            Some(b) => info!(
                readings = series.len(),
                present = series.present_count(),
                min = b.min,
                max = b.max,
                "Determined value range"
            ),
            None => warn!(
                readings = series.len(),
                "No reading produced a value, graph disabled for this run"
            ),
        }
        series
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn bounds(&self) -> Option<SeriesBounds> {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.readings.iter().filter(|r| r.is_present()).count()
    }

    pub fn absent_count(&self) -> usize {
        self.len() - self.present_count()
    }

    /// Present `(frame index, value)` pairs from the first frame up to and
    /// including `index`.
    pub fn points_up_to(&self, index: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.readings
            .iter()
            .take_while(move |r| r.index <= index)
            .filter_map(|r| r.value.map(|v| (r.index, v)))
    }
}

/// Map `value` onto the canvas Y axis.
///
/// `[min, max]` maps linearly onto `[graph_height - padding, padding]`:
/// larger values sit higher, i.e. at smaller Y. A degenerate range puts
/// every value on the vertical center. Used for plotted points, ticks and
/// the reference line alike.
pub fn scale(value: f64, min: f64, max: f64, graph_height: u32, padding: u32) -> f64 {
    let top = f64::from(padding);
    let bottom = f64::from(graph_height) - f64::from(padding);
    let range = max - min;

    if range <= 0.0 || !range.is_finite() {
        return (top + bottom) / 2.0;
    }

    bottom - (value - min) / range * (bottom - top)
}
