//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Encoder progress, assembled from FFmpeg's `-progress` key/value output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodeProgress {
    /// Encoded frames so far
    pub frame: u64,
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    pub is_complete: bool,
}

impl EncodeProgress {
    /// Fraction of `total_frames` encoded, in `[0, 1]`.
    pub fn fraction(&self, total_frames: u64) -> f64 {
        if self.is_complete {
            return 1.0;
        }
        if total_frames == 0 {
            return 0.0;
        }
        (self.frame as f64 / total_frames as f64).min(1.0)
    }

    /// Estimate time remaining in seconds.
    pub fn eta_seconds(&self, total_frames: u64) -> Option<f64> {
        if self.fps <= 0.0 {
            return None;
        }
        let remaining = total_frames.saturating_sub(self.frame);
        Some(remaining as f64 / self.fps)
    }

    /// Fold one `key=value` line into the running state.
    ///
    /// Returns a snapshot at the end of each block (the `progress=` line).
    pub fn update(&mut self, line: &str) -> Option<EncodeProgress> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key {
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    self.fps = fps;
                }
            }
            // Despite the name, FFmpeg reports out_time_ms in microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                if value == "end" {
                    self.is_complete = true;
                }
                return Some(self.clone());
            }
            _ => {}
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block() {
        let mut progress = EncodeProgress::default();
        let lines = [
            "frame=120",
            "fps=48.5",
            "out_time_us=4800000",
            "speed=1.9x",
        ];
        for line in lines {
            assert!(progress.update(line).is_none());
        }

        let snapshot = progress.update("progress=continue").unwrap();
        assert_eq!(snapshot.frame, 120);
        assert_eq!(snapshot.out_time_ms, 4800);
        assert!((snapshot.speed - 1.9).abs() < 1e-9);
        assert!(!snapshot.is_complete);

        let last = progress.update("progress=end").unwrap();
        assert!(last.is_complete);
    }

    #[test]
    fn test_unparseable_values_are_ignored() {
        let mut progress = EncodeProgress::default();
        progress.update("speed=N/A");
        progress.update("frame=abc");
        progress.update("Stream mapping:");
        assert_eq!(progress, EncodeProgress::default());
    }

    #[test]
    fn test_fraction_and_eta() {
        let progress = EncodeProgress {
            frame: 50,
            fps: 25.0,
            ..Default::default()
        };
        assert!((progress.fraction(200) - 0.25).abs() < 1e-9);
        assert_eq!(progress.fraction(0), 0.0);
        assert!((progress.eta_seconds(200).unwrap() - 6.0).abs() < 1e-9);

        let done = EncodeProgress {
            is_complete: true,
            ..Default::default()
        };
        assert_eq!(done.fraction(200), 1.0);
        assert!(done.eta_seconds(200).is_none());
    }
}
