//! Timelapse worker.
//!
//! Loads run options from an optional JSON file and `TIMELAPSE_*`
//! environment variables; the binary then runs a single `make_video`.

pub mod config;

pub use config::WorkerConfig;
