//! Frame discovery and ordering.
//!
//! Directory entries are visited in file-name order (depth-first when
//! recursive), which fixes the discovery order. The configured ordering
//! policy is then applied with a stable sort, so ties keep discovery order
//! and re-running against an unchanged directory yields the same sequence.

use std::ffi::OsString;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use tlapse_models::{Frame, FrameOrder};

use crate::error::{MediaError, MediaResult};
use crate::telemetry;

/// Sort key under the configured ordering policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum OrderKey {
    Time(SystemTime),
    Name(OsString),
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    key: OrderKey,
}

/// Discover images under `dir` and return them in playback order.
///
/// Only files whose name ends with one of `extensions` (matched verbatim,
/// case-sensitive) are kept. With `recursive`, filename ordering compares
/// bare file names, so files from different subdirectories interleave.
///
/// # Errors
///
/// - [`MediaError::UnreadableSource`] if a directory cannot be listed
/// - [`MediaError::EmptyInput`] if no file qualifies
pub fn enumerate_frames(
    dir: &Path,
    recursive: bool,
    extensions: &[String],
    order: FrameOrder,
) -> MediaResult<Vec<Frame>> {
    let started = Instant::now();

    // Surface an unlistable root directly rather than as an empty walk.
    std::fs::read_dir(dir).map_err(|e| MediaError::unreadable_source(dir, e))?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name();

    let mut warned_birth_time = false;
    let mut candidates = Vec::new();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            MediaError::unreadable_source(path, source)
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        if !matches_extension(&file_name.to_string_lossy(), extensions) {
            continue;
        }

        let key = match order {
            FrameOrder::Filename => OrderKey::Name(file_name.to_os_string()),
            FrameOrder::Modified | FrameOrder::Created => {
                let metadata = std::fs::metadata(path)
                    .map_err(|e| MediaError::unreadable_source(path, e))?;
                OrderKey::Time(timestamp(&metadata, order, path, &mut warned_birth_time)?)
            }
        };

        candidates.push(Candidate {
            path: path.to_path_buf(),
            key,
        });
    }

    if candidates.is_empty() {
        return Err(MediaError::EmptyInput {
            dir: dir.to_path_buf(),
            extensions: extensions.to_vec(),
        });
    }

    // Stable: equal keys keep discovery order.
    candidates.sort_by(|a, b| a.key.cmp(&b.key));

    let frames: Vec<Frame> = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| {
            let id = candidate
                .path
                .strip_prefix(dir)
                .unwrap_or(&candidate.path)
                .to_string_lossy()
                .into_owned();
            Frame::new(id, candidate.path, index)
        })
        .collect();

    telemetry::record_frames_discovered(frames.len());
    telemetry::record_stage_duration("frame_source", started.elapsed().as_secs_f64());

    info!(
        dir = %dir.display(),
        frames = frames.len(),
        order = %order,
        recursive,
        "Loaded frames"
    );

    Ok(frames)
}

/// Whether `file_name` ends with any non-empty configured extension.
pub fn matches_extension(file_name: &str, extensions: &[String]) -> bool {
    extensions
        .iter()
        .any(|ext| !ext.is_empty() && file_name.ends_with(ext.as_str()))
}

fn timestamp(
    metadata: &Metadata,
    order: FrameOrder,
    path: &Path,
    warned_birth_time: &mut bool,
) -> MediaResult<SystemTime> {
    if order == FrameOrder::Created {
        match metadata.created() {
            Ok(created) => return Ok(created),
            Err(e) => {
                if !*warned_birth_time {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Creation time unavailable, ordering by modification time"
                    );
                    *warned_birth_time = true;
                } else {
                    debug!(path = %path.display(), "Falling back to modification time");
                }
            }
        }
    }

    metadata
        .modified()
        .map_err(|e| MediaError::unreadable_source(path, e))
}
