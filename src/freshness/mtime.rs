//! Mtime-based freshness detection for copied files.
//!
//! Used when the host copies cache outputs into the site destination, where
//! both files are written by us and timestamps are reliable.
//!
//! # When to Use
//!
//! - **mtime**: For comparing pipeline-written files (cache vs destination)
//! - **content-hash**: For source file detection (source vs cache map)

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if file A is newer than file B
///
/// Returns `true` if A exists and is newer than B
/// Returns `false` if either file doesn't exist or times can't be compared
pub fn is_newer_than(a: &Path, b: &Path) -> bool {
    let (Some(a_time), Some(b_time)) = (get_mtime(a), get_mtime(b)) else {
        return false;
    };
    a_time > b_time
}
