//! Content cache: converted outputs under the cache root plus the persisted
//! map deciding hit or miss on the next run.
//!
//! ```text
//! {cache_root}/
//! ├── asset_map.json     # original path → {hash, out}
//! ├── bundles/           # concatenated bundle outputs
//! └── files/css/site.css # converted outputs, at their `out` path
//! ```
//!
//! Converted outputs get their own subtree so a source named like the map or
//! the bundle directory cannot overwrite either.

mod map;

pub use map::{CacheEntry, CacheMap, MAP_VERSION};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cache map file name (inside the cache root)
pub const MAP_FILE: &str = "asset_map.json";

/// Bundle outputs directory (inside the cache root)
pub const BUNDLE_DIR: &str = "bundles";

/// Converted outputs directory (inside the cache root)
pub const OUTPUT_DIR: &str = "files";

/// Root of converted outputs; `CacheEntry::out` is relative to it.
pub fn output_root(cache_root: &Path) -> PathBuf {
    cache_root.join(OUTPUT_DIR)
}

/// Root of bundle outputs.
pub fn bundle_root(cache_root: &Path) -> PathBuf {
    cache_root.join(BUNDLE_DIR)
}

/// Remove the whole cache directory, forcing a full rebuild.
pub fn clear_cache_dir(cache_root: &Path) -> io::Result<()> {
    if cache_root.exists() {
        fs::remove_dir_all(cache_root)?;
    }
    Ok(())
}

/// Write `content` to `base/rel`, creating parent directories.
pub fn write_output(base: &Path, rel: &str, content: &[u8]) -> io::Result<PathBuf> {
    let path = base.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}

/// Check if file content is the same as new content
pub fn file_content_matches(path: &Path, content: &[u8]) -> bool {
    fs::read(path).is_ok_and(|existing| existing == content)
}
