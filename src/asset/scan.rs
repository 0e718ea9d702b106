//! Asset discovery.
//!
//! Explicit recursion over sorted directory entries so traversal order (and
//! thus every downstream artifact) is deterministic.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, PipelineLayout};
use crate::utils::path::normalize_path;
use crate::{debug, log};

use super::{Asset, EntryFilter};

/// Collect every regular file below the asset source root.
///
/// The site destination, the cache directory and symbolic links are never
/// visited. Unreadable entries below the root are logged and skipped; an
/// unreadable root is a configuration error.
pub fn collect_assets(
    layout: &PipelineLayout,
    filter: &dyn EntryFilter,
) -> Result<Vec<Asset>, ConfigError> {
    let root = &layout.asset_source;
    let entries = read_sorted(root).map_err(|err| ConfigError::Io(root.clone(), err))?;

    let walker = Walker {
        root,
        filter,
        skip: [
            normalize_path(&layout.site_destination),
            normalize_path(&layout.cache_root),
        ],
    };
    let mut assets = Vec::new();
    walker.walk(Path::new(""), entries, &mut assets);

    debug!("assets"; "collected {} files from {}", assets.len(), root.display());
    Ok(assets)
}

struct Walker<'a> {
    root: &'a Path,
    filter: &'a dyn EntryFilter,
    skip: [PathBuf; 2],
}

impl Walker<'_> {
    fn walk(&self, rel_dir: &Path, entries: Vec<OsString>, assets: &mut Vec<Asset>) {
        let abs_dir = self.root.join(rel_dir);

        for name in self.filter.filter_entries(&abs_dir, entries) {
            let abs = abs_dir.join(&name);
            let rel = rel_dir.join(&name);

            let meta = match fs::symlink_metadata(&abs) {
                Ok(meta) => meta,
                Err(err) => {
                    log!("assets"; "skipping {}: {}", abs.display(), err);
                    continue;
                }
            };

            if meta.file_type().is_symlink() {
                debug!("assets"; "skipping symlink {}", rel.display());
            } else if meta.is_dir() {
                let normalized = normalize_path(&abs);
                if self.skip.contains(&normalized) {
                    continue;
                }
                match read_sorted(&abs) {
                    Ok(children) => self.walk(&rel, children, assets),
                    Err(err) => log!("assets"; "skipping unreadable directory {}: {}", abs.display(), err),
                }
            } else if meta.is_file() {
                match fs::read(&abs) {
                    Ok(content) => assets.push(Asset::new(rel, content)),
                    Err(err) => log!("assets"; "skipping unreadable file {}: {}", abs.display(), err),
                }
            }
        }
    }
}

/// Entry names of `dir`, sorted.
fn read_sorted(dir: &Path) -> io::Result<Vec<OsString>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}
