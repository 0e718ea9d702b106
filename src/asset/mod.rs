//! Asset records and their discovery.
//!
//! An [`Asset`] is one source file moving through the pipeline. Its name and
//! extension change as converters run; its original path never does and is
//! the cache key.

mod filter;
mod scan;

pub use filter::{EntryFilter, SiteFilter};
pub use scan::collect_assets;

use std::path::{Path, PathBuf};

use crate::freshness::{ContentHash, compute_bytes_hash};
use crate::utils::path::to_slash;

/// Whether a valid prior output exists for an asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheStatus {
    #[default]
    Miss,
    Hit,
}

/// A source file moving through the conversion chain.
#[derive(Debug, Clone)]
pub struct Asset {
    original_path: PathBuf,
    dir: PathBuf,
    original_name: String,
    name: String,
    ext: String,
    hash: ContentHash,
    /// Current payload, replaced by each converter.
    pub content: Vec<u8>,
    pub cache: CacheStatus,
}

impl Asset {
    /// Create an asset from its path relative to the asset source root.
    /// The content hash is computed here, once.
    pub fn new(original_path: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        let original_path = original_path.into();
        let dir = original_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let original_name = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let hash = compute_bytes_hash(&content);

        Self {
            ext: extname(&original_name).to_string(),
            name: original_name.clone(),
            original_path,
            dir,
            original_name,
            hash,
            content,
            cache: CacheStatus::Miss,
        }
    }

    /// Path relative to the asset source root, as discovered.
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    /// Cache map key: the original path with `/` separators.
    pub fn key(&self) -> String {
        to_slash(&self.original_path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current extension without the dot, `""` when there is none.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// Digest of the content at discovery time.
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn is_hit(&self) -> bool {
        self.cache == CacheStatus::Hit
    }

    /// Change the current name; `ext` follows it.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.ext = extname(&self.name).to_string();
    }

    /// Apply a converter's output extension: drop the current extension and
    /// append `output_ext` unless the stripped name already ends with it.
    ///
    /// `site.css.scss → site.css`, `site.scss → site.css`,
    /// `home.a.js → home.a.js`.
    pub fn advance_ext(&mut self, output_ext: &str) {
        let stripped = strip_ext(&self.name);
        let name = if output_ext.is_empty() || extname(stripped) == output_ext {
            stripped.to_string()
        } else {
            format!("{stripped}.{output_ext}")
        };
        self.rename(name);
    }

    /// Restore the discovered name, undoing every chain step.
    pub fn reset_name(&mut self) {
        let name = self.original_name.clone();
        self.rename(name);
    }

    /// Output path relative to the cache root / asset destination.
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// [`output_path`](Self::output_path) with `/` separators, as stored in
    /// the cache map.
    pub fn output_key(&self) -> String {
        to_slash(&self.output_path())
    }
}

/// Extension of a file name without the dot.
///
/// Leading-dot names (`.htaccess`) and trailing dots have no extension.
pub fn extname(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => &name[idx + 1..],
        _ => "",
    }
}

/// Name without its extension.
pub fn strip_ext(name: &str) -> &str {
    let ext = extname(name);
    if ext.is_empty() {
        name
    } else {
        &name[..name.len() - ext.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extname() {
        assert_eq!(extname("site.scss"), "scss");
        assert_eq!(extname("site.css.scss"), "scss");
        assert_eq!(extname("Makefile"), "");
        assert_eq!(extname(".htaccess"), "");
        assert_eq!(extname("weird."), "");
    }

    #[test]
    fn test_strip_ext() {
        assert_eq!(strip_ext("site.css.scss"), "site.css");
        assert_eq!(strip_ext("site.scss"), "site");
        assert_eq!(strip_ext("LICENSE"), "LICENSE");
        assert_eq!(strip_ext(".htaccess"), ".htaccess");
    }

    #[test]
    fn test_new_asset() {
        let asset = Asset::new("css/site.scss", b"a { b: c }".to_vec());
        assert_eq!(asset.dir(), Path::new("css"));
        assert_eq!(asset.original_name(), "site.scss");
        assert_eq!(asset.name(), "site.scss");
        assert_eq!(asset.ext(), "scss");
        assert_eq!(asset.key(), "css/site.scss");
        assert_eq!(asset.hash(), compute_bytes_hash(b"a { b: c }"));
        assert!(!asset.is_hit());
    }

    #[test]
    fn test_advance_ext() {
        let mut asset = Asset::new("site.css.scss", Vec::new());
        asset.advance_ext("css");
        assert_eq!(asset.name(), "site.css");
        assert_eq!(asset.ext(), "css");

        let mut asset = Asset::new("site.scss", Vec::new());
        asset.advance_ext("css");
        assert_eq!(asset.name(), "site.css");
        asset.advance_ext("css");
        assert_eq!(asset.name(), "site.css");

        let mut asset = Asset::new("js/home.a.js", Vec::new());
        asset.advance_ext("js");
        assert_eq!(asset.name(), "home.a.js");
        assert_eq!(asset.output_key(), "js/home.a.js");
    }

    #[test]
    fn test_advance_ext_empty_output() {
        let mut asset = Asset::new("notes.txt", Vec::new());
        asset.advance_ext("");
        assert_eq!(asset.name(), "notes");
        assert_eq!(asset.ext(), "");
    }

    #[test]
    fn test_reset_name() {
        let mut asset = Asset::new("app.coffee", Vec::new());
        asset.advance_ext("js");
        assert_eq!(asset.name(), "app.js");
        asset.reset_name();
        assert_eq!(asset.name(), "app.coffee");
        assert_eq!(asset.ext(), "coffee");
    }
}
