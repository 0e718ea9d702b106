//! Registration of finished outputs with the host.
//!
//! The pipeline never copies into the site destination itself. It hands each
//! surviving asset or bundle to the host as a [`StaticFile`] whose source is
//! the file under the cache root.

use std::path::{Path, PathBuf};

use crate::asset::Asset;
use crate::bundle::Bundle;
use crate::cache::{bundle_root, output_root};
use crate::config::PipelineLayout;

/// A finished output ready to be copied to the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    /// Directory the relative `dir` is resolved against.
    pub base: PathBuf,
    pub dir: PathBuf,
    pub name: String,
    /// Absolute output path in the site destination.
    pub destination: PathBuf,
}

impl StaticFile {
    /// Path of the file to copy.
    pub fn source(&self) -> PathBuf {
        self.base.join(&self.dir).join(&self.name)
    }

    fn new(base: &Path, dir: &Path, name: &str, layout: &PipelineLayout) -> Self {
        Self {
            base: base.to_path_buf(),
            dir: dir.to_path_buf(),
            name: name.to_string(),
            destination: layout
                .site_destination
                .join(&layout.asset_destination)
                .join(dir)
                .join(name),
        }
    }

    pub fn for_asset(asset: &Asset, layout: &PipelineLayout) -> Self {
        Self::new(
            &output_root(&layout.cache_root),
            asset.dir(),
            asset.name(),
            layout,
        )
    }

    pub fn for_bundle(bundle: &Bundle, layout: &PipelineLayout) -> Self {
        Self::new(
            &bundle_root(&layout.cache_root),
            &bundle.dir,
            &bundle.name,
            layout,
        )
    }
}

/// The host's list of static outputs.
pub trait StaticFileRegistry {
    fn register(&mut self, file: StaticFile);
}

impl StaticFileRegistry for Vec<StaticFile> {
    fn register(&mut self, file: StaticFile) {
        self.push(file);
    }
}
