//! `[site]` section configuration.
//!
//! Describes the host site the pipeline runs inside of.
//!
//! # Example
//!
//! ```toml
//! [site]
//! source = "."
//! destination = "_site"
//! includes = "_includes"
//! include = [".htaccess"]
//! exclude = ["node_modules", "vendor"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSectionConfig {
    /// Site source directory, relative to the config file.
    pub source: PathBuf,

    /// Site output directory, relative to the config file.
    pub destination: PathBuf,

    /// Directory for includable fragments (error log). Relative to `source`.
    /// Skipped when the directory does not exist.
    pub includes: PathBuf,

    /// Entry names kept even though they start with `.`, `_` or `#`.
    pub include: Vec<String>,

    /// Entry names or source-relative paths to skip.
    pub exclude: Vec<String>,
}

impl Default for SiteSectionConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            destination: PathBuf::from("_site"),
            includes: PathBuf::from("_includes"),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl SiteSectionConfig {
    /// Resolve `source` and `destination` against the project root.
    pub fn normalize(&mut self, root: &Path) {
        self.source = crate::config::resolve_path(root, &self.source);
        self.destination = crate::config::resolve_path(root, &self.destination);
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.includes.is_absolute() {
            diag.error_with_hint(
                FieldPath::new("site.includes"),
                format!("must be relative to site.source, got '{}'", self.includes.display()),
                "includes = \"_includes\"",
            );
        }
        if self.source == self.destination {
            diag.error(
                FieldPath::new("site.destination"),
                "must differ from site.source",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_defaults() {
        let site = SiteSectionConfig::default();
        assert_eq!(site.source, PathBuf::from("."));
        assert_eq!(site.destination, PathBuf::from("_site"));
        assert_eq!(site.includes, PathBuf::from("_includes"));
        assert!(site.include.is_empty());
    }

    #[test]
    fn test_site_validate_same_dirs() {
        let mut site = SiteSectionConfig::default();
        site.normalize(Path::new("/project"));
        let mut diag = ConfigDiagnostics::new();
        site.validate(&mut diag);
        assert!(diag.is_empty());

        site.destination = site.source.clone();
        site.validate(&mut diag);
        assert_eq!(diag.len(), 1);
    }
}
