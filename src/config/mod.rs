//! Site configuration management for `assetline.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── pipeline   # [asset_pipeline] and sub-sections
//! │   └── site       # [site]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # config discovery, path resolution
//! └── mod.rs         # SiteConfig, PipelineLayout (this file)
//! ```
//!
//! # Sections
//!
//! | Section                          | Purpose                                |
//! |----------------------------------|----------------------------------------|
//! | `[site]`                         | Site source/destination, entry filter  |
//! | `[asset_pipeline]`               | Asset paths, cache dir, strict mode    |
//! | `[asset_pipeline.minify]`        | Built-in JS/CSS minifiers              |
//! | `[asset_pipeline.error_log]`     | Error artifact in the includes dir     |
//! | `[[asset_pipeline.converters]]`  | External command converters            |

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};
pub use section::{
    ConverterEntry, ErrorLogConfig, MinifyConfig, PipelineSectionConfig, SiteSectionConfig,
};
pub use util::find_config_file;
pub(crate) use util::resolve_path;

use crate::{cli::BuildArgs, log};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing assetline.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub site: SiteSectionConfig,

    #[serde(default)]
    pub asset_pipeline: PipelineSectionConfig,
}

impl SiteConfig {
    /// Load configuration from a config file.
    ///
    /// Unknown fields are reported as warnings and ignored. The project root
    /// is the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config_path)
            .map_err(|err| ConfigError::Io(config_path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, config_path);
        }

        config.config_path = crate::utils::path::normalize_path(config_path);
        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.finalize(&root)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string and resolve it against `root`.
    pub fn from_str(content: &str, root: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.finalize(root)?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Validate raw values, then resolve paths against `root`.
    ///
    /// Validation runs first because normalization turns relative paths into
    /// absolute ones, hiding absolute paths the user wrote.
    fn finalize(&mut self, root: &Path) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.asset_pipeline.validate(&mut diag);
        diag.into_result()?;

        self.root = crate::utils::path::normalize_path(root);
        let root = self.root.clone();
        self.site.normalize(&root);

        let mut diag = ConfigDiagnostics::new();
        self.site.validate(&mut diag);
        diag.into_result()
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply build arguments from CLI.
    pub fn apply_build_args(&mut self, args: &BuildArgs) {
        if args.strict {
            self.asset_pipeline.fail_on_error = true;
        }
        if args.jobs.is_some() {
            self.asset_pipeline.jobs = args.jobs;
        }
    }

    // ========================================================================
    // resolved layout
    // ========================================================================

    /// Resolve the absolute directories the pipeline works with.
    ///
    /// Fails when a required pipeline path is missing or the asset source
    /// directory does not exist.
    pub fn layout(&self) -> Result<PipelineLayout, ConfigError> {
        let pipeline = &self.asset_pipeline;
        let (Some(source), Some(destination)) = (&pipeline.source, &pipeline.destination) else {
            return Err(ConfigError::Validation(format!(
                "asset pipeline requires source and destination, e.g.\n{}",
                section::EXAMPLE
            )));
        };

        let asset_source = resolve_path(&self.site.source, source);
        if !asset_source.is_dir() {
            return Err(ConfigError::Validation(format!(
                "asset source directory '{}' does not exist",
                asset_source.display()
            )));
        }

        let includes = self.site.source.join(&self.site.includes);
        let includes = (pipeline.error_log.enable && includes.is_dir()).then_some(includes);

        Ok(PipelineLayout {
            site_source: self.site.source.clone(),
            site_destination: self.site.destination.clone(),
            cache_root: resolve_path(&asset_source, &pipeline.cache_dir),
            asset_source,
            asset_destination: destination.clone(),
            includes,
        })
    }
}

/// Absolute directories of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLayout {
    pub site_source: PathBuf,
    pub site_destination: PathBuf,
    /// Root of the asset tree; `Asset::original_path` is relative to it.
    pub asset_source: PathBuf,
    /// Output directory relative to `site_destination`.
    pub asset_destination: PathBuf,
    /// Converted outputs, bundles and the cache map live here.
    pub cache_root: PathBuf,
    /// Includes directory for the error artifact, if it exists and is enabled.
    pub includes: Option<PathBuf>,
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Build a site under `root` with `_assets/` as asset source and the given
/// extra `[asset_pipeline]` lines.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub(crate) fn test_site_config(root: &Path, extra: &str) -> SiteConfig {
    fs::create_dir_all(root.join("_assets")).unwrap();
    let content = format!(
        "[asset_pipeline]\nsource = \"_assets\"\ndestination = \"assets\"\n{extra}"
    );
    let (_, ignored) = SiteConfig::parse_with_ignored(&content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    SiteConfig::from_str(&content, root).unwrap()
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = SiteConfig::from_str("[asset_pipeline\nsource = \"x\"", Path::new("."));
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_missing_pipeline_paths() {
        let err = SiteConfig::from_str("[site]\nsource = \".\"", Path::new(".")).unwrap_err();
        let ConfigError::Diagnostics(diag) = err else {
            panic!("expected diagnostics");
        };
        assert_eq!(diag.len(), 2);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[asset_pipeline]\nsource = \"a\"\ndestination = \"b\"\nsorce = \"typo\"";
        let (config, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.asset_pipeline.source, Some(PathBuf::from("a")));
        assert!(ignored.iter().any(|f| f.contains("sorce")));
    }

    #[test]
    fn test_layout_resolves_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("_includes")).unwrap();
        let config = test_site_config(dir.path(), "");
        let layout = config.layout().unwrap();

        let root = config.get_root();
        assert_eq!(layout.site_source, root);
        assert_eq!(layout.site_destination, root.join("_site"));
        assert_eq!(layout.asset_source, root.join("_assets"));
        assert_eq!(layout.asset_destination, PathBuf::from("assets"));
        assert_eq!(layout.cache_root, root.join("_assets").join(".asset_cache"));
        assert_eq!(layout.includes, Some(root.join("_includes")));
    }

    #[test]
    fn test_layout_without_includes() {
        let dir = TempDir::new().unwrap();
        let config = test_site_config(dir.path(), "");
        assert_eq!(config.layout().unwrap().includes, None);

        fs::create_dir_all(dir.path().join("_includes")).unwrap();
        let config = test_site_config(dir.path(), "[asset_pipeline.error_log]\nenable = false");
        assert_eq!(config.layout().unwrap().includes, None);
    }

    #[test]
    fn test_layout_missing_asset_source() {
        let dir = TempDir::new().unwrap();
        let content = "[asset_pipeline]\nsource = \"missing\"\ndestination = \"assets\"";
        let config = SiteConfig::from_str(content, dir.path()).unwrap();
        let err = config.layout().unwrap_err();
        assert!(format!("{err}").contains("does not exist"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("_assets")).unwrap();
        let path = dir.path().join("assetline.toml");
        fs::write(
            &path,
            "[asset_pipeline]\nsource = \"_assets\"\ndestination = \"assets\"\nfail_on_error = true\n",
        )
        .unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert!(config.asset_pipeline.fail_on_error);
        assert_eq!(config.get_root(), crate::utils::path::normalize_path(dir.path()));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SiteConfig::load(Path::new("/no-such-dir/assetline.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_apply_build_args() {
        let dir = TempDir::new().unwrap();
        let mut config = test_site_config(dir.path(), "");
        let args = BuildArgs {
            strict: true,
            jobs: Some(2),
            ..Default::default()
        };
        config.apply_build_args(&args);
        assert!(config.asset_pipeline.fail_on_error);
        assert_eq!(config.asset_pipeline.jobs, Some(2));
    }
}
