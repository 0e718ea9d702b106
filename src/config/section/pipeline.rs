//! `[asset_pipeline]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [asset_pipeline]
//! source = "_assets"
//! destination = "assets"
//! fail_on_error = false
//! timeout = 30
//!
//! [asset_pipeline.minify]
//! js = true
//! css = true
//!
//! [[asset_pipeline.converters]]
//! name = "sass"
//! extensions = ["scss", "sass"]
//! output = "css"
//! command = ["sass", "--stdin"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::convert::Priority;

/// Example shown whenever a required pipeline path is missing.
pub(crate) const EXAMPLE: &str = "[asset_pipeline]\nsource = \"_assets\"\ndestination = \"assets\"";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSectionConfig {
    /// Asset source directory, relative to `site.source`. Required.
    pub source: Option<PathBuf>,

    /// Output directory, relative to `site.destination`. Required.
    pub destination: Option<PathBuf>,

    /// Cache directory, relative to the asset source directory.
    pub cache_dir: PathBuf,

    /// Abort the build after reporting when any conversion failed.
    pub fail_on_error: bool,

    /// Concatenate same-prefix assets into bundles.
    pub bundle: bool,

    /// Worker threads for conversion chains. `None` uses rayon's default.
    pub jobs: Option<usize>,

    /// Per-invocation converter timeout in seconds.
    pub timeout: Option<u64>,

    pub minify: MinifyConfig,

    pub error_log: ErrorLogConfig,

    /// External command converters, in registry order.
    pub converters: Vec<ConverterEntry>,
}

impl Default for PipelineSectionConfig {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            cache_dir: PathBuf::from(".asset_cache"),
            fail_on_error: false,
            bundle: true,
            jobs: None,
            timeout: None,
            minify: MinifyConfig::default(),
            error_log: ErrorLogConfig::default(),
            converters: Vec::new(),
        }
    }
}

impl PipelineSectionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Check raw values before paths are resolved.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.source.is_none() {
            diag.error_with_hint(
                FieldPath::new("asset_pipeline.source"),
                "asset pipeline requires a source directory",
                EXAMPLE,
            );
        }
        if self.destination.is_none() {
            diag.error_with_hint(
                FieldPath::new("asset_pipeline.destination"),
                "asset pipeline requires a destination directory",
                EXAMPLE,
            );
        }
        for (field, path) in [
            ("asset_pipeline.source", &self.source),
            ("asset_pipeline.destination", &self.destination),
        ] {
            if let Some(path) = path
                && path.is_absolute()
            {
                diag.error(
                    FieldPath::new(field),
                    format!("must be a relative path, got '{}'", path.display()),
                );
            }
        }
        if self.cache_dir.as_os_str().is_empty() {
            diag.error(FieldPath::new("asset_pipeline.cache_dir"), "must not be empty");
        }
        if self.jobs == Some(0) {
            diag.error(FieldPath::new("asset_pipeline.jobs"), "must be at least 1");
        }
        if self.timeout == Some(0) {
            diag.error_with_hint(
                FieldPath::new("asset_pipeline.timeout"),
                "must be at least 1 second",
                "omit `timeout` to disable the limit",
            );
        }

        let mut names = std::collections::BTreeSet::new();
        for (idx, entry) in self.converters.iter().enumerate() {
            entry.validate(idx, diag);
            if !names.insert(entry.name.as_str()) {
                diag.error(
                    FieldPath::new("asset_pipeline.converters"),
                    format!("[{idx}] duplicate converter name '{}'", entry.name),
                );
            }
        }
    }
}

/// `[asset_pipeline.minify]`: built-in minifiers, applied last (low priority).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinifyConfig {
    pub js: bool,
    pub css: bool,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self { js: true, css: true }
    }
}

/// `[asset_pipeline.error_log]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogConfig {
    /// Write `asset_pipeline_errors.log` into the includes directory.
    pub enable: bool,
    /// Install the includable HTML wrapper next to the log (never overwritten).
    pub fragment: bool,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            enable: true,
            fragment: true,
        }
    }
}

/// `[[asset_pipeline.converters]]`: a converter backed by an external command
/// that reads the payload on stdin and writes the result to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterEntry {
    pub name: String,

    /// Input extensions, without the leading dot.
    pub extensions: Vec<String>,

    /// Output extension, without the leading dot.
    pub output: String,

    #[serde(default)]
    pub priority: Priority,

    /// Program and arguments.
    pub command: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ConverterEntry {
    fn validate(&self, idx: usize, diag: &mut ConfigDiagnostics) {
        let field = FieldPath::new("asset_pipeline.converters");
        if self.name.trim().is_empty() {
            diag.error(field, format!("[{idx}] `name` must not be empty"));
        }
        if self.command.is_empty() {
            diag.error_with_hint(
                field,
                format!("[{idx}] converter '{}' has an empty `command`", self.name),
                "command = [\"sass\", \"--stdin\"]",
            );
        }
        if self.extensions.is_empty() {
            diag.error(
                field,
                format!("[{idx}] converter '{}' matches no `extensions`", self.name),
            );
        }
        for ext in self.extensions.iter().chain(std::iter::once(&self.output)) {
            if ext.starts_with('.') || ext.contains('/') {
                diag.error_with_hint(
                    field,
                    format!("[{idx}] invalid extension '{ext}' in converter '{}'", self.name),
                    "write extensions without the leading dot, e.g. \"scss\"",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> PipelineSectionConfig {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_pipeline_defaults() {
        let section = PipelineSectionConfig::default();
        assert!(section.source.is_none());
        assert_eq!(section.cache_dir, PathBuf::from(".asset_cache"));
        assert!(section.bundle);
        assert!(!section.fail_on_error);
        assert!(section.minify.js && section.minify.css);
        assert!(section.error_log.enable);
        assert_eq!(section.timeout(), None);
    }

    #[test]
    fn test_missing_paths_reported_with_example() {
        let mut diag = ConfigDiagnostics::new();
        PipelineSectionConfig::default().validate(&mut diag);
        assert_eq!(diag.len(), 2);
        assert!(
            diag.errors()
                .iter()
                .all(|e| e.hint.as_deref() == Some(EXAMPLE))
        );
    }

    #[test]
    fn test_converter_entry_parse() {
        let section = parse(
            r#"
            source = "_assets"
            destination = "assets"
            timeout = 5

            [[converters]]
            name = "sass"
            extensions = ["scss", "sass"]
            output = "css"
            priority = "high"
            command = ["sass", "--stdin"]
            env = { SASS_PATH = "vendor" }
            "#,
        );
        assert_eq!(section.timeout(), Some(Duration::from_secs(5)));
        let entry = &section.converters[0];
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(entry.env.get("SASS_PATH").map(String::as_str), Some("vendor"));

        let mut diag = ConfigDiagnostics::new();
        section.validate(&mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_converter_entry_invalid() {
        let section = parse(
            r#"
            source = "_assets"
            destination = "assets"
            jobs = 0

            [[converters]]
            name = "coffee"
            extensions = [".coffee"]
            output = "js"
            command = []

            [[converters]]
            name = "coffee"
            extensions = ["cs"]
            output = "js"
            command = ["coffee", "-sc"]
            "#,
        );
        let mut diag = ConfigDiagnostics::new();
        section.validate(&mut diag);
        // jobs, empty command, dotted extension, duplicate name
        assert_eq!(diag.len(), 4);
    }
}
