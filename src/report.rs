//! Conversion failure reporting.
//!
//! Failures are collected during the run and rendered into a single log
//! artifact in the host's includes directory. The artifact is rewritten
//! only when its content changes, so an unchanged site stays untouched.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::cache::file_content_matches;
use crate::debug;
use crate::utils::html::escape;

/// Error log file name (inside the includes directory)
pub const ERROR_LOG_FILE: &str = "asset_pipeline_errors.log";

/// Includable wrapper embedding the log (inside the includes directory)
pub const ERROR_FRAGMENT_FILE: &str = "asset_pipeline_errors.html";

const FRAGMENT: &str = r#"{% capture asset_pipeline_error_content %}{% include asset_pipeline_errors.log %}{% endcapture %}
{% unless asset_pipeline_error_content contains "Liquid error" or asset_pipeline_error_content contains "not found in _includes directory" %}
<span class="asset-pipeline-errors">{% include asset_pipeline_errors.log %}</span>
{% endunless %}
"#;

/// One failed stage: a converter, or `cache`/`bundle` for output writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub converter: String,
    /// Original path of the asset (or output path of a bundle).
    pub asset: String,
    pub message: String,
}

impl Failure {
    pub fn new(
        converter: impl Into<String>,
        asset: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            converter: converter.into(),
            asset: asset.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed on file '{}': {}",
            self.converter,
            self.asset,
            single_line(&self.message)
        )
    }
}

/// Multi-line messages (compiler stderr) collapse onto one line.
fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of [`ErrorReport::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// No includes directory.
    Skipped,
    /// Existing artifact already had this content.
    Unchanged,
    Written,
}

/// Failures of one run.
#[derive(Debug, Default, Clone)]
pub struct ErrorReport {
    failures: Vec<Failure>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub fn extend(&mut self, failures: impl IntoIterator<Item = Failure>) {
        self.failures.extend(failures);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Order by asset path, then converter.
    pub fn sort(&mut self) {
        self.failures.sort_by(|a, b| {
            (&a.asset, &a.converter, &a.message).cmp(&(&b.asset, &b.converter, &b.message))
        });
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// One HTML-escaped line per failure; empty without failures.
    pub fn render(&self) -> String {
        let mut sorted = self.clone();
        sorted.sort();
        sorted
            .failures
            .iter()
            .map(|failure| format!("{}\n", escape(&failure.to_string())))
            .collect()
    }

    /// Write the rendered log to `{includes}/asset_pipeline_errors.log`
    /// unless it already holds exactly this content.
    pub fn write(&self, includes: Option<&Path>) -> io::Result<WriteStatus> {
        let Some(includes) = includes else {
            return Ok(WriteStatus::Skipped);
        };
        let path = includes.join(ERROR_LOG_FILE);
        let content = self.render();

        if file_content_matches(&path, content.as_bytes()) {
            debug!("error"; "error log unchanged, skipping write");
            return Ok(WriteStatus::Unchanged);
        }

        fs::write(&path, &content)?;
        debug!("error"; "wrote {} failures to {}", self.len(), path.display());
        Ok(WriteStatus::Written)
    }
}

/// Install the includable wrapper fragment next to the log, once.
/// Returns `false` when it already exists (hosts may customize it).
pub fn install_fragment(includes: &Path) -> io::Result<bool> {
    let path = includes.join(ERROR_FRAGMENT_FILE);
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, FRAGMENT)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report() -> ErrorReport {
        let mut report = ErrorReport::new();
        report.push(Failure::new("sass", "css/z.scss", "Undefined variable: \"$x\""));
        report.push(Failure::new("minify-js", "js/a.js", "failed to parse\n  at line 3\n"));
        report.push(Failure::new("lint", "css/z.scss", "<bad>"));
        report
    }

    #[test]
    fn test_render_sorted_and_escaped() {
        let rendered = report().render();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(
            lines,
            [
                "lint failed on file &#39;css/z.scss&#39;: &lt;bad&gt;",
                "sass failed on file &#39;css/z.scss&#39;: Undefined variable: &quot;$x&quot;",
                "minify-js failed on file &#39;js/a.js&#39;: failed to parse at line 3",
            ]
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(ErrorReport::new().render(), "");
    }

    #[test]
    fn test_write_only_on_change() {
        let dir = TempDir::new().unwrap();
        let report = report();

        assert_eq!(report.write(Some(dir.path())).unwrap(), WriteStatus::Written);
        assert_eq!(report.write(Some(dir.path())).unwrap(), WriteStatus::Unchanged);

        let empty = ErrorReport::new();
        assert_eq!(empty.write(Some(dir.path())).unwrap(), WriteStatus::Written);
        let log = fs::read_to_string(dir.path().join(ERROR_LOG_FILE)).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_write_without_includes() {
        assert_eq!(report().write(None).unwrap(), WriteStatus::Skipped);
    }

    #[test]
    fn test_install_fragment_once() {
        let dir = TempDir::new().unwrap();
        assert!(install_fragment(dir.path()).unwrap());
        let path = dir.path().join(ERROR_FRAGMENT_FILE);
        assert!(fs::read_to_string(&path).unwrap().contains(ERROR_LOG_FILE));

        fs::write(&path, "custom").unwrap();
        assert!(!install_fragment(dir.path()).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom");
    }
}
