//! Converters backed by an external program.
//!
//! The payload is piped to the program's stdin and its stdout becomes the
//! converted content, e.g. `sass --stdin` or `npx esbuild --minify`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{ConfigError, ConverterEntry};
use crate::utils::exec::{Cmd, TimedOut};

use super::{ConvertError, Converter, Priority};

/// A converter configured in `[[asset_pipeline.converters]]`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    name: String,
    extensions: Vec<String>,
    output: String,
    priority: Priority,
    command: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: PathBuf,
    /// The process is killed once this passes.
    timeout: Option<Duration>,
}

impl CommandConverter {
    /// Build from a config entry, resolving the program against `PATH` and
    /// `cwd`. A program that cannot be found is a configuration error.
    pub fn from_entry(entry: &ConverterEntry, cwd: &Path) -> Result<Self, ConfigError> {
        let Some(program) = entry.command.first() else {
            return Err(ConfigError::Validation(format!(
                "converter '{}' has an empty command",
                entry.name
            )));
        };
        which::which_in(program, std::env::var_os("PATH"), cwd).map_err(|_| {
            ConfigError::Validation(format!(
                "converter '{}': program `{}` not found",
                entry.name, program
            ))
        })?;

        Ok(Self {
            name: entry.name.clone(),
            extensions: entry.extensions.clone(),
            output: entry.output.clone(),
            priority: entry.priority,
            command: entry.command.clone(),
            env: entry.env.clone(),
            cwd: cwd.to_path_buf(),
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Converter for CommandConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn matches(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    fn output_ext(&self, _ext: &str) -> String {
        self.output.clone()
    }

    fn convert(&self, content: &[u8]) -> Result<Vec<u8>, ConvertError> {
        let output = Cmd::from_slice(self.command.as_slice())
            .cwd(&self.cwd)
            .envs(&self.env)
            .stdin(content)
            .timeout(self.timeout)
            .run()
            .map_err(|e| match e.downcast_ref::<TimedOut>() {
                Some(timed_out) => ConvertError::Timeout(timed_out.limit),
                None => ConvertError::failed(format!("{e:#}")),
            })?;
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(command: &[&str]) -> ConverterEntry {
        ConverterEntry {
            name: "upper".into(),
            extensions: vec!["txt".into()],
            output: "up".into(),
            priority: Priority::High,
            command: command.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::from([("MARK".to_string(), "!".to_string())]),
        }
    }

    #[test]
    fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let err = CommandConverter::from_entry(&entry(&["assetline-no-such-program"]), dir.path())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_converts_stdin() {
        let dir = TempDir::new().unwrap();
        let converter = CommandConverter::from_entry(
            &entry(&["sh", "-c", "tr a-z A-Z; printf %s \"$MARK\""]),
            dir.path(),
        )
        .unwrap();

        assert!(converter.matches("txt"));
        assert!(converter.matches("TXT"));
        assert!(!converter.matches("css"));
        assert_eq!(converter.output_ext("txt"), "up");
        assert_eq!(converter.priority(), Priority::High);
        assert_eq!(converter.convert(b"abc").unwrap(), b"ABC!");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_failure() {
        let dir = TempDir::new().unwrap();
        let converter =
            CommandConverter::from_entry(&entry(&["sh", "-c", "echo 'bad input' >&2; exit 1"]), dir.path())
                .unwrap();
        let err = converter.convert(b"abc").unwrap_err();
        assert!(format!("{err}").contains("bad input"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let script = "sleep 2; touch finished";
        let converter = CommandConverter::from_entry(&entry(&["sh", "-c", script]), dir.path())
            .unwrap()
            .with_timeout(Some(Duration::from_millis(200)));

        let err = converter.convert(b"abc").unwrap_err();
        assert!(matches!(err, ConvertError::Timeout(limit) if limit == Duration::from_millis(200)));

        std::thread::sleep(Duration::from_millis(2500));
        assert!(!dir.path().join("finished").exists());
    }
}
