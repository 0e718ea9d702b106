//! Converter capabilities and the ordered registry the chain draws from.
//!
//! # Module Structure
//!
//! | Module    | Purpose                                             |
//! |-----------|-----------------------------------------------------|
//! | `chain`   | Per-asset conversion chain                          |
//! | `command` | External-process converter (`sass --stdin`, ...)    |
//! | `minify`  | Built-in JS (oxc) and CSS (lightningcss) minifiers  |

mod chain;
mod command;
mod minify;

pub use chain::{ChainFailure, ChainOptions, ChainSummary, run_chain};
pub use command::CommandConverter;
pub use minify::{CssMinifier, JsMinifier};

use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;

use crate::config::{ConfigError, SiteConfig};

// ============================================================================
// Converter
// ============================================================================

/// Selection priority. Higher runs first when several converters match.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// A content transformation selected by file extension.
///
/// Extensions are passed without the leading dot; an extensionless file
/// has the empty extension. Implementations must not depend on pipeline
/// state: the same converter is shared by every chain of a run.
pub trait Converter: Send + Sync {
    /// Identity used in error reports.
    fn name(&self) -> &str;

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn matches(&self, ext: &str) -> bool;

    /// Extension of the converted output for an input with `ext`.
    fn output_ext(&self, ext: &str) -> String;

    fn convert(&self, content: &[u8]) -> Result<Vec<u8>, ConvertError>;
}

/// Conversion errors, isolated to the asset being converted.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{0}")]
    Failed(String),

    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("converter panicked: {0}")]
    Panicked(String),
}

impl ConvertError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered converter collection. Declaration order breaks priority ties.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, converter: impl Converter + 'static) -> Self {
        self.register(Arc::new(converter));
        self
    }

    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Converter>> {
        self.converters.iter()
    }

    /// Build the registry described by `[asset_pipeline]`: command converters
    /// in declaration order, then the enabled built-in minifiers.
    ///
    /// Fails when a converter's program cannot be found.
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let pipeline = &config.asset_pipeline;
        let mut registry = Self::new();

        for entry in &pipeline.converters {
            let converter = CommandConverter::from_entry(entry, &config.site.source)?
                .with_timeout(pipeline.timeout());
            registry.register(Arc::new(converter));
        }
        if pipeline.minify.js {
            registry.register(Arc::new(JsMinifier));
        }
        if pipeline.minify.css {
            registry.register(Arc::new(CssMinifier));
        }

        crate::debug!(
            "assets";
            "converters: [{}]",
            registry.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(registry)
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.converters.iter().map(|c| (c.name(), c.priority())))
            .finish()
    }
}

// ============================================================================
// Guarded invocation
// ============================================================================

/// Run `convert`, turning panics into errors. With a limit the call runs on a
/// helper thread that is abandoned once the limit passes. Command converters
/// carry the same limit and kill their process themselves.
fn invoke(
    converter: &Arc<dyn Converter>,
    content: &[u8],
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ConvertError> {
    let Some(limit) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(|| converter.convert(content)))
            .unwrap_or_else(|payload| Err(ConvertError::Panicked(panic_message(&*payload))));
    };

    let (tx, rx) = crossbeam::channel::bounded(1);
    let worker = Arc::clone(converter);
    let input = content.to_vec();
    std::thread::Builder::new()
        .name(format!("convert-{}", converter.name()))
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| worker.convert(&input)))
                .unwrap_or_else(|payload| Err(ConvertError::Panicked(panic_message(&*payload))));
            // Receiver is gone after a timeout
            let _ = tx.send(result);
        })
        .map_err(|e| ConvertError::failed(format!("failed to spawn converter thread: {e}")))?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(crossbeam::channel::RecvTimeoutError::Timeout) => Err(ConvertError::Timeout(limit)),
        Err(crossbeam::channel::RecvTimeoutError::Disconnected) => Err(ConvertError::Panicked(
            "converter thread exited without a result".into(),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Test converters (available to all modules via `crate::convert::testing`)
// ============================================================================
