//! Per-asset conversion chain.
//!
//! Each chain owns a private candidate list copied from the registry. The
//! highest-priority candidate matching the current extension runs and is
//! removed, until none matches. A converter therefore runs at most once per
//! asset and a chain takes at most `registry.len()` steps.

use std::sync::Arc;
use std::time::Duration;

use crate::asset::Asset;

use super::{ConvertError, Converter, ConverterRegistry, invoke};

/// Options shared by every chain of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainOptions {
    /// Per-invocation limit; `None` runs converters inline.
    pub timeout: Option<Duration>,
}

/// Outcome of a completed chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainSummary {
    /// Converters actually invoked (zero on a cache hit).
    pub invoked: usize,
    /// Names of the converters selected, in order.
    pub applied: Vec<String>,
}

/// The converter that failed and why. The asset is dead for this run.
#[derive(Debug)]
pub struct ChainFailure {
    pub converter: String,
    pub error: ConvertError,
}

/// Run the chain on `asset`.
///
/// On a cache hit converters are selected and the name advanced exactly as
/// on a miss, but `convert` is never called.
pub fn run_chain(
    asset: &mut Asset,
    registry: &ConverterRegistry,
    options: &ChainOptions,
) -> Result<ChainSummary, ChainFailure> {
    let mut candidates: Vec<&Arc<dyn Converter>> = registry.iter().collect();
    let mut summary = ChainSummary::default();

    while let Some(idx) = select(&candidates, asset.ext()) {
        let converter = candidates.remove(idx);
        let output_ext = converter.output_ext(asset.ext());

        if !asset.is_hit() {
            summary.invoked += 1;
            asset.content = invoke(converter, &asset.content, options.timeout).map_err(|error| {
                ChainFailure {
                    converter: converter.name().to_string(),
                    error,
                }
            })?;
        }

        asset.advance_ext(&output_ext);
        summary.applied.push(converter.name().to_string());
    }

    Ok(summary)
}

/// Index of the highest-priority candidate matching `ext`; the earliest
/// declared wins ties.
fn select(candidates: &[&Arc<dyn Converter>], ext: &str) -> Option<usize> {
    let mut best: Option<(usize, super::Priority)> = None;
    for (idx, converter) in candidates.iter().enumerate() {
        if !converter.matches(ext) {
            continue;
        }
        let priority = converter.priority();
        if best.is_none_or(|(_, p)| priority > p) {
            best = Some((idx, priority));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::CacheStatus;
    use crate::convert::Priority;
    use crate::convert::testing::{Breaker, Tagger};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_chain_scss_then_minify() {
        let sass = Tagger::new("sass", "scss", "css");
        let min = Tagger::new("min", "css", "css").with_priority(Priority::Low);
        let registry = ConverterRegistry::new().with(min).with(sass);

        let mut asset = Asset::new("css/site.scss", b"x".to_vec());
        let summary = run_chain(&mut asset, &registry, &ChainOptions::default()).unwrap();

        assert_eq!(summary.invoked, 2);
        assert_eq!(summary.applied, ["sass", "min"]);
        assert_eq!(asset.name(), "site.css");
        assert_eq!(asset.content, b"min:sass:x");
    }

    #[test]
    fn test_chain_priority_and_ties() {
        let low = Tagger::new("low", "js", "js").with_priority(Priority::Low);
        let first = Tagger::new("first", "js", "js").with_priority(Priority::High);
        let second = Tagger::new("second", "js", "js").with_priority(Priority::High);
        let registry = ConverterRegistry::new().with(low).with(first).with(second);

        let mut asset = Asset::new("app.js", b"".to_vec());
        let summary = run_chain(&mut asset, &registry, &ChainOptions::default()).unwrap();
        assert_eq!(summary.applied, ["first", "second", "low"]);
    }

    #[test]
    fn test_chain_each_converter_once() {
        // Converters feeding each other in a cycle must still terminate.
        let a = Tagger::new("a", "x", "y");
        let b = Tagger::new("b", "y", "x");
        let (ca, cb) = (a.counter(), b.counter());
        let registry = ConverterRegistry::new().with(a).with(b);

        let mut asset = Asset::new("file.x", Vec::new());
        let summary = run_chain(&mut asset, &registry, &ChainOptions::default()).unwrap();
        assert_eq!(summary.invoked, 2);
        assert!(summary.invoked <= registry.len());
        assert_eq!(ca.load(Ordering::SeqCst), 1);
        assert_eq!(cb.load(Ordering::SeqCst), 1);
        assert_eq!(asset.name(), "file.x");
    }

    #[test]
    fn test_chain_no_match() {
        let registry = ConverterRegistry::new().with(Tagger::new("sass", "scss", "css"));
        let mut asset = Asset::new("robots.txt", b"r".to_vec());
        let summary = run_chain(&mut asset, &registry, &ChainOptions::default()).unwrap();
        assert_eq!(summary, ChainSummary::default());
        assert_eq!(asset.name(), "robots.txt");
        assert_eq!(asset.content, b"r");
    }

    #[test]
    fn test_chain_hit_skips_convert() {
        let sass = Tagger::new("sass", "scss", "css");
        let calls = sass.counter();
        let registry = ConverterRegistry::new().with(sass);

        let mut asset = Asset::new("site.scss", b"x".to_vec());
        asset.cache = CacheStatus::Hit;
        let summary = run_chain(&mut asset, &registry, &ChainOptions::default()).unwrap();

        assert_eq!(summary.invoked, 0);
        assert_eq!(summary.applied, ["sass"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(asset.name(), "site.css");
        assert_eq!(asset.content, b"x");
    }

    #[test]
    fn test_chain_failure_stops() {
        let breaker = Breaker {
            name: "lint",
            ext: "js",
            needle: "eval",
        };
        let after = Tagger::new("after", "js", "js").with_priority(Priority::Low);
        let calls = after.counter();
        let registry = ConverterRegistry::new().with(breaker).with(after);

        let mut asset = Asset::new("bad.js", b"eval(x)".to_vec());
        let failure = run_chain(&mut asset, &registry, &ChainOptions::default()).unwrap_err();
        assert_eq!(failure.converter, "lint");
        assert!(failure.error.to_string().contains("eval"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
