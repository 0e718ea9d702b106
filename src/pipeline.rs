//! Pipeline orchestration.
//!
//! Run phases:
//! - **Collect** - Walk the asset source through the entry filter
//! - **Convert** - Per-asset cache lookup, conversion chain, write-back (parallel)
//! - **Bundle** - Concatenate same-prefix groups
//! - **Report** - Write the error log artifact
//! - **Persist** - Save the next-run cache map
//! - **Publish** - Register outputs with the host

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;
use thiserror::Error;

use crate::asset::{Asset, CacheStatus, EntryFilter, SiteFilter, collect_assets};
use crate::bundle::bundle_assets;
use crate::cache::{CacheEntry, CacheMap, bundle_root, output_root, write_output};
use crate::config::{ConfigError, PipelineLayout, SiteConfig};
use crate::convert::{ChainOptions, ConverterRegistry, run_chain};
use crate::logger::ProgressLine;
use crate::publish::{StaticFile, StaticFileRegistry};
use crate::report::{ErrorReport, Failure, WriteStatus, install_fragment};
use crate::state::is_shutdown;
use crate::utils::plural_count;
use crate::{debug, log};

/// Stage name reported when a converted output cannot be written.
pub const CACHE_STAGE: &str = "cache";

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// First failure of a strict-mode run.
    #[error("{converter} failed on file '{asset}': {message}")]
    Conversion {
        converter: String,
        asset: String,
        message: String,
    },

    #[error("build interrupted")]
    Interrupted,
}

impl From<Failure> for PipelineError {
    fn from(failure: Failure) -> Self {
        Self::Conversion {
            converter: failure.converter,
            asset: failure.asset,
            message: failure.message,
        }
    }
}

/// Counters of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Assets discovered.
    pub assets: usize,
    /// Live assets converted this run.
    pub converted: usize,
    /// Live assets served from the cache.
    pub cached: usize,
    /// Failures reported (converters, cache and bundle writes).
    pub failed: usize,
    pub bundles: usize,
    /// Static files registered with the host.
    pub published: usize,
    /// Total converter invocations.
    pub invocations: usize,
    /// Outcome of writing the error artifact, `None` if writing failed.
    pub error_log: Option<WriteStatus>,
}

/// One incremental asset build over a site.
pub struct AssetPipeline<'a> {
    config: &'a SiteConfig,
    registry: &'a ConverterRegistry,
    filter: Option<&'a dyn EntryFilter>,
    quiet: bool,
}

/// Shared state of the parallel convert phase.
struct RunContext<'a> {
    layout: &'a PipelineLayout,
    registry: &'a ConverterRegistry,
    options: ChainOptions,
    previous: CacheMap,
    next: Mutex<CacheMap>,
    errors: Mutex<ErrorReport>,
    invocations: AtomicUsize,
}

impl<'a> AssetPipeline<'a> {
    pub fn new(config: &'a SiteConfig, registry: &'a ConverterRegistry) -> Self {
        Self {
            config,
            registry,
            filter: None,
            quiet: false,
        }
    }

    /// Replace the default [`SiteFilter`].
    pub fn with_filter(mut self, filter: &'a dyn EntryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Suppress the progress line and summary.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run the pipeline, registering every finished output with `files`.
    ///
    /// Conversion failures are reported and skipped; only configuration
    /// errors, strict mode and interruption abort the run.
    pub fn run(&self, files: &mut dyn StaticFileRegistry) -> Result<BuildReport, PipelineError> {
        let settings = &self.config.asset_pipeline;
        let layout = self.config.layout()?;

        // Collect
        let site_filter = SiteFilter::from_config(self.config);
        let filter: &dyn EntryFilter = match self.filter {
            Some(filter) => filter,
            None => &site_filter,
        };
        let assets = collect_assets(&layout, filter)?;

        let ctx = RunContext {
            layout: &layout,
            registry: self.registry,
            options: ChainOptions {
                timeout: settings.timeout(),
            },
            previous: CacheMap::load(&layout.cache_root),
            next: Mutex::new(CacheMap::new()),
            errors: Mutex::new(ErrorReport::new()),
            invocations: AtomicUsize::new(0),
        };
        let mut report = BuildReport {
            assets: assets.len(),
            ..Default::default()
        };

        // Convert
        let live = self.convert_all(assets, &ctx)?;
        if is_shutdown() {
            return Err(PipelineError::Interrupted);
        }
        report.invocations = ctx.invocations.load(Ordering::Relaxed);
        report.cached = live.iter().filter(|a| a.is_hit()).count();
        report.converted = live.len() - report.cached;

        let RunContext { next, errors, .. } = ctx;
        let next = next.into_inner();
        let mut errors = errors.into_inner();

        // Bundle
        let (assets, bundles) = if settings.bundle {
            let outcome = bundle_assets(live, &bundle_root(&layout.cache_root));
            errors.extend(outcome.failures);
            (outcome.assets, outcome.bundles)
        } else {
            (live, Vec::new())
        };
        report.bundles = bundles.len();

        // Report
        errors.sort();
        report.failed = errors.len();
        report.error_log = self.write_error_log(&errors, &layout);

        // Persist
        if let Err(e) = next.persist(&layout.cache_root) {
            log!("cache"; "failed to save asset map: {}", e);
        }

        if settings.fail_on_error
            && let Some(first) = errors.failures().first()
        {
            return Err(first.clone().into());
        }

        // Publish
        for asset in &assets {
            files.register(StaticFile::for_asset(asset, &layout));
        }
        for bundle in &bundles {
            files.register(StaticFile::for_bundle(bundle, &layout));
        }
        report.published = assets.len() + bundles.len();

        if !self.quiet {
            log!(
                "assets";
                "{} converted, {} cached, {}, {}",
                report.converted,
                report.cached,
                plural_count(report.bundles, "bundle"),
                plural_count(report.failed, "failure")
            );
        }
        Ok(report)
    }

    /// Run every chain on a rayon pool sized by `asset_pipeline.jobs`.
    fn convert_all(&self, assets: Vec<Asset>, ctx: &RunContext) -> Result<Vec<Asset>, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.asset_pipeline.jobs.unwrap_or(0))
            .build()
            .map_err(|e| ConfigError::Validation(format!("failed to create thread pool: {e}")))?;

        let progress = (!self.quiet && !assets.is_empty())
            .then(|| ProgressLine::new(&[("assets", assets.len())]));

        let live = pool.install(|| {
            assets
                .into_par_iter()
                .filter_map(|asset| {
                    if is_shutdown() {
                        return None;
                    }
                    let result = process_asset(asset, ctx);
                    if let Some(p) = &progress {
                        p.inc("assets");
                    }
                    result
                })
                .collect()
        });

        if let Some(p) = progress {
            p.finish();
        }
        Ok(live)
    }

    fn write_error_log(&self, errors: &ErrorReport, layout: &PipelineLayout) -> Option<WriteStatus> {
        let settings = &self.config.asset_pipeline.error_log;
        if settings.fragment
            && let Some(includes) = &layout.includes
            && let Err(e) = install_fragment(includes)
        {
            log!("error"; "failed to install error fragment: {}", e);
        }

        match errors.write(layout.includes.as_deref()) {
            Ok(status) => Some(status),
            Err(e) => {
                log!("error"; "failed to write error log: {}", e);
                None
            }
        }
    }
}

/// Lookup → chain → write-back for one asset. `None` when the asset died.
fn process_asset(mut asset: Asset, ctx: &RunContext) -> Option<Asset> {
    let key = asset.key();
    let outputs = output_root(&ctx.layout.cache_root);

    if let Some(entry) = ctx.previous.lookup(&key, asset.hash(), &outputs).cloned() {
        asset.cache = CacheStatus::Hit;
        chain(&mut asset, ctx)?;

        match restore(&asset, &entry, &outputs) {
            Some(content) => {
                asset.content = content;
                ctx.next.lock().insert(key, entry);
                return Some(asset);
            }
            None => {
                asset.cache = CacheStatus::Miss;
                asset.reset_name();
            }
        }
    }

    chain(&mut asset, ctx)?;

    let out = asset.output_key();
    if let Err(e) = write_output(&outputs, &out, &asset.content) {
        record(
            ctx,
            Failure::new(CACHE_STAGE, key, format!("failed to write output: {e}")),
        );
        return None;
    }
    ctx.next.lock().insert(key, CacheEntry::new(asset.hash(), out));
    Some(asset)
}

/// Run the chain, recording a failure. `None` when the asset died.
fn chain(asset: &mut Asset, ctx: &RunContext) -> Option<()> {
    match run_chain(asset, ctx.registry, &ctx.options) {
        Ok(summary) => {
            ctx.invocations.fetch_add(summary.invoked, Ordering::Relaxed);
            Some(())
        }
        Err(failure) => {
            record(
                ctx,
                Failure::new(failure.converter, asset.key(), failure.error.to_string()),
            );
            None
        }
    }
}

/// Cached output of a hit, if the derived output path still matches the
/// entry and the file can be read. Otherwise the asset is rebuilt.
fn restore(asset: &Asset, entry: &CacheEntry, outputs: &Path) -> Option<Vec<u8>> {
    let out = asset.output_key();
    if out != entry.out {
        debug!("cache"; "{}: output changed ({} -> {}), rebuilding", asset.key(), entry.out, out);
        return None;
    }
    match std::fs::read(outputs.join(&entry.out)) {
        Ok(content) => Some(content),
        Err(e) => {
            debug!("cache"; "{}: unreadable cached output: {}, rebuilding", asset.key(), e);
            None
        }
    }
}

fn record(ctx: &RunContext, failure: Failure) {
    log!("error"; "{}", failure);
    ctx.errors.lock().push(failure);
}
