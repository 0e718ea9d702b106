//! assetline - incremental asset pipeline for static site builds.
//!
//! Discovers asset files, runs each through a chain of converters selected by
//! extension, caches converted output by content hash, bundles same-named
//! groups and reports per-file failures without aborting the build.
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── asset/       # Asset model + file collector
//! ├── convert/     # Converter trait, registry, chain, built-in converters
//! ├── cache/       # Persisted content cache map
//! ├── freshness/   # blake3 content hashes, mtime checks
//! ├── bundle       # Same-group concatenation
//! ├── report       # Error log artifact
//! ├── publish      # Static file registration for the host
//! ├── pipeline     # Orchestration
//! ├── config/      # TOML configuration
//! ├── cli/         # Reference host: `build` and `clean` commands
//! └── logger       # Colored logging + progress line
//! ```
//!
//! # Example
//!
//! ```ignore
//! let config = SiteConfig::load(Path::new("assetline.toml"))?;
//! let registry = ConverterRegistry::from_config(&config)?;
//! let mut files = Vec::new();
//! let report = AssetPipeline::new(&config, &registry).run(&mut files)?;
//! ```

pub mod asset;
pub mod bundle;
pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod freshness;
pub mod logger;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod state;
pub mod utils;

pub use asset::{Asset, CacheStatus, EntryFilter, SiteFilter};
pub use config::{ConfigError, SiteConfig};
pub use convert::{ConvertError, Converter, ConverterRegistry, Priority};
pub use pipeline::{AssetPipeline, BuildReport, PipelineError};
pub use publish::{StaticFile, StaticFileRegistry};
