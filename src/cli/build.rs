//! `assetline build`: run the pipeline and copy its outputs into the site.
//!
//! Build phases:
//! - **Init** - Optional cache clear, converter registry
//! - **Pipeline** - Collect, convert, bundle, report, persist
//! - **Copy** - Registered static files → site destination

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;

use crate::{
    cache,
    cli::BuildArgs,
    config::SiteConfig,
    convert::ConverterRegistry,
    debug,
    freshness::is_newer_than,
    log,
    pipeline::{AssetPipeline, BuildReport},
    publish::StaticFile,
    utils::plural_count,
};

/// Build all assets of the site.
pub fn build_assets(config: &SiteConfig, args: &BuildArgs) -> Result<BuildReport> {
    if args.clean {
        let cache_root = config.layout()?.cache_root;
        cache::clear_cache_dir(&cache_root)
            .with_context(|| format!("failed to clear {}", cache_root.display()))?;
        debug!("build"; "cleared {}", cache_root.display());
    }

    let registry = ConverterRegistry::from_config(config)?;
    let mut files: Vec<StaticFile> = Vec::new();
    let report = AssetPipeline::new(config, &registry)
        .quiet(args.quiet)
        .run(&mut files)?;

    let copied = copy_static_files(&files)?;
    if !args.quiet {
        log!(
            "build";
            "{} published, {} copied to {}",
            plural_count(report.published, "file"),
            copied,
            config.site.destination.display()
        );
    }
    Ok(report)
}

/// Copy each file whose destination is missing or older than its source.
/// Returns the number of files copied.
pub fn copy_static_files(files: &[StaticFile]) -> Result<usize> {
    let copied = files
        .par_iter()
        .map(|file| -> Result<usize> {
            let source = file.source();
            let dest = &file.destination;
            if dest.exists() && !is_newer_than(&source, dest) {
                return Ok(0);
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::copy(&source, dest).with_context(|| {
                format!("failed to copy {} to {}", source.display(), dest.display())
            })?;
            Ok(1)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_site_config;
    use tempfile::TempDir;

    fn static_file(dir: &TempDir, name: &str) -> StaticFile {
        StaticFile {
            base: dir.path().join("cache"),
            dir: "css".into(),
            name: name.into(),
            destination: dir.path().join("_site/assets/css").join(name),
        }
    }

    #[test]
    fn test_copy_static_files() {
        let dir = TempDir::new().unwrap();
        let file = static_file(&dir, "site.css");
        fs::create_dir_all(file.source().parent().unwrap()).unwrap();
        fs::write(file.source(), "body{}").unwrap();

        assert_eq!(copy_static_files(std::slice::from_ref(&file)).unwrap(), 1);
        assert_eq!(fs::read_to_string(&file.destination).unwrap(), "body{}");

        // Destination is up to date now
        assert_eq!(copy_static_files(std::slice::from_ref(&file)).unwrap(), 0);
    }

    #[test]
    fn test_copy_missing_source() {
        let dir = TempDir::new().unwrap();
        let file = static_file(&dir, "missing.css");
        assert!(copy_static_files(&[file]).is_err());
    }

    #[test]
    fn test_build_assets_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = test_site_config(dir.path(), "");
        let root = config.get_root().to_path_buf();
        fs::create_dir_all(root.join("_assets/css")).unwrap();
        fs::write(root.join("_assets/css/site.css"), "body {\n  color: #ff0000;\n}\n").unwrap();
        fs::write(root.join("_assets/robots.txt"), "User-agent: *\n").unwrap();

        let args = BuildArgs {
            quiet: true,
            ..Default::default()
        };
        let report = build_assets(&config, &args).unwrap();
        assert_eq!(report.published, 2);
        assert_eq!(
            fs::read_to_string(root.join("_site/assets/css/site.css")).unwrap(),
            "body{color:red}"
        );
        assert!(root.join("_site/assets/robots.txt").exists());

        let clean = BuildArgs {
            clean: true,
            quiet: true,
            ..Default::default()
        };
        let report = build_assets(&config, &clean).unwrap();
        assert_eq!(report.cached, 0);
        assert_eq!(report.invocations, 1);
    }
}
