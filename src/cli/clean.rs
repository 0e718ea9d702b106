//! `assetline clean`: drop the asset cache.

use anyhow::{Context, Result};

use crate::{cache, config::SiteConfig, log};

/// Remove the whole cache directory.
pub fn clean_cache(config: &SiteConfig) -> Result<()> {
    let layout = config.layout()?;
    cache::clear_cache_dir(&layout.cache_root)
        .with_context(|| format!("failed to remove {}", layout.cache_root.display()))?;
    log!("cache"; "removed {}", layout.cache_root.display());
    Ok(())
}
