//! Host inclusion/exclusion policy applied at every directory level.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::utils::path::to_slash;

/// Decides which entries of a directory the collector visits.
///
/// `entries` are the names inside `dir`, sorted; the returned list keeps
/// their order.
pub trait EntryFilter: Sync {
    fn filter_entries(&self, dir: &Path, entries: Vec<OsString>) -> Vec<OsString>;
}

impl<F> EntryFilter for F
where
    F: Fn(&Path, Vec<OsString>) -> Vec<OsString> + Sync,
{
    fn filter_entries(&self, dir: &Path, entries: Vec<OsString>) -> Vec<OsString> {
        self(dir, entries)
    }
}

/// Default policy: hidden (`.`), private (`_`), `#` and `~`-suffixed entries
/// are dropped unless listed in `site.include`; `site.exclude` always wins.
#[derive(Debug, Clone, Default)]
pub struct SiteFilter {
    site_source: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl SiteFilter {
    pub fn new(site_source: impl Into<PathBuf>, include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            site_source: site_source.into(),
            include,
            exclude: exclude
                .into_iter()
                .map(|e| e.trim_matches('/').to_string())
                .collect(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(
            &config.site.source,
            config.site.include.clone(),
            config.site.exclude.clone(),
        )
    }

    fn is_special(name: &str) -> bool {
        name.starts_with(['.', '_', '#']) || name.ends_with('~')
    }

    fn is_excluded(&self, dir: &Path, name: &str) -> bool {
        if self.exclude.iter().any(|e| e == name) {
            return true;
        }
        let Ok(rel) = dir.join(name).strip_prefix(&self.site_source).map(to_slash) else {
            return false;
        };
        self.exclude.iter().any(|e| *e == rel)
    }

    fn keep(&self, dir: &Path, name: &str) -> bool {
        if self.is_excluded(dir, name) {
            return false;
        }
        !Self::is_special(name) || self.include.iter().any(|i| i == name)
    }
}

impl EntryFilter for SiteFilter {
    fn filter_entries(&self, dir: &Path, entries: Vec<OsString>) -> Vec<OsString> {
        entries
            .into_iter()
            .filter(|entry| self.keep(dir, &entry.to_string_lossy()))
            .collect()
    }
}
