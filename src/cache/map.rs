//! The persisted asset map.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::debug;
use crate::freshness::ContentHash;

use super::MAP_FILE;

/// Map format version. A different version on disk is an empty cache.
pub const MAP_VERSION: u32 = 1;

/// Prior output of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Tagged content digest of the source, `blake3:<hex>`.
    pub hash: String,
    /// Output path relative to the `files/` output root, `/`-separated.
    pub out: String,
}

impl CacheEntry {
    pub fn new(hash: ContentHash, out: impl Into<String>) -> Self {
        Self {
            hash: hash.to_tagged(),
            out: out.into(),
        }
    }
}

/// Original path (`/`-separated) → [`CacheEntry`].
///
/// Keys are kept sorted so the persisted file is byte-stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMap {
    version: u32,
    entries: BTreeMap<String, CacheEntry>,
}

impl Default for CacheMap {
    fn default() -> Self {
        Self {
            version: MAP_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl CacheMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the map from `cache_root`. An absent, unreadable, malformed or
    /// outdated map is an empty cache.
    pub fn load(cache_root: &Path) -> Self {
        let path = cache_root.join(MAP_FILE);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("cache"; "no asset map at {}, starting empty", path.display());
                return Self::new();
            }
            Err(err) => {
                debug!("cache"; "unreadable asset map {}: {}", path.display(), err);
                return Self::new();
            }
        };

        match serde_json::from_str::<Self>(&json) {
            Ok(map) if map.version == MAP_VERSION => {
                debug!("cache"; "loaded {} entries", map.len());
                map
            }
            Ok(map) => {
                debug!("cache"; "asset map version {} != {}, starting empty", map.version, MAP_VERSION);
                Self::new()
            }
            Err(err) => {
                debug!("cache"; "malformed asset map {}: {}", path.display(), err);
                Self::new()
            }
        }
    }

    /// Entry for `key` if it is still valid: same content hash and the
    /// output file still exists under `output_root`.
    pub fn lookup(&self, key: &str, hash: ContentHash, output_root: &Path) -> Option<&CacheEntry> {
        let entry = self.entries.get(key)?;
        if ContentHash::from_tagged(&entry.hash) != Some(hash) {
            return None;
        }
        if !output_root.join(&entry.out).is_file() {
            return None;
        }
        Some(entry)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the map as pretty JSON to `cache_root/asset_map.json`.
    ///
    /// Written to a temp file in the same directory, then renamed over the
    /// old map, so readers never see a partial file.
    pub fn persist(&self, cache_root: &Path) -> io::Result<()> {
        fs::create_dir_all(cache_root)?;
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let mut tmp = NamedTempFile::new_in(cache_root)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(cache_root.join(MAP_FILE))
            .map_err(|err| err.error)?;

        debug!("cache"; "saved {} entries", self.len());
        Ok(())
    }
}
