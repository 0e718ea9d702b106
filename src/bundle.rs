//! Concatenation of same-prefix assets.
//!
//! Finalized assets are grouped by `(dir, prefix, ext)` where `prefix` is the
//! name before its first `.` and `ext` the last extension: `home.a.js` and
//! `home.b.js` become one `home.js`. Members are concatenated in original
//! name order.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::asset::{Asset, CacheStatus};
use crate::cache::{file_content_matches, write_output};
use crate::debug;
use crate::report::Failure;
use crate::utils::path::to_slash;

/// Stage name reported when a bundle cannot be written.
pub const BUNDLE_STAGE: &str = "bundle";

/// A synthetic output made of two or more assets.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub dir: PathBuf,
    pub name: String,
    /// Original paths of the members, in concatenation order.
    pub members: Vec<String>,
    pub content: Vec<u8>,
    /// Hit only if every member was a hit.
    pub cache: CacheStatus,
}

impl Bundle {
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn output_key(&self) -> String {
        to_slash(&self.output_path())
    }
}

/// Assets left untouched, bundles written, and bundles that failed.
#[derive(Debug, Default)]
pub struct BundleOutcome {
    pub assets: Vec<Asset>,
    pub bundles: Vec<Bundle>,
    pub failures: Vec<Failure>,
}

type GroupKey = (PathBuf, String, String);

fn group_key(asset: &Asset) -> Option<GroupKey> {
    if asset.ext().is_empty() {
        return None;
    }
    let prefix = asset.name().split('.').next().unwrap_or_default();
    Some((
        asset.dir().to_path_buf(),
        prefix.to_string(),
        asset.ext().to_string(),
    ))
}

/// Group `assets` and write every bundle under `bundle_root`.
///
/// A bundle file is rewritten unless it already holds exactly the
/// concatenated content. Member hits alone are not enough: a member that
/// failed or was deleted since the last run changes the group.
pub fn bundle_assets(assets: Vec<Asset>, bundle_root: &Path) -> BundleOutcome {
    let mut groups: FxHashMap<GroupKey, Vec<Asset>> = FxHashMap::default();
    let mut outcome = BundleOutcome::default();

    for asset in assets {
        match group_key(&asset) {
            Some(key) => groups.entry(key).or_default().push(asset),
            None => outcome.assets.push(asset),
        }
    }

    let mut groups: Vec<_> = groups.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    for ((dir, prefix, ext), mut members) in groups {
        if members.len() < 2 {
            outcome.assets.extend(members);
            continue;
        }
        members.sort_by(|a, b| a.original_name().cmp(b.original_name()));

        let bundle = concat(dir, format!("{prefix}.{ext}"), members);
        let key = bundle.output_key();
        let path = bundle_root.join(&key);

        if file_content_matches(&path, &bundle.content) {
            debug!("bundle"; "{} unchanged", key);
            outcome.bundles.push(bundle);
            continue;
        }
        match write_output(bundle_root, &key, &bundle.content) {
            Ok(_) => {
                debug!("bundle"; "{} <- [{}]", key, bundle.members.join(", "));
                outcome.bundles.push(bundle);
            }
            Err(err) => outcome.failures.push(Failure::new(
                BUNDLE_STAGE,
                key,
                format!("failed to write bundle: {err}"),
            )),
        }
    }

    outcome
        .assets
        .sort_by(|a, b| a.original_path().cmp(b.original_path()));
    outcome
}

fn concat(dir: PathBuf, name: String, members: Vec<Asset>) -> Bundle {
    let cache = if members.iter().all(Asset::is_hit) {
        CacheStatus::Hit
    } else {
        CacheStatus::Miss
    };
    let mut content = Vec::with_capacity(members.iter().map(|m| m.content.len()).sum());
    let mut keys = Vec::with_capacity(members.len());
    for member in members {
        content.extend_from_slice(&member.content);
        keys.push(member.key());
    }
    Bundle {
        dir,
        name,
        members: keys,
        content,
        cache,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn asset(path: &str, content: &str, cache: CacheStatus) -> Asset {
        let mut asset = Asset::new(path, content.as_bytes().to_vec());
        asset.cache = cache;
        asset
    }

    #[test]
    fn test_bundle_same_prefix() {
        let dir = TempDir::new().unwrap();
        let assets = vec![
            asset("js/home.b.js", "B;", CacheStatus::Miss),
            asset("js/home.a.js", "A;", CacheStatus::Miss),
            asset("js/about.js", "X;", CacheStatus::Miss),
        ];

        let outcome = bundle_assets(assets, dir.path());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.bundles.len(), 1);

        let bundle = &outcome.bundles[0];
        assert_eq!(bundle.output_key(), "js/home.js");
        assert_eq!(bundle.members, ["js/home.a.js", "js/home.b.js"]);
        assert_eq!(fs::read(dir.path().join("js/home.js")).unwrap(), b"A;B;");

        let left: Vec<_> = outcome.assets.iter().map(Asset::key).collect();
        assert_eq!(left, ["js/about.js"]);
    }

    #[test]
    fn test_bundle_groups_by_dir_and_ext() {
        let dir = TempDir::new().unwrap();
        let assets = vec![
            asset("a/site.css", "a", CacheStatus::Miss),
            asset("b/site.css", "b", CacheStatus::Miss),
            asset("a/site.js", "c", CacheStatus::Miss),
            asset("a/LICENSE", "d", CacheStatus::Miss),
            asset("a/LICENSE.txt", "e", CacheStatus::Miss),
        ];
        let outcome = bundle_assets(assets, dir.path());
        assert!(outcome.bundles.is_empty());
        assert_eq!(outcome.assets.len(), 5);
    }

    #[test]
    fn test_bundle_unchanged_kept() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/home.js"), "A;B;").unwrap();

        let assets = vec![
            asset("js/home.a.js", "A;", CacheStatus::Hit),
            asset("js/home.b.js", "B;", CacheStatus::Hit),
        ];
        let outcome = bundle_assets(assets, dir.path());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.bundles[0].cache, CacheStatus::Hit);
        assert_eq!(fs::read(dir.path().join("js/home.js")).unwrap(), b"A;B;");
    }

    #[test]
    fn test_bundle_all_hits_with_stale_file_rewritten() {
        // Last run's bundle still holds a member that is gone now
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/home.js"), "A;B;C;").unwrap();

        let assets = vec![
            asset("js/home.b.js", "B;", CacheStatus::Hit),
            asset("js/home.c.js", "C;", CacheStatus::Hit),
        ];
        let outcome = bundle_assets(assets, dir.path());
        assert_eq!(outcome.bundles[0].cache, CacheStatus::Hit);
        assert_eq!(fs::read(dir.path().join("js/home.js")).unwrap(), b"B;C;");
    }

    #[test]
    fn test_bundle_partial_hit_rewritten() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/home.js"), "previous").unwrap();

        let assets = vec![
            asset("js/home.a.js", "A;", CacheStatus::Hit),
            asset("js/home.b.js", "B2;", CacheStatus::Miss),
        ];
        let outcome = bundle_assets(assets, dir.path());
        assert_eq!(outcome.bundles[0].cache, CacheStatus::Miss);
        assert_eq!(fs::read(dir.path().join("js/home.js")).unwrap(), b"A;B2;");
    }

    #[test]
    fn test_bundle_write_failure() {
        let dir = TempDir::new().unwrap();
        // A file where the bundle directory should be
        fs::write(dir.path().join("js"), "blocker").unwrap();

        let assets = vec![
            asset("js/home.a.js", "A;", CacheStatus::Miss),
            asset("js/home.b.js", "B;", CacheStatus::Miss),
        ];
        let outcome = bundle_assets(assets, dir.path());
        assert!(outcome.bundles.is_empty());
        assert!(outcome.assets.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].converter, BUNDLE_STAGE);
        assert_eq!(outcome.failures[0].asset, "js/home.js");
    }
}
