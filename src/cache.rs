//! On-disk table cache: one JSON file per (scope, category), written as a
//! full snapshot of the records currently in a table. Reading an existing
//! cache lets a table show stale rows immediately while the first network
//! fetch is still in flight.

use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whether a cache file is tied to a repository or shared across the app
/// (repository list, notifications).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    Global,
    Repo(String),
}

impl CacheScope {
    pub fn repo(full_name: impl Into<String>) -> Self {
        Self::Repo(full_name.into())
    }
}

#[derive(Debug, Clone)]
pub struct TableCache {
    root: PathBuf,
}

impl TableCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, scope: &CacheScope, category: &str) -> PathBuf {
        match scope {
            CacheScope::Global => self.root.join(format!("{category}.json")),
            CacheScope::Repo(full_name) => {
                self.root.join(format!("{}_{category}.json", full_name.replace('/', "_")))
            },
        }
    }

    /// Loads the cached records for (scope, category). A missing or
    /// unreadable file is a cache miss, never an error; there is no schema
    /// version in the file, so a shape change between runs also degrades to
    /// an empty result.
    pub fn load<T: DeserializeOwned>(&self, scope: &CacheScope, category: &str) -> Vec<T> {
        let path = self.path(scope, category);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!("Ignoring unreadable cache file {}: {err}", path.display());
                Vec::new()
            },
        }
    }

    /// Overwrites the cache file for (scope, category) with the full record
    /// snapshot. Callers must pass the complete current set.
    pub fn save<T: Serialize>(&self, scope: &CacheScope, category: &str, records: &[T]) -> Result<(), CacheError> {
        let path = self.path(scope, category);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(records)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        number: u64,
        title: String,
    }

    fn records() -> Vec<Record> {
        vec![Record { number: 1, title: "first".into() }, Record { number: 2, title: "second".into() }]
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        let scope = CacheScope::repo("octo/repo");
        cache.save(&scope, "issues", &records()).unwrap();
        let loaded: Vec<Record> = cache.load(&scope, "issues");
        assert_eq!(loaded, records());
    }

    #[test]
    fn test_missing_file_is_a_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        let loaded: Vec<Record> = cache.load(&CacheScope::repo("octo/repo"), "issues");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_a_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        std::fs::write(dir.path().join("octo_repo_issues.json"), "{not json").unwrap();
        let loaded: Vec<Record> = cache.load(&CacheScope::repo("octo/repo"), "issues");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_scoped_path_replaces_slashes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        cache.save(&CacheScope::repo("octo/repo"), "issues", &records()).unwrap();
        assert!(dir.path().join("octo_repo_issues.json").is_file());
    }

    #[test]
    fn test_global_path_has_no_scope_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        cache.save(&CacheScope::Global, "notifications", &records()).unwrap();
        assert!(dir.path().join("notifications.json").is_file());
    }

    #[test]
    fn test_save_is_a_full_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path());
        let scope = CacheScope::Global;
        cache.save(&scope, "repos", &records()).unwrap();
        cache.save(&scope, "repos", &records()[..1]).unwrap();
        let loaded: Vec<Record> = cache.load(&scope, "repos");
        assert_eq!(loaded.len(), 1);
    }
}
