//! Persisted metadata cache.
//!
//! Probing media is slow, so serialized records are kept between runs in one
//! JSON document, partitioned by the absolute base directory they were
//! scanned from and keyed by path relative to that base:
//!
//! ```json
//! { "version": 1, "partitions": { "/media/inbox": { "clip.mp4": { ... } } } }
//! ```
//!
//! Saving merges a partition's new entries over the stored ones. Entries whose
//! value changed are reported as conflicts; the new value always wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CACHE_VERSION: u32 = 1;

/// Errors raised while reading or writing the cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to read cache {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write cache {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Cache {} is not valid JSON: {source}", .path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Entries of one base directory, key → serialized record.
pub type Partition = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    partitions: BTreeMap<String, Partition>,
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            partitions: BTreeMap::new(),
        }
    }
}

/// One field whose cached value differs from the new one.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiff {
    /// Dotted path inside the record, e.g. `media.Video.duration`.
    pub field: String,
    pub cached: Value,
    pub fresh: Value,
}

/// A cache key whose stored record was replaced by a different one.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConflict {
    pub key: String,
    pub diffs: Vec<FieldDiff>,
}

/// The cache document plus where it lives.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    data: CacheFile,
}

impl CacheStore {
    /// The per-user cache location, e.g. `~/.cache/mediatidy/cache.json` on
    /// Linux.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("mediatidy")
            .join("cache.json")
    }

    /// An empty store that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: CacheFile::default(),
        }
    }

    /// Reads the cache file. A missing file gives an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache file yet");
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(CacheError::Read { path, source: e }),
        };

        match serde_json::from_str::<CacheFile>(&content) {
            Ok(data) => Ok(Self { path, data }),
            Err(e) => Err(CacheError::Format { path, source: e }),
        }
    }

    /// Like [`CacheStore::load`], but an unreadable or corrupt file is
    /// logged and replaced by an empty store.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::load(path.clone()).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring cache");
            Self::empty(path)
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn base_key(base: &Path) -> String {
        base.to_string_lossy().to_string()
    }

    pub fn partition(&self, base: &Path) -> Option<&Partition> {
        self.data.partitions.get(&Self::base_key(base))
    }

    pub fn get(&self, base: &Path, key: &str) -> Option<&Value> {
        self.partition(base).and_then(|p| p.get(key))
    }

    /// Number of entries across all partitions.
    pub fn len(&self) -> usize {
        self.data.partitions.values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merges `entries` into the partition of `base` and rewrites the file.
    ///
    /// Keys present on both sides with different values are returned as
    /// conflicts. Stored keys absent from `entries` are kept.
    pub fn merge_and_save(
        &mut self,
        base: &Path,
        entries: Partition,
    ) -> Result<Vec<CacheConflict>, CacheError> {
        let partition = self.data.partitions.entry(Self::base_key(base)).or_default();

        let mut conflicts = Vec::new();
        for (key, fresh) in entries {
            if let Some(cached) = partition.get(&key)
                && *cached != fresh
            {
                let mut diffs = Vec::new();
                diff_values("", cached, &fresh, &mut diffs);
                warn!(key = %key, fields = diffs.len(), "cache entry changed");
                conflicts.push(CacheConflict { key: key.clone(), diffs });
            }
            partition.insert(key, fresh);
        }

        self.save()?;
        Ok(conflicts)
    }

    /// Writes the whole document, through a temporary file.
    pub fn save(&self) -> Result<(), CacheError> {
        let write_err = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string(&self.data)
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!(path = %self.path.display(), entries = self.len(), "cache saved");
        Ok(())
    }
}

/// Collects leaf-level differences between two JSON values.
fn diff_values(prefix: &str, cached: &Value, fresh: &Value, out: &mut Vec<FieldDiff>) {
    match (cached, fresh) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let field = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                diff_values(
                    &field,
                    a.get(key).unwrap_or(&Value::Null),
                    b.get(key).unwrap_or(&Value::Null),
                    out,
                );
            }
        }
        (a, b) if a != b => out.push(FieldDiff {
            field: prefix.to_string(),
            cached: a.clone(),
            fresh: b.clone(),
        }),
        _ => {}
    }
}
