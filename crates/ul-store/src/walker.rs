//! Lexicographic enumeration of the keys held in a sharded store.
//!
//! Walks are bounded by a starting top-level shard and a maximum key count,
//! so very large stores can be scanned incrementally.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use ul_types::{HashKind, HexKey};
use walkdir::{DirEntry, WalkDir};

use crate::error::{StoreError, StoreResult};
use crate::is_shard_name;

/// Walks `{root}/xx/yy/<key>` in sorted order. Names compare ignoring hex
/// case, so `AB` sorts after `a0`.
#[derive(Debug, Clone)]
pub struct ShardWalker {
    root: PathBuf,
    kind: HashKind,
    start_at: String,
    limit: Option<usize>,
}

impl ShardWalker {
    pub fn new(root: impl AsRef<Path>, kind: HashKind) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            kind,
            start_at: "00".into(),
            limit: None,
        }
    }

    /// Skip top-level shards that sort before `prefix` (two hex digits).
    pub fn start_at(mut self, prefix: &str) -> StoreResult<Self> {
        if !is_shard_name(prefix) {
            return Err(StoreError::InvalidShardPrefix(prefix.to_string()));
        }
        self.start_at = prefix.to_ascii_lowercase();
        Ok(self)
    }

    /// Stop after `limit` keys. Zero means no limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect the keys in range.
    pub fn walk(&self) -> StoreResult<Vec<HexKey>> {
        if !self.root.is_dir() {
            return Err(StoreError::RootNotFound(self.root.clone()));
        }

        let mut keys = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(3)
            .max_depth(3)
            .sort_by(|a, b| {
                a.file_name()
                    .to_ascii_lowercase()
                    .cmp(&b.file_name().to_ascii_lowercase())
            })
            .into_iter()
            .filter_entry(|e| self.in_range(e));

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            match HexKey::parse(&name, self.kind) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "not a content file; skipping");
                    continue;
                }
            }
            if self.limit.is_some_and(|limit| keys.len() >= limit) {
                break;
            }
        }

        debug!(
            root = %self.root.display(),
            start_at = %self.start_at,
            count = keys.len(),
            "shard walk complete"
        );
        Ok(keys)
    }

    /// Prune directories that are not shards or that sort before `start_at`.
    fn in_range(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        match entry.depth() {
            1 => {
                entry.file_type().is_dir()
                    && is_shard_name(&name)
                    && name.to_ascii_lowercase() >= self.start_at
            }
            2 => entry.file_type().is_dir() && is_shard_name(&name),
            _ => true,
        }
    }
}
