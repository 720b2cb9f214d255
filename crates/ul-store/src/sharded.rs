use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use ul_types::{HashKind, HexKey};

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;
use crate::walker::ShardWalker;

/// Filesystem store using 256x256 hex sharding.
#[derive(Debug, Clone)]
pub struct ShardedStore {
    root: PathBuf,
    kind: HashKind,
}

impl ShardedStore {
    /// Scratch directory used to stage puts before they are renamed into place.
    pub const TMP_DIR: &'static str = "tmp";

    /// Open an existing store root.
    pub fn open(root: impl Into<PathBuf>, kind: HashKind) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::RootNotFound(root));
        }
        Ok(Self { root, kind })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an object with this key lives, whether or not it exists.
    pub fn object_path(&self, key: &HexKey) -> PathBuf {
        let (top, mid) = key.shard();
        self.root.join(top).join(mid).join(key.as_str())
    }

    /// A walker over this store's shards, starting at `00` with no limit.
    pub fn walker(&self) -> ShardWalker {
        ShardWalker::new(&self.root, self.kind)
    }

    fn check_key(&self, key: &HexKey) -> StoreResult<()> {
        if key.fits(self.kind) {
            Ok(())
        } else {
            Err(StoreError::InvalidKey {
                key: key.to_string(),
                expected: self.kind.hex_len(),
            })
        }
    }

    /// Stage into `tmp/`, then rename into the shard directory.
    fn install<F>(&self, key: &HexKey, fill: F) -> StoreResult<u64>
    where
        F: FnOnce(&mut File) -> io::Result<u64>,
    {
        self.check_key(key)?;
        let dest = self.object_path(key);
        if dest.exists() {
            return Ok(0);
        }

        let tmp_dir = self.root.join(Self::TMP_DIR);
        fs::create_dir_all(&tmp_dir)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut staged = NamedTempFile::new_in(&tmp_dir)?;
        let len = fill(staged.as_file_mut())?;
        staged.as_file_mut().flush()?;
        staged.as_file().sync_all()?;
        staged.persist(&dest).map_err(|e| e.error)?;

        debug!(key = %key.short_hex(), len, "stored object");
        Ok(len)
    }
}

impl ContentStore for ShardedStore {
    fn hash_kind(&self) -> HashKind {
        self.kind
    }

    fn exists(&self, key: &HexKey) -> StoreResult<bool> {
        self.check_key(key)?;
        Ok(self.object_path(key).is_file())
    }

    fn get(&self, key: &HexKey) -> StoreResult<Option<Vec<u8>>> {
        self.check_key(key)?;
        match fs::read(self.object_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_file(&self, src: &Path, key: &HexKey) -> StoreResult<u64> {
        self.install(key, |out| {
            let mut input = File::open(src)?;
            io::copy(&mut input, out)
        })
    }

    fn put_data(&self, data: &[u8], key: &HexKey) -> StoreResult<u64> {
        self.install(key, |out| {
            out.write_all(data)?;
            Ok(data.len() as u64)
        })
    }

    fn path(&self, key: &HexKey) -> Option<PathBuf> {
        let path = self.object_path(key);
        path.is_file().then_some(path)
    }
}
