use std::path::{Path, PathBuf};

use ul_types::{HashKind, HexKey};

use crate::error::StoreResult;

/// Content-addressed file store.
///
/// All implementations must satisfy these invariants:
/// - Content is immutable once written. Putting a key that already exists
///   leaves the stored bytes untouched.
/// - A put is complete before it returns: the object is either fully
///   visible under its key or absent.
/// - Keys must have the width of the store's [`HashKind`].
pub trait ContentStore {
    /// The digest family whose keys this store accepts.
    fn hash_kind(&self) -> HashKind;

    /// Check whether an object exists in the store.
    fn exists(&self, key: &HexKey) -> StoreResult<bool>;

    /// Read an object's bytes. Returns `Ok(None)` if it does not exist.
    fn get(&self, key: &HexKey) -> StoreResult<Option<Vec<u8>>>;

    /// Copy the file at `src` into the store under `key`.
    ///
    /// Returns the number of bytes stored, or 0 if the key already existed.
    fn put_file(&self, src: &Path, key: &HexKey) -> StoreResult<u64>;

    /// Store `data` under `key`. Same contract as [`put_file`](Self::put_file).
    fn put_data(&self, data: &[u8], key: &HexKey) -> StoreResult<u64>;

    /// Filesystem location of an object, if it exists.
    fn path(&self, key: &HexKey) -> Option<PathBuf>;
}
