//! Content-addressed file storage for UL.
//!
//! Files are stored under their hex content key in a two-level sharded
//! directory tree: the first two hex digits of the key select a top
//! directory, the next two a subdirectory.
//!
//! ```text
//! {root}/
//! ├── in/            # staging area for incoming files
//! ├── tmp/           # scratch space for atomic puts
//! ├── node_id        # this store's node identifier
//! ├── L              # the provenance log
//! └── ab/
//!     └── cd/
//!         └── abcd0123...   # content file, named by its full key
//! ```
//!
//! # Design Rules
//!
//! 1. Content is immutable once written; a put of an existing key is a no-op.
//! 2. Puts stage into `tmp/` and rename into place, so a partially copied
//!    file is never visible under its key.
//! 3. The store never checks that bytes hash to the key they are filed under.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod sharded;
pub mod traits;
pub mod walker;

pub use error::{StoreError, StoreResult};
pub use sharded::ShardedStore;
pub use traits::ContentStore;
pub use walker::ShardWalker;

/// Returns `true` if `name` is a two-digit hex shard directory name.
pub fn is_shard_name(name: &str) -> bool {
    name.len() == 2 && name.bytes().all(|b| b.is_ascii_hexdigit())
}
