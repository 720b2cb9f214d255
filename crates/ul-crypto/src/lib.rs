//! Hashing primitives for UL.
//!
//! Computes content keys with the digest selected by a [`HashKind`] and
//! generates node identifiers of matching width.
//!
//! All crypto operations wrap established RustCrypto implementations.
//!
//! [`HashKind`]: ul_types::HashKind

pub mod hasher;
pub mod identity;

pub use hasher::ContentHasher;
pub use identity::random_node_id;
