//! Foundation types for UL.
//!
//! UL is a content-addressed file store ("U") paired with an append-only
//! provenance log ("L"). This crate holds the small value types shared by
//! every other UL crate.
//!
//! # Key Types
//!
//! - [`HashKind`]: digest family in use for one store/log instance
//! - [`HexKey`]: hex-encoded content key or node identifier (40 or 64 digits)
//! - [`Peer`]: inert record describing another node

pub mod error;
pub mod hash_kind;
pub mod key;
pub mod peer;

pub use error::TypeError;
pub use hash_kind::HashKind;
pub use key::HexKey;
pub use peer::Peer;
