//! Fault-tolerant provenance log for UL.
//!
//! The log ("L") records one line per object added to a content store:
//! when it was added, its content key, the node that contributed it, the
//! tool or person responsible, and a logical path.
//!
//! This crate provides:
//! - [`LogEntry`] with its fixed-width text serialization
//! - [`LineSource`] implementations for file-backed and in-memory input
//! - [`LogParser`], which validates text into a [`ParsedLog`]
//! - [`Log`], the in-memory entry sequence plus key index
//! - [`DurableLog`], a `Log` bound to a file with write-through appends
//!
//! # File Format
//!
//! ```text
//! <13-digit-timestamp> <prev_hash> <prev_master>
//! <13-digit-timestamp> <key> <node_id> "<src>" <path>
//! ...
//! ```
//!
//! Timestamps are milliseconds since the Unix epoch. Blank lines and lines
//! starting with `#` are skipped on read and never written.

pub mod durable;
pub mod entry;
pub mod error;
pub mod format;
pub mod log;
pub mod parser;
pub mod source;

pub use durable::{DurableLog, SyncMode};
pub use entry::LogEntry;
pub use error::{LogError, LogResult};
pub use log::Log;
pub use parser::{LogParser, ParsedLog};
pub use source::{FileLineSource, InMemoryLineSource, LineSource, LogLocation};

/// Default file name of the log inside a store root.
pub const DEFAULT_LOG_NAME: &str = "L";
