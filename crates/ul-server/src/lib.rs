//! Store server for UL.
//!
//! Binds a sharded content store to its provenance log and enforces the
//! write order between them: content is in place before its entry is
//! appended. Also hosts the two maintenance jobs that work on a whole
//! store, consistency checking and bulk import.

pub mod config;
pub mod consistency;
pub mod error;
pub mod importer;
pub mod server;

pub use config::StoreConfig;
pub use consistency::{CheckOptions, CheckReport, ConsistencyChecker, CHECKER_NAME};
pub use error::{ServerError, ServerResult};
pub use importer::{BulkImporter, ImportOptions, ImportReport, IMPORTER_NAME};
pub use server::{now_millis, PutOutcome, StoreServer, IN_DIR, NODE_ID_FILE, POSTED_DATA_PATH};
