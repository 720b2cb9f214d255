//! Reconciling a store's files against its log.
//!
//! Every content file should have at least one log entry. The checker walks
//! the shards, reports keys the log has never heard of, and in repair mode
//! appends an entry for each. Log entries whose file is missing are not
//! reported.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};
use ul_log::DurableLog;
use ul_store::ShardWalker;
use ul_types::{HashKind, HexKey};

use crate::config::StoreConfig;
use crate::error::ServerResult;
use crate::server::{now_millis, StoreServer};

/// Source recorded on entries written by a repair.
pub const CHECKER_NAME: &str = concat!("ul-check ", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// Store to check, including its log name and sync policy.
    pub config: StoreConfig,
    /// Append an entry for every orphan found.
    pub repair: bool,
    /// Report every key checked, not just orphans.
    pub verbose: bool,
    /// First top-level shard to visit, two hex digits.
    pub start_at: String,
    /// Maximum keys to check; 0 checks them all.
    pub limit: usize,
    /// Source recorded on repair entries.
    pub program: String,
}

impl CheckOptions {
    pub fn new(root: impl Into<PathBuf>, hash_kind: HashKind) -> Self {
        Self::for_config(StoreConfig::new(root, hash_kind))
    }

    pub fn for_config(config: StoreConfig) -> Self {
        Self {
            config,
            repair: false,
            verbose: false,
            start_at: "00".to_string(),
            limit: 0,
            program: CHECKER_NAME.to_string(),
        }
    }
}

/// Outcome of a check run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub keys_checked: usize,
    /// Entries in the log when the run finished.
    pub log_entries: usize,
    /// Keys present in the store with no log entry, in walk order.
    pub orphans: Vec<HexKey>,
    pub repaired: usize,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.orphans.is_empty() || self.repaired == self.orphans.len()
    }
}

pub struct ConsistencyChecker {
    options: CheckOptions,
}

impl ConsistencyChecker {
    pub fn new(options: CheckOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Walk the store and compare each key against the log.
    ///
    /// The server and the checker's log are closed before returning,
    /// whether or not the run succeeds.
    pub fn run(&self) -> ServerResult<CheckReport> {
        let opts = &self.options;
        let started = now_millis();
        let mut server = StoreServer::open(opts.config.clone())?;
        let mut log = DurableLog::open_at(server.log_location().clone(), server.hash_kind())?
            .with_sync_mode(opts.config.sync_mode());

        let result = self.check(&server, &mut log, started);
        let closed_log = log.close();
        let closed_server = server.close();

        let report = result?;
        closed_log?;
        closed_server?;
        info!(
            checked = report.keys_checked,
            orphans = report.orphans.len(),
            repaired = report.repaired,
            "consistency check complete"
        );
        Ok(report)
    }

    fn check(
        &self,
        server: &StoreServer,
        log: &mut DurableLog,
        started: u64,
    ) -> ServerResult<CheckReport> {
        let opts = &self.options;
        let keys = ShardWalker::new(server.root(), server.hash_kind())
            .start_at(&opts.start_at)?
            .limit(opts.limit)
            .walk()?;

        let mut report = CheckReport::default();
        for key in keys {
            report.keys_checked += 1;
            if let Some(entry) = log.get_entry(key.as_str()) {
                if opts.verbose {
                    info!(key = %key, src = entry.src(), "logged");
                } else {
                    debug!(key = %key.short_hex(), "logged");
                }
                continue;
            }

            warn!(key = %key, "not in log");
            if opts.repair {
                log.add_entry(
                    started,
                    key.as_str(),
                    server.node_id().as_str(),
                    &opts.program,
                    key.as_str(),
                )?;
                report.repaired += 1;
            }
            report.orphans.push(key);
        }
        report.log_entries = log.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use ul_crypto::ContentHasher;
    use ul_store::ContentStore;

    /// A store with one logged object and `orphans` unlogged ones.
    fn store_with_orphans(kind: HashKind, orphans: &[&[u8]]) -> (tempfile::TempDir, Vec<HexKey>) {
        let dir = tempfile::tempdir().unwrap();
        let hasher = ContentHasher::new(kind);
        let mut server = StoreServer::open_at(dir.path(), kind).unwrap();
        let logged = hasher.hash(b"logged");
        server.put_data(b"logged", logged.as_str(), "jdd", Some("logged")).unwrap();
        let keys = orphans
            .iter()
            .map(|data| {
                let key = hasher.hash(data);
                server.store().put_data(data, &key).unwrap();
                key
            })
            .collect();
        server.close().unwrap();
        (dir, keys)
    }

    #[test]
    fn consistent_store_has_no_orphans() {
        let (dir, _) = store_with_orphans(HashKind::Sha2, &[]);
        let report = ConsistencyChecker::new(CheckOptions::new(dir.path(), HashKind::Sha2))
            .run()
            .unwrap();
        assert_eq!(report.keys_checked, 1);
        assert_eq!(report.log_entries, 1);
        assert!(report.orphans.is_empty());
        assert!(report.is_consistent());
    }

    #[test]
    fn report_only_run_changes_nothing() {
        let (dir, keys) = store_with_orphans(HashKind::Sha1, &[b"orphan"]);
        let before = fs::read_to_string(dir.path().join("L")).unwrap();
        let report = ConsistencyChecker::new(CheckOptions::new(dir.path(), HashKind::Sha1))
            .run()
            .unwrap();
        assert_eq!(report.orphans, keys);
        assert_eq!(report.repaired, 0);
        assert!(!report.is_consistent());
        assert_eq!(fs::read_to_string(dir.path().join("L")).unwrap(), before);
    }

    #[test]
    fn repair_logs_orphans_under_their_key() {
        let (dir, keys) = store_with_orphans(HashKind::Sha2, &[b"orphan one", b"orphan two"]);
        let started = now_millis();
        let mut options = CheckOptions::new(dir.path(), HashKind::Sha2);
        options.repair = true;
        options.program = "fixer 1.0".to_string();

        let report = ConsistencyChecker::new(options.clone()).run().unwrap();
        assert_eq!(report.repaired, 2);
        assert_eq!(report.log_entries, 3);

        let server = StoreServer::open_at(dir.path(), HashKind::Sha2).unwrap();
        for key in &keys {
            let entry = server.log().get_entry(key.as_str()).unwrap();
            assert_eq!(entry.path(), key.as_str());
            assert_eq!(entry.src(), "fixer 1.0");
            assert_eq!(entry.node_id(), server.node_id());
            assert!(entry.timestamp() >= started);
        }
        drop(server);

        options.repair = false;
        let again = ConsistencyChecker::new(options).run().unwrap();
        assert!(again.orphans.is_empty());
    }

    #[test]
    fn limit_and_start_bound_the_walk() {
        let (dir, mut keys) = store_with_orphans(HashKind::Sha2, &[b"a", b"b", b"c", b"d"]);
        keys.push(ContentHasher::SHA2.hash(b"logged"));
        let mut options = CheckOptions::new(dir.path(), HashKind::Sha2);
        options.limit = 2;
        assert_eq!(ConsistencyChecker::new(options.clone()).run().unwrap().keys_checked, 2);

        options.limit = 0;
        options.start_at = "80".to_string();
        let report = ConsistencyChecker::new(options).run().unwrap();
        let upper_half = keys.iter().filter(|k| k.shard().0 >= "80").count();
        assert_eq!(report.keys_checked, upper_half);
    }

    #[test]
    fn repair_uses_the_configured_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path(), HashKind::Sha2);
        config.log_name = "L2".to_string();
        config.fsync = true;
        let hasher = ContentHasher::SHA2;
        let mut server = StoreServer::open(config.clone()).unwrap();
        let logged = hasher.hash(b"logged");
        server.put_data(b"logged", logged.as_str(), "jdd", None).unwrap();
        let orphan = hasher.hash(b"orphan");
        server.store().put_data(b"orphan", &orphan).unwrap();
        server.close().unwrap();

        let mut options = CheckOptions::for_config(config.clone());
        options.repair = true;
        let report = ConsistencyChecker::new(options.clone()).run().unwrap();
        assert_eq!(report.orphans, vec![orphan.clone()]);
        assert_eq!(report.log_entries, 2);
        assert!(!dir.path().join("L").exists());

        options.repair = false;
        assert!(ConsistencyChecker::new(options).run().unwrap().orphans.is_empty());
        let server = StoreServer::open(config).unwrap();
        assert!(server.log().contains(orphan.as_str()));
        assert!(!dir.path().join("L").exists());
    }

    #[test]
    fn invalid_start_is_rejected() {
        let (dir, _) = store_with_orphans(HashKind::Sha2, &[]);
        let mut options = CheckOptions::new(dir.path(), HashKind::Sha2);
        options.start_at = "zz".to_string();
        assert!(matches!(
            ConsistencyChecker::new(options).run(),
            Err(crate::ServerError::Store(ul_store::StoreError::InvalidShardPrefix(_)))
        ));
    }

    #[test]
    fn malformed_log_aborts_the_run() {
        let (dir, _) = store_with_orphans(HashKind::Sha2, &[]);
        fs::write(dir.path().join("L"), "garbage\n").unwrap();
        assert!(matches!(
            ConsistencyChecker::new(CheckOptions::new(dir.path(), HashKind::Sha2)).run(),
            Err(crate::ServerError::Log(ul_log::LogError::MalformedHeader { .. }))
        ));
    }
}
