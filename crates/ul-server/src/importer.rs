//! Copying every object of one sharded tree into a store, with provenance.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};
use ul_store::ShardWalker;
use ul_types::HashKind;

use crate::config::StoreConfig;
use crate::error::{ServerError, ServerResult};
use crate::server::StoreServer;

/// Source recorded on imported entries.
pub const IMPORTER_NAME: &str = concat!("ul-import ", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct ImportOptions {
    /// Root of the sharded tree to read.
    pub source_root: PathBuf,
    /// Store to fill; its hash kind also selects which names are keys.
    pub dest: StoreConfig,
    /// Source recorded on each new entry.
    pub program: String,
    pub verbose: bool,
}

impl ImportOptions {
    pub fn new(
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
        hash_kind: HashKind,
    ) -> Self {
        Self::into_store(source_root, StoreConfig::new(dest_root, hash_kind))
    }

    pub fn into_store(source_root: impl Into<PathBuf>, dest: StoreConfig) -> Self {
        Self {
            source_root: source_root.into(),
            dest,
            program: IMPORTER_NAME.to_string(),
            verbose: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub already_present: usize,
    /// Files whose contents do not hash to their name.
    pub skipped: usize,
}

pub struct BulkImporter {
    options: ImportOptions,
}

impl BulkImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    /// Put every content file under the source root into the destination.
    ///
    /// Names that are not keys of the right width are skipped by the walk.
    /// The destination server is closed before returning.
    pub fn run(&self) -> ServerResult<ImportReport> {
        let opts = &self.options;
        let mut server = StoreServer::open(opts.dest.clone())?;
        let result = self.import(&mut server);
        let closed = server.close();
        let report = result?;
        closed?;
        info!(
            imported = report.imported,
            already_present = report.already_present,
            skipped = report.skipped,
            "import complete"
        );
        Ok(report)
    }

    fn import(&self, server: &mut StoreServer) -> ServerResult<ImportReport> {
        let opts = &self.options;
        let keys = ShardWalker::new(&opts.source_root, server.hash_kind()).walk()?;

        let mut report = ImportReport::default();
        for key in keys {
            let (top, mid) = key.shard();
            let path = opts.source_root.join(top).join(mid).join(key.as_str());
            match server.put(&path, key.as_str(), &opts.program, None) {
                Ok(outcome) if outcome.already_present() => {
                    debug!(key = %key.short_hex(), "already present");
                    report.already_present += 1;
                }
                Ok(outcome) => {
                    if opts.verbose {
                        info!(key = %key, len = outcome.len, "imported");
                    }
                    report.imported += 1;
                }
                Err(ServerError::HashMismatch { actual, .. }) => {
                    warn!(path = %path.display(), %actual, "contents do not match name; skipping");
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use ul_crypto::ContentHasher;
    use ul_store::{ContentStore, ShardedStore};

    fn source_tree(kind: HashKind, items: &[&[u8]]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardedStore::open(dir.path(), kind).unwrap();
        let hasher = ContentHasher::new(kind);
        for data in items {
            store.put_data(data, &hasher.hash(data)).unwrap();
        }
        fs::write(dir.path().join("L"), "not a log\n").unwrap();
        fs::write(dir.path().join("node_id"), "xyz\n").unwrap();
        dir
    }

    #[test]
    fn imports_every_object_with_provenance() {
        let src = source_tree(HashKind::Sha2, &[b"one", b"two", b"three"]);
        let dest = tempfile::tempdir().unwrap();
        let mut options = ImportOptions::new(src.path(), dest.path(), HashKind::Sha2);
        options.program = "importer 2".to_string();

        let report = BulkImporter::new(options).run().unwrap();
        assert_eq!(report.imported, 3);
        assert_eq!(report.already_present, 0);
        assert_eq!(report.skipped, 0);

        let server = StoreServer::open_at(dest.path(), HashKind::Sha2).unwrap();
        assert_eq!(server.log().len(), 3);
        let key = ContentHasher::SHA2.hash(b"two");
        assert_eq!(server.get(key.as_str()).unwrap().unwrap(), b"two");
        let entry = server.log().get_entry(key.as_str()).unwrap();
        assert_eq!(entry.src(), "importer 2");
        assert_eq!(entry.path(), format!("z@{key}"));
    }

    #[test]
    fn second_import_finds_everything_present() {
        let src = source_tree(HashKind::Sha1, &[b"one", b"two"]);
        let dest = tempfile::tempdir().unwrap();
        let options = ImportOptions::new(src.path(), dest.path(), HashKind::Sha1);
        BulkImporter::new(options.clone()).run().unwrap();
        let report = BulkImporter::new(options).run().unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.already_present, 2);
    }

    #[test]
    fn misnamed_files_are_skipped() {
        let src = source_tree(HashKind::Sha2, &[b"good"]);
        let liar = ContentHasher::SHA2.hash(b"claimed");
        let (top, mid) = liar.shard();
        let shard = src.path().join(top).join(mid);
        fs::create_dir_all(&shard).unwrap();
        fs::write(shard.join(liar.as_str()), b"actual").unwrap();
        fs::write(shard.join("README"), b"not a key").unwrap();

        let dest = tempfile::tempdir().unwrap();
        let report = BulkImporter::new(ImportOptions::new(src.path(), dest.path(), HashKind::Sha2))
            .run()
            .unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        let server = StoreServer::open_at(dest.path(), HashKind::Sha2).unwrap();
        assert!(!server.exists(liar.as_str()).unwrap());
    }

    #[test]
    fn entries_go_to_the_configured_log() {
        let src = source_tree(HashKind::Sha1, &[b"one", b"two"]);
        let dest = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dest.path(), HashKind::Sha1);
        config.log_name = "L2".to_string();

        let report = BulkImporter::new(ImportOptions::into_store(src.path(), config.clone()))
            .run()
            .unwrap();
        assert_eq!(report.imported, 2);
        assert!(!dest.path().join("L").exists());
        let server = StoreServer::open(config).unwrap();
        assert_eq!(server.log().len(), 2);
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = ImportOptions::new(dir.path().join("absent"), dir.path().join("dest"), HashKind::Sha2);
        assert!(BulkImporter::new(options).run().is_err());
    }
}
