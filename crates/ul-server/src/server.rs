use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};
use ul_crypto::{random_node_id, ContentHasher};
use ul_log::{DurableLog, Log, LogEntry, LogLocation};
use ul_store::{ContentStore, ShardedStore};
use ul_types::{HashKind, HexKey, Peer};

use crate::config::StoreConfig;
use crate::error::{ServerError, ServerResult};

/// Staging directory for incoming files.
pub const IN_DIR: &str = "in";
/// File holding this store's node id, hex digits plus a newline.
pub const NODE_ID_FILE: &str = "node_id";
/// Logged path used by [`StoreServer::put_data`] when the caller gives none.
pub const POSTED_DATA_PATH: &str = "z@__posted_data__";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Result of a put.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PutOutcome {
    /// Bytes stored, or -1 if the key was already present.
    pub len: i64,
    pub key: HexKey,
}

impl PutOutcome {
    pub fn already_present(&self) -> bool {
        self.len < 0
    }
}

/// A content store plus its provenance log.
///
/// Every object added through the server is copied into the store first,
/// then recorded in the log.
pub struct StoreServer {
    config: StoreConfig,
    store: ShardedStore,
    hasher: ContentHasher,
    node_id: HexKey,
    log: DurableLog,
}

impl StoreServer {
    /// Open the store at `config.root`, creating its layout if needed.
    pub fn open(config: StoreConfig) -> ServerResult<Self> {
        let kind = config.hash_kind;
        let root = config.root.clone();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join(IN_DIR))?;
        fs::create_dir_all(root.join(ShardedStore::TMP_DIR))?;

        let node_id = load_or_create_node_id(&root, kind)?;
        let store = ShardedStore::open(&root, kind)?;
        let location = LogLocation::new(&root, config.log_name.clone());
        let log = DurableLog::open_or_create(location, kind, now_millis())?
            .with_sync_mode(config.sync_mode());

        info!(
            root = %root.display(),
            kind = %kind,
            node = %node_id.short_hex(),
            entries = log.len(),
            "store opened"
        );
        Ok(Self {
            hasher: ContentHasher::new(kind),
            config,
            store,
            node_id,
            log,
        })
    }

    /// Open with default settings for `root` and `kind`.
    pub fn open_at(root: impl AsRef<Path>, kind: HashKind) -> ServerResult<Self> {
        Self::open(StoreConfig::new(root.as_ref(), kind))
    }

    /// Add the file at `path` under `claimed_key` and log it.
    ///
    /// The file is hashed first; if the digest differs from `claimed_key`
    /// nothing is written. If the key is already present nothing is written
    /// either and the outcome's `len` is -1. `logged_path` defaults to
    /// `z@` followed by the file name.
    pub fn put(
        &mut self,
        path: &Path,
        claimed_key: &str,
        source: &str,
        logged_path: Option<&str>,
    ) -> ServerResult<PutOutcome> {
        let key = self.check_claim(claimed_key, self.hasher.hash_file(path)?)?;
        let logged = match logged_path {
            Some(p) => p.to_string(),
            None => default_logged_path(path),
        };
        self.store_then_log(key, source, &logged, |store, key| store.put_file(path, key))
    }

    /// Add in-memory bytes under `claimed_key` and log them.
    ///
    /// Same contract as [`put`](Self::put); `logged_path` defaults to
    /// `z@__posted_data__`.
    pub fn put_data(
        &mut self,
        data: &[u8],
        claimed_key: &str,
        source: &str,
        logged_path: Option<&str>,
    ) -> ServerResult<PutOutcome> {
        let key = self.check_claim(claimed_key, self.hasher.hash(data))?;
        let logged = logged_path.unwrap_or(POSTED_DATA_PATH);
        self.store_then_log(key, source, logged, |store, key| store.put_data(data, key))
    }

    /// The computed digest is the key: a claim that differs only in hex case
    /// is accepted, but objects and entries are always keyed lowercase.
    fn check_claim(&self, claimed: &str, actual: HexKey) -> ServerResult<HexKey> {
        if !actual.as_str().eq_ignore_ascii_case(claimed) {
            return Err(ServerError::HashMismatch {
                actual,
                claimed: claimed.to_string(),
            });
        }
        Ok(actual)
    }

    fn store_then_log<F>(
        &mut self,
        key: HexKey,
        source: &str,
        logged_path: &str,
        write: F,
    ) -> ServerResult<PutOutcome>
    where
        F: FnOnce(&ShardedStore, &HexKey) -> ul_store::StoreResult<u64>,
    {
        if self.store.exists(&key)? {
            debug!(key = %key.short_hex(), "already present");
            return Ok(PutOutcome { len: -1, key });
        }
        if !self.log.is_open() {
            return Err(ul_log::LogError::LogClosed(self.log.path()).into());
        }

        // Reject bad metadata before anything touches the store.
        let timestamp = now_millis();
        LogEntry::new(
            self.hash_kind(),
            timestamp,
            key.as_str(),
            self.node_id.as_str(),
            source,
            logged_path,
        )?;

        let len = write(&self.store, &key)?;
        self.log
            .add_entry(timestamp, key.as_str(), self.node_id.as_str(), source, logged_path)?;
        info!(key = %key.short_hex(), len, path = logged_path, "put");
        Ok(PutOutcome {
            len: i64::try_from(len).unwrap_or(i64::MAX),
            key,
        })
    }

    pub fn get(&self, key: &str) -> ServerResult<Option<Vec<u8>>> {
        let key = HexKey::parse(key, self.hash_kind())?;
        Ok(self.store.get(&key)?)
    }

    pub fn exists(&self, key: &str) -> ServerResult<bool> {
        let key = HexKey::parse(key, self.hash_kind())?;
        Ok(self.store.exists(&key)?)
    }

    pub fn node_id(&self) -> &HexKey {
        &self.node_id
    }

    pub fn hash_kind(&self) -> HashKind {
        self.config.hash_kind
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn store(&self) -> &ShardedStore {
        &self.store
    }

    /// The in-memory view of the log.
    pub fn log(&self) -> &Log {
        self.log.log()
    }

    pub fn log_location(&self) -> &LogLocation {
        self.log.location()
    }

    /// A peer record describing this node.
    pub fn peer(&self) -> ServerResult<Peer> {
        Ok(Peer::new(self.node_id.clone(), self.hash_kind())?)
    }

    pub fn is_open(&self) -> bool {
        self.log.is_open()
    }

    /// Close the log. Staging directories are left in place.
    pub fn close(&mut self) -> ServerResult<()> {
        if self.log.is_open() {
            self.log.close()?;
            info!(root = %self.root().display(), "store closed");
        }
        Ok(())
    }
}

impl Drop for StoreServer {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close store log");
        }
    }
}

fn load_or_create_node_id(root: &Path, kind: HashKind) -> ServerResult<HexKey> {
    let path = root.join(NODE_ID_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => {
            let text = text.trim_end();
            HexKey::parse(text, kind).map_err(|e| {
                ServerError::InvalidNodeId(format!("{}: {e}", path.display()))
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let id = random_node_id(kind);
            fs::write(&path, format!("{id}\n"))?;
            info!(node = %id.short_hex(), "generated node id");
            Ok(id)
        }
        Err(e) => Err(e.into()),
    }
}

/// `z@` plus the file name, with characters the log cannot carry replaced.
fn default_logged_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("z@{}", sanitize_path_part(&name))
}

/// Map `name` onto dot-separated runs of atext characters.
fn sanitize_path_part(name: &str) -> String {
    let atext = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~-".contains(c);
    let parts: Vec<String> = name
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.chars().map(|c| if atext(c) { c } else { '_' }).collect())
        .collect();
    if parts.is_empty() {
        "_".to_string()
    } else {
        parts.join(".")
    }
}
