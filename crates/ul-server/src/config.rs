use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ul_log::{SyncMode, DEFAULT_LOG_NAME};
use ul_types::HashKind;

use crate::error::{ServerError, ServerResult};

/// Settings for opening a store.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// root = "/var/lib/ul"
/// hash_kind = "sha1"
/// fsync = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub hash_kind: HashKind,
    /// File name of the log inside `root`.
    pub log_name: String,
    /// `fsync` the log after every append.
    pub fsync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            hash_kind: HashKind::default(),
            log_name: DEFAULT_LOG_NAME.to_string(),
            fsync: false,
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>, hash_kind: HashKind) -> Self {
        Self {
            root: root.into(),
            hash_kind,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn sync_mode(&self) -> SyncMode {
        if self.fsync {
            SyncMode::EveryWrite
        } else {
            SyncMode::OsDefault
        }
    }

    fn validate(&self) -> ServerResult<()> {
        if self.log_name.is_empty() || self.log_name.contains(['/', '\\']) {
            return Err(ServerError::Config(format!(
                "log_name must be a plain file name, got {:?}",
                self.log_name
            )));
        }
        Ok(())
    }
}
