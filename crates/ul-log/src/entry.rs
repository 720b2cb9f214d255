use std::fmt;

use ul_types::{HashKind, HexKey, TypeError};

use crate::error::{LogError, LogResult};
use crate::format::path_re;

/// The record made when a file is added to a content store.
///
/// An entry holds a timestamp (milliseconds since the epoch), the content key
/// of the file, the node id of the contributor, its source (a program name
/// or a person), and a logical path associated with the file.
///
/// Entries are immutable and compare structurally over all five fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogEntry {
    timestamp: u64,
    key: HexKey,
    node_id: HexKey,
    src: String,
    path: String,
}

impl LogEntry {
    /// Validate and build an entry for a log of the given kind.
    ///
    /// Fails with [`LogError::InvalidEntry`] if the key or node id is empty,
    /// not hex, or not the width `kind` requires, if `src` contains a double
    /// quote or line break, or if `path` is not a valid logical path.
    pub fn new(
        kind: HashKind,
        timestamp: u64,
        key: &str,
        node_id: &str,
        src: &str,
        path: &str,
    ) -> LogResult<Self> {
        let key = check_hex_field("key", key, kind)?;
        let node_id = check_hex_field("node id", node_id, kind)?;
        if src.contains(['"', '\n', '\r']) {
            return Err(LogError::InvalidEntry(format!(
                "source may not contain quotes or line breaks: {src:?}"
            )));
        }
        if !path_re().is_match(path) {
            return Err(LogError::InvalidEntry(format!("not a valid logical path: {path:?}")));
        }
        Ok(Self {
            timestamp,
            key,
            node_id,
            src: src.to_string(),
            path: path.to_string(),
        })
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Content key of the logged file.
    pub fn key(&self) -> &HexKey {
        &self.key
    }

    /// Node that contributed the file.
    pub fn node_id(&self) -> &HexKey {
        &self.node_id
    }

    /// Tool or person responsible for the entry.
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Serialized form: exactly one newline-terminated line.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

/// `<13-digit timestamp> <key> <node_id> "<src>" <path>`, without the newline.
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.key.len();
        write!(
            f,
            "{:013} {:>w$} {:>w$} \"{}\" {}",
            self.timestamp,
            self.key.as_str(),
            self.node_id.as_str(),
            self.src,
            self.path,
        )
    }
}

fn check_hex_field(what: &str, value: &str, kind: HashKind) -> LogResult<HexKey> {
    if value.is_empty() {
        return Err(LogError::InvalidEntry(format!("{what} may not be empty")));
    }
    HexKey::parse(value, kind).map_err(|e| match e {
        TypeError::InvalidLength { expected, actual } => LogError::InvalidEntry(format!(
            "{what} has {actual} hex digits, {kind} needs {expected}"
        )),
        other => LogError::InvalidEntry(format!("{what}: {other}")),
    })
}
