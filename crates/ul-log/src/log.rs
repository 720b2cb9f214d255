use std::collections::HashMap;
use std::fmt;

use tracing::debug;
use ul_types::{HashKind, HexKey};

use crate::entry::LogEntry;
use crate::error::{LogError, LogResult};
use crate::format::header_line;
use crate::parser::ParsedLog;

/// In-memory provenance log: a header, every entry in append order, and an
/// index from content key to the most recently added entry for that key.
///
/// Entries keep full history, including entries superseded by a later one
/// for the same key. The index is last-write-wins. All keys and node ids in
/// one log share its [`HashKind`].
#[derive(Clone, Debug)]
pub struct Log {
    kind: HashKind,
    timestamp: u64,
    prev_hash: HexKey,
    prev_master: HexKey,
    entries: Vec<LogEntry>,
    index: HashMap<HexKey, usize>,
}

impl Log {
    /// Empty log with a zero timestamp and sentinel previous-log fields.
    pub fn new(kind: HashKind) -> Self {
        Self {
            kind,
            timestamp: 0,
            prev_hash: HexKey::none(kind),
            prev_master: HexKey::none(kind),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Empty log with an explicit header, validated against `kind`.
    pub fn with_header(
        kind: HashKind,
        timestamp: u64,
        prev_hash: &str,
        prev_master: &str,
    ) -> LogResult<Self> {
        let check = |what: &str, value: &str| {
            HexKey::parse(value, kind)
                .map_err(|e| LogError::InvalidEntry(format!("header {what}: {e}")))
        };
        Ok(Self {
            timestamp,
            prev_hash: check("previous hash", prev_hash)?,
            prev_master: check("previous master", prev_master)?,
            ..Self::new(kind)
        })
    }

    /// Adopt the state produced by [`LogParser`](crate::LogParser).
    pub fn from_parsed(parsed: ParsedLog) -> Self {
        Self {
            kind: parsed.kind,
            timestamp: parsed.timestamp,
            prev_hash: parsed.prev_hash,
            prev_master: parsed.prev_master,
            entries: parsed.entries,
            index: parsed.index,
        }
    }

    pub fn hash_kind(&self) -> HashKind {
        self.kind
    }

    /// Header timestamp in milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn prev_hash(&self) -> &HexKey {
        &self.prev_hash
    }

    pub fn prev_master(&self) -> &HexKey {
        &self.prev_master
    }

    /// Returns `true` if some entry has been recorded for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of entries, superseded duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct keys.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry for `key`.
    pub fn get_entry(&self, key: &str) -> Option<&LogEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Every entry in append order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// `(key, latest entry)` pairs in no particular order.
    pub fn index(&self) -> impl Iterator<Item = (&HexKey, &LogEntry)> + '_ {
        self.index.iter().map(|(k, &i)| (k, &self.entries[i]))
    }

    /// Validate and record an entry.
    ///
    /// If the index already holds an equal entry for the key, that entry is
    /// returned and nothing changes. Otherwise the entry is appended and
    /// becomes the index target for its key.
    pub fn add_entry(
        &mut self,
        timestamp: u64,
        key: &str,
        node_id: &str,
        src: &str,
        path: &str,
    ) -> LogResult<LogEntry> {
        let entry = LogEntry::new(self.kind, timestamp, key, node_id, src, path)?;
        self.add(entry.clone());
        Ok(entry)
    }

    /// Record a prebuilt entry. Returns `false` if it was already current.
    ///
    /// The entry must have been built for this log's kind.
    pub fn add(&mut self, entry: LogEntry) -> bool {
        if self.get_entry(entry.key().as_str()) == Some(&entry) {
            return false;
        }
        debug!(key = %entry.key().short_hex(), path = entry.path(), "log entry added");
        self.index.insert(entry.key().clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// The header line, newline-terminated.
    pub fn header_line(&self) -> String {
        header_line(
            self.timestamp,
            self.prev_hash.as_str(),
            self.prev_master.as_str(),
            self.kind,
        )
    }

    /// Full serialized text: the header, then every entry in append order.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_line())?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
