use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use ul_types::{HashKind, HexKey};

use crate::entry::LogEntry;
use crate::error::{LogError, LogResult};
use crate::log::Log;
use crate::parser::{LogParser, ParsedLog};
use crate::source::{FileLineSource, LogLocation};

/// Flush/sync strategy for appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every append.
    EveryWrite,
    /// Flush to the OS after every append and let it schedule the disk write.
    #[default]
    OsDefault,
}

/// A [`Log`] bound to a file, with every new entry written through.
///
/// The file handle is opened for append when the log is built and released
/// by [`close`](Self::close). After close the in-memory log stays readable
/// but [`add_entry`](Self::add_entry) fails with [`LogError::LogClosed`].
pub struct DurableLog {
    log: Log,
    location: LogLocation,
    writer: Option<BufWriter<File>>,
    sync_mode: SyncMode,
}

impl DurableLog {
    /// Bind parsed state to a file.
    ///
    /// With a `target`, the file there is replaced by the full text of the
    /// parsed log. Without one, the file the log was parsed from is reopened
    /// for append; an in-memory parse then fails with
    /// [`LogError::NoTargetSpecified`].
    pub fn from_parsed(parsed: ParsedLog, target: Option<LogLocation>) -> LogResult<Self> {
        match target {
            Some(location) => Self::create(location, Log::from_parsed(parsed)),
            None => {
                let location = parsed.location.clone().ok_or(LogError::NoTargetSpecified)?;
                let has_header = parsed.has_header;
                Self::reopen(location, Log::from_parsed(parsed), has_header)
            }
        }
    }

    /// Write `log` to `location`, replacing any existing file, and keep it
    /// open for append.
    pub fn create(location: LogLocation, log: Log) -> LogResult<Self> {
        fs::create_dir_all(&location.dir)?;
        let path = location.path();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(log.to_text().as_bytes())?;
        writer.flush()?;
        info!(path = %path.display(), entries = log.len(), "log written");
        Ok(Self {
            log,
            location,
            writer: Some(writer),
            sync_mode: SyncMode::default(),
        })
    }

    /// Parse the default log file `L` in `dir` and reopen it for append.
    pub fn open(dir: impl AsRef<Path>, kind: HashKind) -> LogResult<Self> {
        Self::open_at(LogLocation::in_dir(dir.as_ref()), kind)
    }

    /// Parse the log file at `location` and reopen it for append.
    pub fn open_at(location: LogLocation, kind: HashKind) -> LogResult<Self> {
        let parsed = LogParser::new(kind).parse(&FileLineSource::new(location))?;
        Self::from_parsed(parsed, None)
    }

    /// Open the log at `location`, or start a fresh one there with the given
    /// header timestamp and sentinel previous-log fields.
    pub fn open_or_create(location: LogLocation, kind: HashKind, timestamp: u64) -> LogResult<Self> {
        if location.path().is_file() {
            return Self::open_at(location, kind);
        }
        let none = HexKey::none(kind);
        let log = Log::with_header(kind, timestamp, none.as_str(), none.as_str())?;
        Self::create(location, log)
    }

    /// Use `mode` for subsequent appends.
    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// Reopen for append. A file with no header line (empty, or only blank
    /// and comment lines) gets the log's header appended first.
    fn reopen(location: LogLocation, log: Log, has_header: bool) -> LogResult<Self> {
        let path = location.path();
        let mut file = OpenOptions::new().read(true).append(true).open(&path)?;
        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                warn!(path = %path.display(), "log lacks a final newline; terminating last line");
                file.write_all(b"\n")?;
            }
        }
        if !has_header {
            debug!(path = %path.display(), "log has no header; writing one");
            file.write_all(log.header_line().as_bytes())?;
        }
        debug!(path = %path.display(), entries = log.len(), "log reopened for append");
        Ok(Self {
            log,
            location,
            writer: Some(BufWriter::new(file)),
            sync_mode: SyncMode::default(),
        })
    }

    /// Validate and record an entry, writing it to disk if it is new.
    ///
    /// Same semantics as [`Log::add_entry`]. The line reaches the file
    /// before the in-memory log changes, so a failed write leaves both
    /// untouched.
    pub fn add_entry(
        &mut self,
        timestamp: u64,
        key: &str,
        node_id: &str,
        src: &str,
        path: &str,
    ) -> LogResult<LogEntry> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(LogError::LogClosed(self.location.path()));
        };
        let entry = LogEntry::new(self.log.hash_kind(), timestamp, key, node_id, src, path)?;
        if self.log.get_entry(entry.key().as_str()) == Some(&entry) {
            return Ok(entry);
        }

        writer.write_all(entry.to_line().as_bytes())?;
        writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            writer.get_ref().sync_data()?;
        }
        debug!(key = %entry.key().short_hex(), "log append");
        self.log.add(entry.clone());
        Ok(entry)
    }

    pub fn flush(&mut self) -> LogResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flush and release the file handle. Closing twice is a no-op.
    pub fn close(&mut self) -> LogResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
            info!(path = %self.location.path().display(), "log closed");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// The in-memory log.
    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn location(&self) -> &LogLocation {
        &self.location
    }

    pub fn path(&self) -> PathBuf {
        self.location.path()
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    pub fn contains(&self, key: &str) -> bool {
        self.log.contains(key)
    }

    pub fn get_entry(&self, key: &str) -> Option<&LogEntry> {
        self.log.get_entry(key)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

impl std::fmt::Debug for DurableLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableLog")
            .field("path", &self.location.path())
            .field("entries", &self.log.len())
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for DurableLog {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                warn!(error = %e, "failed to flush log on drop");
            }
        }
    }
}
