//! Input sources for the log parser.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LogResult;
use crate::DEFAULT_LOG_NAME;

/// Where a log file lives: a directory plus a base name (normally `L`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLocation {
    pub dir: PathBuf,
    pub base_name: String,
}

impl LogLocation {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
        }
    }

    /// The default log file `L` inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, DEFAULT_LOG_NAME)
    }

    /// Full path to the log file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.base_name)
    }
}

/// An ordered sequence of text lines to be parsed as a log.
pub trait LineSource {
    /// Produce the lines, without their terminating newlines.
    fn lines(&self) -> LogResult<Vec<String>>;

    /// The file these lines were read from, if any.
    fn location(&self) -> Option<&LogLocation> {
        None
    }
}

/// Lines read from a log file on disk.
#[derive(Clone, Debug)]
pub struct FileLineSource {
    location: LogLocation,
}

impl FileLineSource {
    pub fn new(location: LogLocation) -> Self {
        Self { location }
    }

    /// The default log file inside a store directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(LogLocation::in_dir(dir.as_ref()))
    }
}

impl LineSource for FileLineSource {
    fn lines(&self) -> LogResult<Vec<String>> {
        let contents = fs::read_to_string(self.location.path())?;
        Ok(split_lines(&contents))
    }

    fn location(&self) -> Option<&LogLocation> {
        Some(&self.location)
    }
}

/// Lines taken from an in-memory string.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLineSource {
    text: String,
}

impl InMemoryLineSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl LineSource for InMemoryLineSource {
    fn lines(&self) -> LogResult<Vec<String>> {
        Ok(split_lines(&self.text))
    }
}

/// Split on `\n`, dropping the empty tail left by a final newline and any
/// carriage returns.
fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
