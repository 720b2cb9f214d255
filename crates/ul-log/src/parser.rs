//! Parsing log text into a header, entry sequence, and key index.
//!
//! The first non-ignorable line is the header. If there is none, a header
//! with timestamp 0 and the kind's all-zero hash for both previous-log fields
//! is synthesized. Every later line must be ignorable or a valid entry;
//! anything else aborts the parse, since a log with one bad line cannot be
//! trusted as a whole.

use std::collections::HashMap;

use tracing::debug;
use ul_types::{HashKind, HexKey};

use crate::entry::LogEntry;
use crate::error::{LogError, LogResult};
use crate::format::{body_re, header_re, ignorable_re};
use crate::source::{LineSource, LogLocation};

/// Result of a successful parse: the seed state for a [`Log`](crate::Log).
#[derive(Clone, Debug)]
pub struct ParsedLog {
    pub kind: HashKind,
    /// Creation time of this log segment, milliseconds since the epoch.
    pub timestamp: u64,
    /// Content key of the previous log segment, or the all-zero hash.
    pub prev_hash: HexKey,
    /// Node id of whoever wrote the previous segment, or the all-zero hash.
    pub prev_master: HexKey,
    /// Entries in file order, duplicates included.
    pub entries: Vec<LogEntry>,
    /// Key to position in `entries` of the last entry with that key.
    pub index: HashMap<HexKey, usize>,
    /// The file the text came from, if it was file-backed.
    pub location: Option<LogLocation>,
    /// `false` when the text held no header and one was synthesized.
    pub has_header: bool,
}

/// Parses log text for one [`HashKind`].
#[derive(Clone, Copy, Debug)]
pub struct LogParser {
    kind: HashKind,
}

impl LogParser {
    pub fn new(kind: HashKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> HashKind {
        self.kind
    }

    /// Read every line from `source` and parse it.
    pub fn parse(&self, source: &dyn LineSource) -> LogResult<ParsedLog> {
        let lines = source.lines()?;
        let mut parsed = self.parse_lines(&lines)?;
        parsed.location = source.location().cloned();
        Ok(parsed)
    }

    /// Parse already-split lines (no trailing newlines).
    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> LogResult<ParsedLog> {
        let mut body = lines
            .iter()
            .map(AsRef::as_ref)
            .enumerate()
            .skip_while(|(_, line)| ignorable_re().is_match(line));

        let first = body.next();
        let has_header = first.is_some();
        let (timestamp, prev_hash, prev_master) = match first {
            Some((_, line)) => self.parse_header(line)?,
            None => (0, HexKey::none(self.kind), HexKey::none(self.kind)),
        };

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for (i, line) in body {
            if ignorable_re().is_match(line) {
                continue;
            }
            let entry = self.parse_body_line(i + 1, line)?;
            index.insert(entry.key().clone(), entries.len());
            entries.push(entry);
        }

        debug!(kind = %self.kind, entries = entries.len(), keys = index.len(), "parsed log");
        Ok(ParsedLog {
            kind: self.kind,
            timestamp,
            prev_hash,
            prev_master,
            entries,
            index,
            location: None,
            has_header,
        })
    }

    fn parse_header(&self, line: &str) -> LogResult<(u64, HexKey, HexKey)> {
        let malformed = || LogError::MalformedHeader {
            line: line.to_string(),
        };
        let caps = header_re(self.kind).captures(line).ok_or_else(malformed)?;
        let timestamp = caps[1].parse::<u64>().map_err(|_| malformed())?;
        let prev_hash = HexKey::parse(&caps[2], self.kind).map_err(|_| malformed())?;
        let prev_master = HexKey::parse(&caps[3], self.kind).map_err(|_| malformed())?;
        Ok((timestamp, prev_hash, prev_master))
    }

    fn parse_body_line(&self, line_no: usize, line: &str) -> LogResult<LogEntry> {
        let malformed = || LogError::MalformedEntryLine {
            line_no,
            line: line.to_string(),
        };
        let caps = body_re(self.kind).captures(line).ok_or_else(malformed)?;
        let timestamp = caps[1].parse::<u64>().map_err(|_| malformed())?;
        LogEntry::new(self.kind, timestamp, &caps[2], &caps[3], &caps[4], &caps[5])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryLineSource;

    const K1: &str = "0123456789012345678901234567890123456789";
    const K2: &str = "fedcba9876543210fedcba9876543210fedcba98";
    const K3: &str = "1234567890123456789012345678901234567890";
    const K4: &str = "edcba9876543210fedcba9876543210fedcba98f";
    const K5: &str = "2345678901234567890123456789012345678901";

    fn parse(text: &str) -> LogResult<ParsedLog> {
        LogParser::new(HashKind::Sha1).parse(&InMemoryLineSource::new(text))
    }

    #[test]
    fn header_only() {
        let a = "a".repeat(40);
        let b = "b".repeat(40);
        let parsed = parse(&format!("0000001234567 {a} {b}\n")).unwrap();
        assert_eq!(parsed.timestamp, 1234567);
        assert_eq!(parsed.prev_hash.as_str(), a);
        assert_eq!(parsed.prev_master.as_str(), b);
        assert!(parsed.entries.is_empty());
        assert!(parsed.index.is_empty());
        assert!(parsed.location.is_none());
        assert!(parsed.has_header);
    }

    #[test]
    fn no_lines_synthesizes_header() {
        for kind in HashKind::ALL {
            let parsed = LogParser::new(kind).parse_lines::<&str>(&[]).unwrap();
            assert_eq!(parsed.timestamp, 0);
            assert_eq!(parsed.prev_hash, HexKey::none(kind));
            assert_eq!(parsed.prev_master, HexKey::none(kind));
            assert!(!parsed.has_header);
        }
    }

    #[test]
    fn comment_only_text_has_no_header() {
        let parsed = parse("# store U\n\n   \n").unwrap();
        assert!(!parsed.has_header);
        assert_eq!(parsed.timestamp, 0);
    }

    #[test]
    fn malformed_header_is_fatal() {
        let err = parse("not a header\n").unwrap_err();
        assert!(matches!(err, LogError::MalformedHeader { line } if line == "not a header"));
    }

    #[test]
    fn header_of_wrong_width_is_malformed() {
        let wide = "c".repeat(64);
        let err = parse(&format!("0000000000001 {wide} {wide}\n")).unwrap_err();
        assert!(matches!(err, LogError::MalformedHeader { .. }));
    }

    #[test]
    fn leading_comments_precede_header() {
        let text = format!("# store U\n\n0000000000010 {K1} {K2}\n");
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.timestamp, 10);
    }

    #[test]
    fn entries_and_index() {
        let text = format!(
            "0000000000010 {K1} {K2}\n\
             0000000000110 {K3} {K4} \"jdd\" document1\n\
             0000000000210 {K5} {K4} \"jdd\" document2\n"
        );
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.index.len(), 2);
        assert_eq!(parsed.entries[0].path(), "document1");
        assert_eq!(parsed.index[K5], 1);
    }

    #[test]
    fn ignorable_lines_are_skipped() {
        let text = format!(
            "0000000000010 {K1} {K2}\n\
             \n\
             # a comment\n   \
             # indented comment\n\
             0000000000110 {K3} {K4} \"jdd\" document1\n"
        );
        assert_eq!(parse(&text).unwrap().entries.len(), 1);
    }

    #[test]
    fn duplicate_keys_keep_history_and_index_last() {
        let text = format!(
            "0000000000010 {K1} {K2}\n\
             0000000000110 {K3} {K4} \"jdd\" first\n\
             0000000000210 {K3} {K4} \"jdd\" second\n"
        );
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.index.len(), 1);
        assert_eq!(parsed.entries[parsed.index[K3]].path(), "second");
    }

    #[test]
    fn malformed_entry_names_line() {
        let text = format!("0000000000010 {K1} {K2}\ngarbage here\n");
        let err = parse(&text).unwrap_err();
        match err {
            LogError::MalformedEntryLine { line_no, line } => {
                assert_eq!(line_no, 2);
                assert_eq!(line, "garbage here");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mixed_widths_are_rejected() {
        let wide = "d".repeat(64);
        let text = format!("0000000000010 {K1} {K2}\n0000000000110 {wide} {wide} \"s\" p\n");
        assert!(matches!(parse(&text), Err(LogError::MalformedEntryLine { .. })));
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let upper = K3.to_uppercase().replace('0', "A");
        let text = format!("0000000000010 {K1} {K2}\n0000000000110 {upper} {K4} \"s\" p\n");
        let parsed = parse(&text).unwrap();
        assert!(parsed.index.contains_key(upper.as_str()));
    }

    #[test]
    fn file_source_records_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("L"), format!("0000000000010 {K1} {K2}\n")).unwrap();
        let src = crate::source::FileLineSource::in_dir(dir.path());
        let parsed = LogParser::new(HashKind::Sha1).parse(&src).unwrap();
        assert_eq!(parsed.location.unwrap().path(), dir.path().join("L"));
    }
}
