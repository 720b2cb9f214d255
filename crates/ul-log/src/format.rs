//! Line grammar of the log file.
//!
//! Patterns are compiled once per key width and shared.

use std::sync::OnceLock;

use regex::Regex;
use ul_types::HashKind;

/// RFC 2822 `atext`: one or more characters allowed in an unquoted local part.
const ATEXT: &str = r"[a-z0-9!#$%&'*+/=?^_`{|}~\-]+";

fn at_free() -> String {
    format!(r"{ATEXT}(?:\.{ATEXT})*")
}

/// A logical path: dot-separated atext, optionally `@` and another such run.
fn path_pattern() -> String {
    let free = at_free();
    format!(r"{free}(?:@{free})?")
}

/// Full-line matcher for a logical path.
pub fn path_re() -> &'static Regex {
    static PATH: OnceLock<Regex> = OnceLock::new();
    PATH.get_or_init(|| {
        Regex::new(&format!(r"(?i)^{}$", path_pattern())).expect("path pattern is valid")
    })
}

/// Header line: `<13 digits> <prev_hash> <prev_master>`.
pub fn header_re(kind: HashKind) -> &'static Regex {
    static NARROW: OnceLock<Regex> = OnceLock::new();
    static WIDE: OnceLock<Regex> = OnceLock::new();
    let cell = if kind.hex_len() == 40 { &NARROW } else { &WIDE };
    cell.get_or_init(|| {
        let w = kind.hex_len();
        Regex::new(&format!(r"(?i)^(\d{{13}}) ([0-9a-f]{{{w}}}) ([0-9a-f]{{{w}}})$"))
            .expect("header pattern is valid")
    })
}

/// Body line: `<digits> <key> <node_id> "<src>" <path>`.
pub fn body_re(kind: HashKind) -> &'static Regex {
    static NARROW: OnceLock<Regex> = OnceLock::new();
    static WIDE: OnceLock<Regex> = OnceLock::new();
    let cell = if kind.hex_len() == 40 { &NARROW } else { &WIDE };
    cell.get_or_init(|| {
        let w = kind.hex_len();
        let path = path_pattern();
        Regex::new(&format!(
            r#"(?i)^(\d+) ([0-9a-f]{{{w}}}) ([0-9a-f]{{{w}}}) "([^"]*)" ({path})$"#
        ))
        .expect("body pattern is valid")
    })
}

/// Blank lines and `#` comments.
pub fn ignorable_re() -> &'static Regex {
    static IGNORABLE: OnceLock<Regex> = OnceLock::new();
    IGNORABLE.get_or_init(|| Regex::new(r"^\s*(?:#|$)").expect("ignorable pattern is valid"))
}

/// Render the header line, newline-terminated.
pub fn header_line(timestamp: u64, prev_hash: &str, prev_master: &str, kind: HashKind) -> String {
    let w = kind.hex_len();
    format!("{timestamp:013} {prev_hash:>w$} {prev_master:>w$}\n")
}
