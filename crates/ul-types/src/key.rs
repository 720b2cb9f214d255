use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash_kind::HashKind;

/// Hex-encoded content key or node identifier.
///
/// A `HexKey` is exactly 40 or 64 hex digits. Case is accepted as given and
/// preserved, so a key read back from a log compares equal to the text that
/// was written. Content keys and node ids share this type because the log
/// format treats them identically.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexKey(String);

impl HexKey {
    /// Validate a key of either supported width.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.len() != 40 && s.len() != 64 {
            return Err(TypeError::UnsupportedLength(s.len()));
        }
        check_hex(&s)?;
        Ok(Self(s))
    }

    /// Validate a key against the width required by `kind`.
    pub fn parse(s: &str, kind: HashKind) -> Result<Self, TypeError> {
        if s.len() != kind.hex_len() {
            return Err(TypeError::InvalidLength {
                expected: kind.hex_len(),
                actual: s.len(),
            });
        }
        check_hex(s)?;
        Ok(Self(s.to_string()))
    }

    /// Hex-encode a raw digest.
    pub fn from_digest(bytes: &[u8]) -> Result<Self, TypeError> {
        Self::new(hex::encode(bytes))
    }

    /// The all-zero placeholder key for `kind`.
    pub fn none(kind: HashKind) -> Self {
        Self(kind.none_hex().to_string())
    }

    /// Returns `true` if every digit is zero.
    pub fn is_none(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Returns `true` if this key has the width `kind` requires.
    pub fn fits(&self, kind: HashKind) -> bool {
        self.0.len() == kind.hex_len()
    }

    /// Number of hex digits (40 or 64).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The two shard directory names (`xx`, `yy`) selecting this key's location.
    pub fn shard(&self) -> (&str, &str) {
        (&self.0[0..2], &self.0[2..4])
    }

    /// Short hex representation (first 8 digits).
    pub fn short_hex(&self) -> &str {
        &self.0[..8]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn check_hex(s: &str) -> Result<(), TypeError> {
    if s.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(TypeError::InvalidHex(s.to_string()))
    }
}

impl fmt::Debug for HexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexKey({})", self.short_hex())
    }
}

impl fmt::Display for HexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for HexKey {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<HexKey> for String {
    fn from(key: HexKey) -> Self {
        key.0
    }
}

impl Borrow<str> for HexKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for HexKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
