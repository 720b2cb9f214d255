use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const NONE_160: &str = "0000000000000000000000000000000000000000";
const NONE_256: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Digest family used by one store and its log.
///
/// The kind fixes the width of every content key and node id handled by a
/// store: SHA-1 keys are 160 bits (40 hex digits), all others are 256 bits
/// (64 hex digits). Mixing widths inside one log is a format violation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    /// SHA-1, 160 bits.
    Sha1,
    /// SHA-256.
    #[default]
    Sha2,
    /// SHA3-256.
    Sha3,
    /// BLAKE2b with a 256-bit output.
    Blake2b,
}

impl HashKind {
    /// Every supported kind, narrowest first.
    pub const ALL: [HashKind; 4] = [Self::Sha1, Self::Sha2, Self::Sha3, Self::Blake2b];

    /// Digest length in bytes.
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha2 | Self::Sha3 | Self::Blake2b => 32,
        }
    }

    /// Digest length in hex digits (40 or 64).
    pub const fn hex_len(self) -> usize {
        self.byte_len() * 2
    }

    /// The well-known "no previous log" placeholder for this kind.
    pub const fn none_hex(self) -> &'static str {
        match self {
            Self::Sha1 => NONE_160,
            Self::Sha2 | Self::Sha3 | Self::Blake2b => NONE_256,
        }
    }

    /// Lowercase name as used in configuration files and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha2 => "sha2",
            Self::Sha3 => "sha3",
            Self::Blake2b => "blake2b",
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha2" | "sha256" => Ok(Self::Sha2),
            "sha3" | "sha3-256" => Ok(Self::Sha3),
            "blake2b" | "blake2" => Ok(Self::Blake2b),
            _ => Err(TypeError::UnknownHashKind(s.to_string())),
        }
    }
}
