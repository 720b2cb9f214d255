use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use blake2::digest::consts::U32;
use blake2::Blake2b;
use sha2::Digest;
use ul_types::{HashKind, HexKey};

type Blake2b256 = Blake2b<U32>;

const READ_CHUNK: usize = 64 * 1024;

/// Content hasher for one [`HashKind`].
///
/// The hex digest of a file's bytes is its content key. Keys are always
/// produced in lowercase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    kind: HashKind,
}

impl ContentHasher {
    pub const SHA1: Self = Self::new(HashKind::Sha1);
    pub const SHA2: Self = Self::new(HashKind::Sha2);
    pub const SHA3: Self = Self::new(HashKind::Sha3);
    pub const BLAKE2B: Self = Self::new(HashKind::Blake2b);

    pub const fn new(kind: HashKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> HashKind {
        self.kind
    }

    /// Hash an in-memory buffer.
    pub fn hash(&self, data: &[u8]) -> HexKey {
        let digest = match self.kind {
            HashKind::Sha1 => sha1::Sha1::digest(data).to_vec(),
            HashKind::Sha2 => sha2::Sha256::digest(data).to_vec(),
            HashKind::Sha3 => sha3::Sha3_256::digest(data).to_vec(),
            HashKind::Blake2b => Blake2b256::digest(data).to_vec(),
        };
        to_key(&digest)
    }

    /// Hash everything readable from `reader`, streaming in fixed-size chunks.
    pub fn hash_reader<R: Read>(&self, reader: R) -> io::Result<HexKey> {
        let digest = match self.kind {
            HashKind::Sha1 => digest_reader::<sha1::Sha1, _>(reader)?,
            HashKind::Sha2 => digest_reader::<sha2::Sha256, _>(reader)?,
            HashKind::Sha3 => digest_reader::<sha3::Sha3_256, _>(reader)?,
            HashKind::Blake2b => digest_reader::<Blake2b256, _>(reader)?,
        };
        Ok(to_key(&digest))
    }

    /// Hash the contents of the file at `path`.
    pub fn hash_file(&self, path: &Path) -> io::Result<HexKey> {
        let file = File::open(path)?;
        self.hash_reader(BufReader::new(file))
    }

    /// Verify that data produces the expected key (case-insensitive).
    pub fn verify(&self, data: &[u8], expected: &HexKey) -> bool {
        self.hash(data).as_str().eq_ignore_ascii_case(expected.as_str())
    }
}

fn digest_reader<D: Digest, R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

fn to_key(digest: &[u8]) -> HexKey {
    HexKey::from_digest(digest).expect("digest width is 20 or 32 bytes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn known_empty_digests() {
        assert_eq!(
            ContentHasher::SHA1.hash(b"").as_str(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            ContentHasher::SHA2.hash(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            ContentHasher::SHA3.hash(b"").as_str(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn widths_follow_kind() {
        for kind in HashKind::ALL {
            let key = ContentHasher::new(kind).hash(b"hello world");
            assert!(key.fits(kind), "{kind} produced {} digits", key.len());
        }
    }

    #[test]
    fn kinds_produce_different_keys() {
        let a = ContentHasher::SHA2.hash(b"same");
        let b = ContentHasher::SHA3.hash(b"same");
        let c = ContentHasher::BLAKE2B.hash(b"same");
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn reader_matches_buffer() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        for kind in HashKind::ALL {
            let hasher = ContentHasher::new(kind);
            let streamed = hasher.hash_reader(&data[..]).unwrap();
            assert_eq!(streamed, hasher.hash(&data));
        }
    }

    #[test]
    fn file_hash_matches_buffer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"file contents").unwrap();
        file.flush().unwrap();
        let key = ContentHasher::SHA2.hash_file(file.path()).unwrap();
        assert_eq!(key, ContentHasher::SHA2.hash(b"file contents"));
    }

    #[test]
    fn verify_is_case_insensitive() {
        let key = ContentHasher::SHA1.hash(b"abc");
        let upper = HexKey::new(key.as_str().to_uppercase()).unwrap();
        assert!(ContentHasher::SHA1.verify(b"abc", &upper));
        assert!(!ContentHasher::SHA1.verify(b"abd", &upper));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ContentHasher::SHA2
            .hash_file(Path::new("/nonexistent/ul/file"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
