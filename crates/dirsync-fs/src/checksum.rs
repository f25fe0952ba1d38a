//! Content hashing utilities
//!
//! Every file in a snapshot is fingerprinted with a [`ContentHash`]: the first
//! eight bytes of the SHA-256 digest of its full content, read as a big-endian
//! `u64`. Sixty-four bits keeps the persisted form a plain integer while the
//! SHA-256 front end keeps the distribution uniform.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{Error, Result};

/// Read buffer size used when streaming a file through the hasher.
const CHUNK_SIZE: usize = 64 * 1024;

/// A 64-bit content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub u64);

impl ContentHash {
    /// Hash an in-memory byte slice.
    pub fn from_bytes(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(truncate(hasher))
    }

    /// Hash the full content of a file, streaming it in fixed-size chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn of_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let read = file.read(&mut buf).map_err(|e| Error::io(path, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Self(truncate(hasher)))
    }

    /// The raw integer value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for ContentHash {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Fingerprint of a single `(path, hash)` pair, used as one summand of a tree hash.
///
/// The path is hashed together with the content hash so that renaming a file
/// changes the tree hash even when its bytes do not.
pub fn entry_digest(relative_path: &str, hash: ContentHash) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(hash.0.to_be_bytes());
    truncate(hasher)
}

fn truncate(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = ContentHash::from_bytes(b"test");
        let b = ContentHash::from_bytes(b"test");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_different_hash() {
        let a = ContentHash::from_bytes(b"aaa");
        let b = ContentHash::from_bytes(b"bbb");
        assert_ne!(a, b);
    }

    #[test]
    fn content_hash_known_value() {
        // sha256("hello world") = b94d27b9934d3e08...
        let hash = ContentHash::from_bytes(b"hello world");
        assert_eq!(hash.value(), 0xb94d_27b9_934d_3e08);
        assert_eq!(hash.to_string(), "b94d27b9934d3e08");
    }

    #[test]
    fn file_hash_matches_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        let file_hash = ContentHash::of_file(&path).unwrap();
        assert_eq!(file_hash, ContentHash::from_bytes(b"hello world"));
    }

    #[test]
    fn file_hash_spanning_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let content: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(
            ContentHash::of_file(&path).unwrap(),
            ContentHash::from_bytes(&content)
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentHash::of_file(&dir.path().join("gone.txt")).unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn entry_digest_depends_on_path() {
        let hash = ContentHash::from_bytes(b"same");
        assert_ne!(entry_digest("a.txt", hash), entry_digest("b.txt", hash));
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&ContentHash(42)).unwrap();
        assert_eq!(json, "42");
    }
}
