//! Streaming SHA-512 content hashing, used by the ABI engine, the status
//! database's listfile verification, and the cache's archive integrity
//! checks.

use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha512};

use crate::error::Error;
use crate::Result;

/// A lowercase-hex SHA-512 digest.
pub type Sha512Digest = String;

/// Incremental SHA-512 hasher, used when the input arrives in chunks (e.g.
/// while serializing the ABI combining-rule key/value stream).
#[derive(Default)]
pub struct ContentHasher {
    inner: Sha512,
}

impl ContentHasher {
    /// Start a new hash.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes into the running hash.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.update(bytes);
        self
    }

    /// Finish and return the lowercase-hex digest.
    #[must_use]
    pub fn finish(self) -> Sha512Digest {
        hex::encode(self.inner.finalize())
    }
}

/// Hash a byte slice directly.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> Sha512Digest {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a file's contents, streaming in bounded chunks so large archives
/// never need to be held fully in memory.
pub fn hash_file(path: &Path) -> Result<Sha512Digest> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(path, e)),
        };
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_bytes_is_stable() {
        let a = hash_bytes(b"hello world");
        let b = hash_bytes(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 128); // 512 bits of hex
    }

    #[test]
    fn incremental_hash_matches_bulk_hash() {
        let bulk = hash_bytes(b"hello world");
        let mut incremental = ContentHasher::new();
        incremental.update(b"hello ").update(b"world");
        assert_eq!(bulk, incremental.finish());
    }
}
