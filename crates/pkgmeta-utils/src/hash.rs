//! Content fingerprints.
//!
//! The digest is fixed to SHA-256. Stored fingerprints depend on it, so
//! changing the algorithm is a breaking change.

use std::{
    fs::File,
    io::{ErrorKind, Read},
    path::Path,
};

use sha2::{Digest, Sha256};

use crate::error::{HashError, HashResult};

/// Default read size used when streaming content through the digest.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Length in bytes of a SHA-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Result of hashing a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub digest: [u8; DIGEST_LEN],
    /// Number of bytes consumed from the stream.
    pub len: u64,
}

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Incremental SHA-256 over a byte stream that also counts what it saw.
#[derive(Default, Clone)]
pub struct StreamHasher {
    inner: Sha256,
    len: u64,
}

impl StreamHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.len += data.len() as u64;
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn finalize(self) -> Fingerprint {
        Fingerprint {
            digest: self.inner.finalize().into(),
            len: self.len,
        }
    }
}

/// Streams `reader` to EOF through SHA-256 using reads of at most
/// `chunk_size` bytes. Memory use does not depend on the stream length.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the reader fails before EOF.
///   Interrupted reads are retried.
pub fn hash_reader<R: Read>(mut reader: R, chunk_size: usize) -> HashResult<Fingerprint> {
    let mut hasher = StreamHasher::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(HashError::ReadFailed {
                    offset: hasher.len(),
                    source: err,
                })
            }
        }
    }

    Ok(hasher.finalize())
}

/// Calculates the hex-encoded SHA-256 checksum of a file.
///
/// # Example
///
/// ```no_run
/// use pkgmeta_utils::error::HashResult;
/// use pkgmeta_utils::hash::calculate_checksum;
///
/// fn main() -> HashResult<()> {
///     let checksum = calculate_checksum("/path/to/installer.msi")?;
///     println!("Checksum is {}", checksum);
///     Ok(())
/// }
/// ```
pub fn calculate_checksum<P: AsRef<Path>>(file_path: P) -> HashResult<String> {
    let file_path = file_path.as_ref();
    let file = File::open(file_path).map_err(|err| {
        HashError::OpenFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    })?;
    Ok(hash_reader(file, DEFAULT_CHUNK_SIZE)?.to_hex())
}

/// Compares the checksum of a file case-insensitively against `expected`.
pub fn verify_checksum<P: AsRef<Path>>(file_path: P, expected: &str) -> HashResult<bool> {
    let actual = calculate_checksum(file_path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}
