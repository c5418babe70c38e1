//! Content digests for checksums, duplicate detection and content diffs.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::FsError;

const BUF_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    #[default]
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5    => "md5",
            HashAlgorithm::Sha1   => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Length of the hex digest this algorithm produces.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5    => 32,
            HashAlgorithm::Sha1   => 40,
            HashAlgorithm::Sha256 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = FsError;

    /// Accepts `md5`, `sha1`, `sha256` in any case, with or without a dash
    /// (`SHA-256`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('-', "");
        match normalized.as_str() {
            "md5"    => Ok(HashAlgorithm::Md5),
            "sha1"   => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            _        => Err(FsError::UnsupportedHashAlgorithm(s.to_string())),
        }
    }
}

/// Stream `reader` through `algorithm` and return the lowercase hex digest.
///
/// Memory use is bounded by a fixed 64 KiB buffer regardless of input size.
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: R) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Md5    => digest_stream::<Md5, R>(reader),
        HashAlgorithm::Sha1   => digest_stream::<Sha1, R>(reader),
        HashAlgorithm::Sha256 => digest_stream::<Sha256, R>(reader),
    }
}

fn digest_stream<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_hex(&hasher.finalize()))
}

/// Digest of an in-memory buffer.
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Md5    => to_hex(&Md5::digest(data)),
        HashAlgorithm::Sha1   => to_hex(&Sha1::digest(data)),
        HashAlgorithm::Sha256 => to_hex(&Sha256::digest(data)),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Digest of the file at `path`. The file handle is closed before returning.
///
/// # Errors
/// [`FsError::NotFound`], [`FsError::PermissionDenied`] or [`FsError::Io`]
/// wrapping the failed open/read.
pub fn file_checksum(path: &Path, algorithm: HashAlgorithm) -> Result<String, FsError> {
    let file = File::open(path).map_err(|e| FsError::io("open", path, e))?;
    hash_reader(algorithm, file).map_err(|e| FsError::io("read", path, e))
}

/// Whether the file's digest equals `expected` (hex, case-insensitive).
pub fn verify_file_checksum(path: &Path, expected: &str, algorithm: HashAlgorithm) -> Result<bool, FsError> {
    let actual = file_checksum(path, algorithm)?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}
