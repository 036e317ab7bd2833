#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` computes the content digests that drive tree comparison in
//! the updelta workspace. A file's identity is its streaming MD5 digest;
//! timestamps and sizes are never consulted for change detection.
//!
//! # Design
//!
//! [`Md5`] is a thin streaming wrapper over the pure-Rust backend.
//! [`file_digest`] reads a file in fixed [`READ_CHUNK_LEN`]-byte chunks and
//! feeds each chunk into the hasher, so memory use stays constant for
//! arbitrarily large application payloads.
//!
//! # Errors
//!
//! [`file_digest`] surfaces [`DigestError`] values carrying the offending
//! path together with the underlying [`std::io::Error`], split by whether
//! the open or a read failed.

mod md5;

pub use md5::{Md5, Md5Digest};

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use logging::{DebugFlag, debug_gte, emit_debug};

/// Fixed chunk length for streaming file reads.
pub const READ_CHUNK_LEN: usize = 8192;

/// Error raised while digesting a file's content.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The file could not be opened for reading.
    #[error("failed to open {path} for digesting: {source}")]
    Open {
        /// Path of the file that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A read from the file failed partway through.
    #[error("failed to read {path} while digesting: {source}")]
    Read {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Computes the streaming MD5 digest of the file at `path`.
///
/// The file is read in [`READ_CHUNK_LEN`]-byte chunks. A zero-length file
/// yields the canonical empty-input digest.
pub fn file_digest(path: &Path) -> Result<Md5Digest, DigestError> {
    let mut file = File::open(path).map_err(|source| DigestError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Md5::new();
    let mut chunk = [0_u8; READ_CHUNK_LEN];
    loop {
        let read = file.read(&mut chunk).map_err(|source| DigestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }

    let digest = hasher.finalize();
    if debug_gte(DebugFlag::Digest, 2) {
        emit_debug(
            DebugFlag::Digest,
            2,
            format!("{} {}", digest.to_hex(), path.display()),
        );
    }
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn file_digest_matches_in_memory_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");

        // Larger than one chunk so the streaming path is exercised
        let payload: Vec<u8> = (0..READ_CHUNK_LEN * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        fs::write(&path, &payload).unwrap();

        let streamed = file_digest(&path).unwrap();
        assert_eq!(streamed, Md5::digest(&payload));
    }

    #[test]
    fn empty_file_yields_empty_input_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let digest = file_digest(&path).unwrap();
        assert_eq!(digest.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn missing_file_reports_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");

        let err = file_digest(&path).unwrap_err();
        match err {
            DigestError::Open { path: p, .. } => assert_eq!(p, path),
            DigestError::Read { .. } => panic!("expected open error"),
        }
    }
}
