//! SHA-256 content hashing for content-derived identifiers
//!
//! Media files can be several gigabytes, so the file is streamed through the
//! digest in fixed-size chunks instead of being read into memory.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::trace;

/// Size of each read chunk (512 KiB)
pub const CHUNK_SIZE: usize = 512 * 1024;

/// Compute the SHA-256 digest of a file's full contents
pub fn digest_file(path: &Path) -> Result<[u8; 32]> {
    let file = File::open(path).map_err(|e| Error::HashComputation {
        path: path.to_path_buf(),
        message: format!("Failed to open file: {}", e),
    })?;

    let digest = digest_reader(file).map_err(|e| Error::HashComputation {
        path: path.to_path_buf(),
        message: format!("Failed to read file: {}", e),
    })?;

    trace!(?path, "Computed content digest");
    Ok(digest)
}

/// Stream a reader through SHA-256 until it yields a zero-length read.
///
/// A zero-length read is taken as end of data even if the underlying stream
/// could produce more later. Plain files never do this before EOF, but some
/// pipe-like sources can.
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize().into())
}
