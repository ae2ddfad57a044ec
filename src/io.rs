//! File reading utilities.
//!
//! Small files are read directly; files past a threshold are memory-mapped.
//! Also hosts the binary-content sniff used by discovery.

// Memory mapping requires unsafe but is read-only here.
#![allow(unsafe_code)]

use crate::error::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Threshold for using memory mapping (1 MB).
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// How many leading bytes the binary sniff inspects.
const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Reads a file's bytes, memory-mapping past [`MMAP_THRESHOLD`].
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let io_err = |e: std::io::Error| Error::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let file = File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();

    if size >= MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;
        Ok(mmap.to_vec())
    } else {
        let mut buf = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        let mut file = file;
        file.read_to_end(&mut buf).map_err(io_err)?;
        Ok(buf)
    }
}

/// Returns true when the content looks binary: a NUL byte anywhere in the
/// first 8 KB.
#[must_use]
pub fn is_binary(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    window.contains(&0)
}

/// Writes a string to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`Error::Io`] if directory creation or the write fails.
pub fn write_string(path: &Path, content: &str) -> Result<()> {
    let io_err = |e: std::io::Error| Error::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, content).map_err(io_err)
}
