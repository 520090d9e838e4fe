// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};

pub mod mock;

/// The slice of the filesystem the state layer depends on.
///
/// Kept to a single call so tests can substitute deterministic timestamps;
/// everything else the crate does goes through caller-supplied readers and
/// writers.
pub trait FileSystem: Send + Sync + Debug {
    /// Last-modified time of `path` in milliseconds since the epoch.
    ///
    /// Returns 0 for paths that do not exist; any other failure propagates.
    fn last_modified(&self, path: &Path) -> Result<i64>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn last_modified(&self, path: &Path) -> Result<i64> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| format!("reading metadata of {:?}", path));
            }
        };

        let modified = metadata
            .modified()
            .with_context(|| format!("reading mtime of {:?}", path))?;

        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Ok(millis)
    }
}
