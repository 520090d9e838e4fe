// src/storage.rs

//! Stamp storage: the fingerprint database consulted when files are marked
//! clean after a successful build.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::target::BuildTarget;

/// A fingerprint attributed to a file at some point in time.
///
/// This crate only moves stamps between the filesystem and the store; it
/// never interprets the value beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    millis: i64,
}

impl Stamp {
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn as_millis(self) -> i64 {
        self.millis
    }
}

/// Fingerprint database keyed by `(file, target)`.
pub trait StampsStorage: Send + Sync {
    /// Record `stamp` as the last-built fingerprint of `file` for `target`.
    fn save_stamp(&self, file: &Path, target: &BuildTarget, stamp: Stamp) -> Result<()>;

    /// Forget the fingerprint, so the next comparison sees the file as
    /// changed.
    fn remove_stamp(&self, file: &Path, target: &BuildTarget) -> Result<()>;

    /// The file's present fingerprint, read from the filesystem.
    fn current_stamp(&self, file: &Path) -> Result<Stamp>;
}

/// In-memory [`StampsStorage`] whose fingerprints are file mtimes.
#[derive(Debug)]
pub struct TimestampStorage {
    fs: Arc<dyn FileSystem>,
    stamps: Mutex<HashMap<(PathBuf, BuildTarget), Stamp>>,
}

impl TimestampStorage {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            stamps: Mutex::new(HashMap::new()),
        }
    }

    /// The stamp last saved for `(file, target)`, if any.
    pub fn saved_stamp(&self, file: &Path, target: &BuildTarget) -> Option<Stamp> {
        let stamps = self.stamps.lock().unwrap();
        stamps.get(&(file.to_path_buf(), target.clone())).copied()
    }
}

impl StampsStorage for TimestampStorage {
    fn save_stamp(&self, file: &Path, target: &BuildTarget, stamp: Stamp) -> Result<()> {
        let mut stamps = self.stamps.lock().unwrap();
        stamps.insert((file.to_path_buf(), target.clone()), stamp);
        debug!(file = ?file, build_target = %target, stamp = stamp.as_millis(), "saved stamp");
        Ok(())
    }

    fn remove_stamp(&self, file: &Path, target: &BuildTarget) -> Result<()> {
        let mut stamps = self.stamps.lock().unwrap();
        if stamps.remove(&(file.to_path_buf(), target.clone())).is_some() {
            debug!(file = ?file, build_target = %target, "removed stamp");
        }
        Ok(())
    }

    fn current_stamp(&self, file: &Path) -> Result<Stamp> {
        Ok(Stamp::from_millis(self.fs.last_modified(file)?))
    }
}
