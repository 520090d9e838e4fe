// src/state/stamps.rs

//! Event stamps: when a dirty-notification for a file was last recorded.
//!
//! A change event may describe a modification that physically happened
//! before a build started but was only delivered afterwards; the file's
//! mtime cannot expose that, so the delivery time is tracked separately.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Process-wide file → dirty-event wall-clock millis map under its own
/// mutex. The most recent write wins.
#[derive(Debug, Default)]
pub struct EventStamps {
    stamps: Mutex<HashMap<PathBuf, i64>>,
}

impl EventStamps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, file: &Path, stamp: i64) {
        let mut stamps = self.stamps.lock().unwrap();
        stamps.insert(file.to_path_buf(), stamp);
    }

    /// Stored stamp for `file`, or 0 if none was recorded.
    pub fn get(&self, file: &Path) -> i64 {
        let stamps = self.stamps.lock().unwrap();
        stamps.get(file).copied().unwrap_or(0)
    }

    pub fn clear(&self) {
        let mut stamps = self.stamps.lock().unwrap();
        stamps.clear();
    }
}
