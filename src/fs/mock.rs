// src/fs/mock.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::FileSystem;

/// In-memory [`FileSystem`] with caller-controlled timestamps.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    mtimes: Arc<Mutex<HashMap<PathBuf, i64>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mtime reported for `path`, in millis since the epoch.
    pub fn set_last_modified(&self, path: impl AsRef<Path>, millis: i64) {
        let mut mtimes = self.mtimes.lock().unwrap();
        mtimes.insert(path.as_ref().to_path_buf(), millis);
    }

    /// Forget `path`; subsequent lookups report 0, as for a missing file.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut mtimes = self.mtimes.lock().unwrap();
        mtimes.remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn last_modified(&self, path: &Path) -> Result<i64> {
        let mtimes = self.mtimes.lock().unwrap();
        Ok(mtimes.get(path).copied().unwrap_or(0))
    }
}
