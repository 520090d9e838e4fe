// src/state/delta.rs

//! Per-target record of dirty and deleted files.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::errors::StateResult;
use crate::roots::{BuildRootDescriptor, BuildRootIndex};
use crate::state::wire;
use crate::target::BuildTarget;

/// Path comparison is verbatim and case-sensitive; the deleted set stores
/// the same representation the recompile keys use.
fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[derive(Debug, Default)]
struct DeltaState {
    recompile: HashMap<Arc<BuildRootDescriptor>, HashSet<PathBuf>>,
    deleted: HashSet<String>,
}

/// Dirty source files for one target, grouped by build root, plus the set
/// of paths deleted since the last build.
///
/// All reads and mutations go through the guard returned by [`lock`]; the
/// mutex is non-reentrant, so callers must not take it twice on one thread.
///
/// [`lock`]: FilesDelta::lock
#[derive(Debug, Default)]
pub struct FilesDelta {
    state: Mutex<DeltaState>,
}

impl FilesDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot-merge several deltas into a fresh one (used when a module
    /// cycle compiles as a single chunk). The result shares no mutable
    /// state with the inputs.
    pub fn merged<'a>(sources: impl IntoIterator<Item = &'a FilesDelta>) -> Self {
        let mut state = DeltaState::default();
        for source in sources {
            let src = source.state.lock().unwrap();
            for (root, files) in &src.recompile {
                state
                    .recompile
                    .entry(root.clone())
                    .or_default()
                    .extend(files.iter().cloned());
            }
            state.deleted.extend(src.deleted.iter().cloned());
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Acquire this delta's lock. Held for the duration of any iteration
    /// over [`DeltaGuard::sources_to_recompile`] and for compound
    /// clear-then-remark sequences.
    pub fn lock(&self) -> DeltaGuard<'_> {
        DeltaGuard {
            state: self.state.lock().unwrap(),
        }
    }

    /// True iff any dirty or deleted entry is pending.
    pub fn has_changes(&self) -> bool {
        self.lock().has_changes()
    }

    /// Consume one persisted delta record without materialising entities.
    pub fn skip(input: &mut dyn Read) -> StateResult<()> {
        let num_roots = wire::read_u32(input)?;
        for _ in 0..num_roots {
            let _root_id = wire::read_u32(input)?;
            let num_files = wire::read_u32(input)?;
            for _ in 0..num_files {
                wire::skip_str(input)?;
            }
        }
        let num_deleted = wire::read_u32(input)?;
        for _ in 0..num_deleted {
            wire::skip_str(input)?;
        }
        Ok(())
    }
}

/// Exclusive view of a [`FilesDelta`]'s contents.
pub struct DeltaGuard<'a> {
    state: MutexGuard<'a, DeltaState>,
}

impl DeltaGuard<'_> {
    /// Insert `file` into the dirty set of `root`. Returns true iff the
    /// entry was not already present.
    pub fn mark_recompile(&mut self, root: &Arc<BuildRootDescriptor>, file: &Path) -> bool {
        self.state
            .recompile
            .entry(root.clone())
            .or_default()
            .insert(file.to_path_buf())
    }

    /// Like [`mark_recompile`], but a no-op returning false while the
    /// file's path sits in the deleted set: a deletion subsumes any pending
    /// dirty mark until cleared.
    ///
    /// [`mark_recompile`]: DeltaGuard::mark_recompile
    pub fn mark_recompile_if_not_deleted(
        &mut self,
        root: &Arc<BuildRootDescriptor>,
        file: &Path,
    ) -> bool {
        if self.state.deleted.contains(&path_str(file)) {
            return false;
        }
        self.mark_recompile(root, file)
    }

    /// Record `file` as deleted and drop it from every per-root dirty set.
    pub fn add_deleted(&mut self, file: &Path) {
        self.state.deleted.insert(path_str(file));
        for files in self.state.recompile.values_mut() {
            files.remove(file);
        }
    }

    /// Atomically remove and return the dirty set of `root`.
    pub fn clear_recompile(&mut self, root: &Arc<BuildRootDescriptor>) -> Option<HashSet<PathBuf>> {
        self.state.recompile.remove(root)
    }

    pub fn clear_deleted_paths(&mut self) {
        self.state.deleted.clear();
    }

    /// Snapshot-and-clear the deleted set.
    pub fn get_and_clear_deleted_paths(&mut self) -> Vec<String> {
        self.state.deleted.drain().collect()
    }

    pub fn is_marked_recompile(&self, root: &Arc<BuildRootDescriptor>, file: &Path) -> bool {
        self.state
            .recompile
            .get(root)
            .map(|files| files.contains(file))
            .unwrap_or(false)
    }

    /// The dirty map. Valid for as long as this guard lives.
    pub fn sources_to_recompile(&self) -> &HashMap<Arc<BuildRootDescriptor>, HashSet<PathBuf>> {
        &self.state.recompile
    }

    pub fn deleted_paths(&self) -> &HashSet<String> {
        &self.state.deleted
    }

    pub fn has_changes(&self) -> bool {
        !self.state.recompile.is_empty() || !self.state.deleted.is_empty()
    }

    /// Write this delta's contents. Roots and files are emitted in sorted
    /// order so identical states produce identical bytes.
    pub fn save(&self, out: &mut dyn Write) -> StateResult<()> {
        let mut roots: Vec<(&Arc<BuildRootDescriptor>, &HashSet<PathBuf>)> =
            self.state.recompile.iter().collect();
        roots.sort_by_key(|(rd, _)| rd.root_id());

        wire::write_len(out, roots.len())?;
        for (rd, files) in roots {
            wire::write_u32(out, rd.root_id())?;
            wire::write_len(out, files.len())?;
            let mut paths: Vec<String> = files.iter().map(|p| path_str(p)).collect();
            paths.sort();
            for path in &paths {
                wire::write_str(out, path)?;
            }
        }

        let mut deleted: Vec<&String> = self.state.deleted.iter().collect();
        deleted.sort();
        wire::write_len(out, deleted.len())?;
        for path in deleted {
            wire::write_str(out, path)?;
        }
        Ok(())
    }

    /// Read one persisted delta record into this delta. Roots that no
    /// longer resolve in the index are consumed and dropped.
    pub fn load(
        &mut self,
        input: &mut dyn Read,
        target: &BuildTarget,
        root_index: &dyn BuildRootIndex,
    ) -> StateResult<()> {
        let num_roots = wire::read_u32(input)?;
        for _ in 0..num_roots {
            let root_id = wire::read_u32(input)?;
            let num_files = wire::read_u32(input)?;
            match root_index.find_root(target, root_id) {
                Some(rd) => {
                    let files = self.state.recompile.entry(rd).or_default();
                    for _ in 0..num_files {
                        files.insert(PathBuf::from(wire::read_str(input)?));
                    }
                }
                None => {
                    debug!(
                        build_target = %target,
                        root_id,
                        "dropping persisted dirty files for unresolved root"
                    );
                    for _ in 0..num_files {
                        wire::skip_str(input)?;
                    }
                }
            }
        }

        let num_deleted = wire::read_u32(input)?;
        for _ in 0..num_deleted {
            self.state.deleted.insert(wire::read_str(input)?);
        }
        Ok(())
    }
}
