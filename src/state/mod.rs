// src/state/mod.rs

//! The file-system state of an incremental build: which files are dirty per
//! target, which were deleted, and whether changes arrived mid-build.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tracing::{debug, info};

use crate::config::StateOptions;
use crate::context::CompileContext;
use crate::errors::StateResult;
use crate::fs::{FileSystem, RealFileSystem};
use crate::roots::{BuildRootDescriptor, BuildRootIndex};
use crate::storage::StampsStorage;
use crate::target::chunks::TargetChunk;
use crate::target::{BuildTarget, TargetTypeRegistry};
use crate::types::CompilationRound;

pub mod delta;
pub mod stamps;
pub(crate) mod wire;

use delta::FilesDelta;
use stamps::EventStamps;

/// Version of the persistent form. The records themselves carry no version
/// byte; the enclosing storage layer persists this constant and refuses to
/// load data written under a different one.
pub const FORMAT_VERSION: u32 = 3;

fn current_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Tracks per-target dirty and deleted files for an incremental build
/// driver.
///
/// Operations on different targets run concurrently; operations on the same
/// target serialize on that target's [`FilesDelta`] lock. Lock order is
/// fixed: the deltas map (lookup only), then a delta, then the event-stamps
/// map.
pub struct BuildFsState {
    /// When true, dirty files are always determined by scanning the
    /// filesystem; event-based tracking is never trusted.
    always_scan_fs: bool,
    fs: Arc<dyn FileSystem>,
    initial_scan_performed: Mutex<HashSet<BuildTarget>>,
    deltas: Mutex<HashMap<BuildTarget, Arc<FilesDelta>>>,
    event_stamps: EventStamps,
}

impl BuildFsState {
    pub fn new(options: StateOptions) -> Self {
        Self::with_file_system(options, Arc::new(RealFileSystem))
    }

    pub fn with_file_system(options: StateOptions, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            always_scan_fs: options.always_scan_fs,
            fs,
            initial_scan_performed: Mutex::new(HashSet::new()),
            deltas: Mutex::new(HashMap::new()),
            event_stamps: EventStamps::new(),
        }
    }

    /// The per-target delta, created on first reference.
    fn delta_for(&self, target: &BuildTarget) -> Arc<FilesDelta> {
        let mut deltas = self.deltas.lock().unwrap();
        deltas
            .entry(target.clone())
            .or_insert_with(|| Arc::new(FilesDelta::new()))
            .clone()
    }

    fn existing_delta(&self, target: &BuildTarget) -> Option<Arc<FilesDelta>> {
        let deltas = self.deltas.lock().unwrap();
        deltas.get(target).cloned()
    }

    // --- discovery & state ---------------------------------------------

    /// Declare that the initial filesystem scan for `target` has completed;
    /// from here on the state trusts change events for it.
    pub fn mark_initial_scan_performed(&self, target: &BuildTarget) {
        let mut scanned = self.initial_scan_performed.lock().unwrap();
        scanned.insert(target.clone());
    }

    pub fn is_initial_scan_performed(&self, target: &BuildTarget) -> bool {
        if self.always_scan_fs {
            return false;
        }
        let scanned = self.initial_scan_performed.lock().unwrap();
        scanned.contains(target)
    }

    /// True when `target` still needs attention: it was never scanned, or
    /// its delta holds pending changes.
    pub fn has_work_to_do(&self, target: &BuildTarget) -> bool {
        {
            let scanned = self.initial_scan_performed.lock().unwrap();
            if !scanned.contains(target) {
                return true;
            }
        }
        self.existing_delta(target)
            .map(|delta| delta.has_changes())
            .unwrap_or(false)
    }

    /// Drop everything: deltas, scan records, event stamps.
    pub fn clear_all(&self) {
        self.clear_context_round_data(None);
        self.clear_context_chunk(None);
        self.initial_scan_performed.lock().unwrap().clear();
        self.deltas.lock().unwrap().clear();
        self.event_stamps.clear();
    }

    /// When the dirty-notification for `file` was last recorded, or 0.
    pub fn event_registration_stamp(&self, file: &Path) -> i64 {
        self.event_stamps.get(file)
    }

    // --- marking dirty --------------------------------------------------

    /// Mark `file` dirty under `root`, aimed at the next round.
    ///
    /// Returns true iff the per-target delta did not already hold the entry.
    /// A mark made during a chunk build only becomes visible to builders on
    /// the next compilation round.
    pub fn mark_dirty(
        &self,
        context: Option<&CompileContext>,
        file: &Path,
        root: &Arc<BuildRootDescriptor>,
        stamps: Option<&dyn StampsStorage>,
        save_event_stamp: bool,
    ) -> Result<bool> {
        self.mark_dirty_in_round(
            context,
            CompilationRound::Next,
            file,
            root,
            stamps,
            save_event_stamp,
        )
    }

    /// Mark `file` dirty under `root`, aimed at the given round.
    pub fn mark_dirty_in_round(
        &self,
        context: Option<&CompileContext>,
        round: CompilationRound,
        file: &Path,
        root: &Arc<BuildRootDescriptor>,
        stamps: Option<&dyn StampsStorage>,
        save_event_stamp: bool,
    ) -> Result<bool> {
        if let Some(round_delta) = round_delta(context, round) {
            if in_context_targets(context, root) {
                // the per-target delta below is the authoritative "newly
                // dirty" signal; overlay duplicates are not reported
                round_delta.lock().mark_recompile(root, file);
            }
        }

        let delta = self.delta_for(root.target());
        let mut guard = delta.lock();
        let marked = guard.mark_recompile(root, file);
        if marked {
            debug!(build_target = %root.target(), file = ?file, "marked dirty");
            if save_event_stamp {
                self.event_stamps.put(file, current_time_millis());
            }
            if let Some(stamps) = stamps {
                stamps.remove_stamp(file, root.target())?;
            }
        } else {
            debug!(build_target = %root.target(), file = ?file, "not marked dirty (already pending)");
        }
        Ok(marked)
    }

    /// Like [`mark_dirty_in_round`], but a no-op while the file's path sits
    /// in the target's deleted set. Does not record an event stamp.
    ///
    /// [`mark_dirty_in_round`]: BuildFsState::mark_dirty_in_round
    pub fn mark_dirty_if_not_deleted(
        &self,
        context: Option<&CompileContext>,
        round: CompilationRound,
        file: &Path,
        root: &Arc<BuildRootDescriptor>,
        stamps: Option<&dyn StampsStorage>,
    ) -> Result<bool> {
        let delta = self.delta_for(root.target());
        let marked = delta.lock().mark_recompile_if_not_deleted(root, file);
        if marked {
            if let Some(stamps) = stamps {
                stamps.remove_stamp(file, root.target())?;
            }
            if let Some(round_delta) = round_delta(context, round) {
                if in_context_targets(context, root) {
                    round_delta.lock().mark_recompile(root, file);
                }
            }
        }
        Ok(marked)
    }

    // --- deletions ------------------------------------------------------

    /// Record `file` as deleted for `target`. The deletion lands in both
    /// round overlays when present (the chunk-targets gate does not apply
    /// to deletions) and in the per-target delta.
    pub fn register_deleted(
        &self,
        context: Option<&CompileContext>,
        target: &BuildTarget,
        file: &Path,
        stamps: Option<&dyn StampsStorage>,
    ) -> Result<()> {
        for round in [CompilationRound::Current, CompilationRound::Next] {
            if let Some(round_delta) = round_delta(context, round) {
                round_delta.lock().add_deleted(file);
            }
        }
        let delta = self.delta_for(target);
        delta.lock().add_deleted(file);
        if let Some(stamps) = stamps {
            stamps.remove_stamp(file, target)?;
        }
        Ok(())
    }

    pub fn clear_deleted_paths(&self, target: &BuildTarget) {
        if let Some(delta) = self.existing_delta(target) {
            delta.lock().clear_deleted_paths();
        }
    }

    pub fn get_and_clear_deleted_paths(&self, target: &BuildTarget) -> Vec<String> {
        match self.existing_delta(target) {
            Some(delta) => delta.lock().get_and_clear_deleted_paths(),
            None => Vec::new(),
        }
    }

    /// Drop the pending dirty set of one root.
    pub fn clear_recompile(&self, root: &Arc<BuildRootDescriptor>) {
        let delta = self.delta_for(root.target());
        delta.lock().clear_recompile(root);
    }

    // --- round overlay lifecycle ---------------------------------------

    /// Record which targets the chunk being built consists of; marks for
    /// other targets stay out of the round overlays.
    pub fn before_chunk_build_start(&self, context: &CompileContext, chunk: &TargetChunk) {
        context.set_chunk_targets(Some(chunk.targets().iter().cloned().collect()));
    }

    /// Rotate the round overlays: the previous next-round delta (or, on the
    /// initial round, a snapshot merge of the chunk's module-target deltas)
    /// becomes current, and a fresh empty delta becomes next.
    pub fn before_next_round_start(&self, context: &CompileContext, chunk: &TargetChunk) {
        let current = match context.round_delta(CompilationRound::Next) {
            Some(prev_next) => prev_next,
            None => {
                // initial round: snapshot the per-target state so every
                // builder in the chain sees the same picture
                let sources: Vec<Arc<FilesDelta>> = chunk
                    .module_targets()
                    .map(|target| self.delta_for(target))
                    .collect();
                Arc::new(FilesDelta::merged(sources.iter().map(|d| d.as_ref())))
            }
        };
        context.set_round_delta(CompilationRound::Current, Some(current));
        context.set_round_delta(
            CompilationRound::Next,
            Some(Arc::new(FilesDelta::new())),
        );
    }

    pub fn clear_context_round_data(&self, context: Option<&CompileContext>) {
        if let Some(context) = context {
            context.set_round_delta(CompilationRound::Next, None);
            context.set_round_delta(CompilationRound::Current, None);
        }
    }

    pub fn clear_context_chunk(&self, context: Option<&CompileContext>) {
        if let Some(context) = context {
            context.set_chunk_targets(None);
        }
    }

    /// The delta reads for `target` should go through: the current-round
    /// overlay while one is active and the target is module-based, else the
    /// per-target delta.
    pub fn get_effective_files_delta(
        &self,
        context: &CompileContext,
        target: &BuildTarget,
    ) -> Arc<FilesDelta> {
        if target.is_module() {
            // multiple compilation rounds apply to module targets only
            if let Some(delta) = context.round_delta(CompilationRound::Current) {
                return delta;
            }
        }
        self.delta_for(target)
    }

    pub fn is_marked_for_recompilation(
        &self,
        context: Option<&CompileContext>,
        round: CompilationRound,
        root: &Arc<BuildRootDescriptor>,
        file: &Path,
    ) -> bool {
        let delta = round_delta(context, round).unwrap_or_else(|| self.delta_for(root.target()));
        let guard = delta.lock();
        guard.is_marked_recompile(root, file)
    }

    // --- iteration ------------------------------------------------------

    /// Visit every in-scope dirty file of `target`. The processor returning
    /// false stops the walk; the return value is false iff it did.
    pub fn process_files_to_recompile<F>(
        &self,
        context: &CompileContext,
        target: &BuildTarget,
        mut processor: F,
    ) -> Result<bool>
    where
        F: FnMut(&BuildTarget, &Path, &Arc<BuildRootDescriptor>) -> Result<bool>,
    {
        let scope = context.scope();
        let delta = self.get_effective_files_delta(context, target);
        let guard = delta.lock();
        for (root, files) in guard.sources_to_recompile() {
            if root.target() != target {
                // merged round deltas can carry roots of peer targets from
                // a module cycle
                continue;
            }
            for file in files {
                if !scope.is_affected(target, file) {
                    continue;
                }
                if !processor(target, file, root)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    // --- reconciling after a build -------------------------------------

    /// Commit the dirty set of `root` as built: save a stamp for every file
    /// the build actually covered, and keep (re-mark) the ones it did not,
    /// namely files outside the compile scope and files modified (or
    /// reported modified) after compilation of the target started.
    ///
    /// Returns true iff at least one file was committed as clean.
    pub fn mark_all_up_to_date(
        &self,
        context: &CompileContext,
        root: &Arc<BuildRootDescriptor>,
        stamps: &dyn StampsStorage,
    ) -> Result<bool> {
        let target = root.target();
        let delta = self.delta_for(target);
        let build_start = context.compilation_start_stamp(target);
        let scope = context.scope();

        let mut marked = false;
        // holds off concurrent marks from external FS events
        let mut guard = delta.lock();
        let files = match guard.clear_recompile(root) {
            Some(files) => files,
            None => return Ok(false),
        };
        for file in files {
            if scope.is_affected(target, &file) {
                let current_ts = self.fs.last_modified(&file)?;
                let stamp = stamps.current_stamp(&file)?;
                if !root.is_generated()
                    && (current_ts > build_start || self.event_stamps.get(&file) > build_start)
                {
                    // The file changed after compilation started, or a
                    // change event for it was delivered after; committing
                    // the stamp would hide that change.
                    debug!(build_target = %target, file = ?file, "modified after build start; keeping dirty");
                    guard.mark_recompile(root, &file);
                } else {
                    stamps.save_stamp(&file, target, stamp)?;
                    marked = true;
                }
            } else {
                debug!(build_target = %target, file = ?file, "outside compile scope; keeping dirty");
                guard.mark_recompile(root, &file);
            }
        }
        Ok(marked)
    }

    /// True iff changed files were reported for `target` after its
    /// compilation started in this build invocation.
    ///
    /// Files reachable through a generated root are ignored (they are
    /// outputs of this very build), and so are mtimes from the future
    /// (clock skew).
    pub fn has_unprocessed_changes(
        &self,
        context: &CompileContext,
        target: &BuildTarget,
    ) -> Result<bool> {
        {
            let scanned = self.initial_scan_performed.lock().unwrap();
            if !scanned.contains(target) {
                return Ok(false);
            }
        }
        let delta = match self.existing_delta(target) {
            Some(delta) => delta,
            None => return Ok(false),
        };
        let build_start = context.compilation_start_stamp(target);
        if build_start <= 0 {
            return Ok(false);
        }

        let scope = context.scope();
        let root_index = context.root_index();
        let guard = delta.lock();
        let now = current_time_millis();
        for files in guard.sources_to_recompile().values() {
            'files: for file in files {
                let event_stamp = self.event_stamps.get(file);
                let hit = if event_stamp > build_start {
                    true
                } else {
                    let file_stamp = self.fs.last_modified(file)?;
                    file_stamp > build_start && file_stamp < now
                };
                if !hit || !scope.is_affected(target, file) {
                    continue;
                }
                for rd in root_index.find_all_parent_descriptors(file, Some(context)) {
                    if rd.is_generated() {
                        continue 'files;
                    }
                }
                debug!(
                    build_target = %target,
                    file = ?file,
                    build_start,
                    event_stamp,
                    "unprocessed changes detected"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    // --- persistence ----------------------------------------------------

    /// Write every scanned target's delta, grouped by target type.
    pub fn save(&self, out: &mut dyn Write) -> StateResult<()> {
        let targets_by_type: BTreeMap<String, Vec<BuildTarget>> = {
            let scanned = self.initial_scan_performed.lock().unwrap();
            let mut map: BTreeMap<String, Vec<BuildTarget>> = BTreeMap::new();
            for target in scanned.iter() {
                map.entry(target.type_id().to_string())
                    .or_default()
                    .push(target.clone());
            }
            map
        };

        wire::write_len(out, targets_by_type.len())?;
        for (type_id, mut targets) in targets_by_type {
            targets.sort_by(|a, b| a.id().cmp(b.id()));
            wire::write_str(out, &type_id)?;
            wire::write_len(out, targets.len())?;
            for target in targets {
                wire::write_str(out, target.id())?;
                let delta = self.delta_for(&target);
                let guard = delta.lock();
                guard.save(out)?;
            }
        }
        Ok(())
    }

    /// Read state written by [`save`]. Targets whose type or id no longer
    /// resolve are logged and skipped; everything else is restored and
    /// re-marked as initially scanned.
    ///
    /// [`save`]: BuildFsState::save
    pub fn load(
        &self,
        input: &mut dyn Read,
        registry: &dyn TargetTypeRegistry,
        root_index: &dyn BuildRootIndex,
    ) -> StateResult<()> {
        let num_types = wire::read_u32(input)?;
        for _ in 0..num_types {
            let type_id = wire::read_str(input)?;
            let loader = registry.create_loader(&type_id);
            let num_targets = wire::read_u32(input)?;
            for _ in 0..num_targets {
                let target_id = wire::read_str(input)?;
                match loader.as_ref().and_then(|l| l.create_target(&target_id)) {
                    Some(target) => {
                        let delta = self.delta_for(&target);
                        delta.lock().load(input, &target, root_index)?;
                        self.initial_scan_performed.lock().unwrap().insert(target);
                    }
                    None => {
                        info!(
                            type_id = %type_id,
                            target_id = %target_id,
                            "skipping unknown target in saved build state"
                        );
                        FilesDelta::skip(input)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn round_delta(
    context: Option<&CompileContext>,
    round: CompilationRound,
) -> Option<Arc<FilesDelta>> {
    context.and_then(|c| c.round_delta(round))
}

fn in_context_targets(context: Option<&CompileContext>, root: &BuildRootDescriptor) -> bool {
    match context {
        Some(context) => context.is_in_chunk_targets(root.target()),
        None => false,
    }
}
