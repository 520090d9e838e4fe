// src/context.rs

//! Compile context: per-build-invocation data the state layer reads and
//! annotates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::roots::BuildRootIndex;
use crate::scope::CompileScope;
use crate::state::delta::FilesDelta;
use crate::target::BuildTarget;
use crate::types::CompilationRound;

/// Slots the state layer attaches to a context while a chunk is being
/// built. The context owns the slots; the state decides what lives in them.
#[derive(Default)]
struct ContextSlots {
    current_round_delta: Option<Arc<FilesDelta>>,
    next_round_delta: Option<Arc<FilesDelta>>,
    chunk_targets: Option<HashSet<BuildTarget>>,
}

/// One build invocation's context: the compile scope, the root index, the
/// per-target compilation start stamps, and the round-overlay slots.
pub struct CompileContext {
    scope: Arc<dyn CompileScope>,
    root_index: Arc<dyn BuildRootIndex>,
    start_stamps: Mutex<HashMap<BuildTarget, i64>>,
    slots: Mutex<ContextSlots>,
}

impl CompileContext {
    pub fn new(scope: Arc<dyn CompileScope>, root_index: Arc<dyn BuildRootIndex>) -> Self {
        Self {
            scope,
            root_index,
            start_stamps: Mutex::new(HashMap::new()),
            slots: Mutex::new(ContextSlots::default()),
        }
    }

    pub fn scope(&self) -> &dyn CompileScope {
        self.scope.as_ref()
    }

    pub fn root_index(&self) -> &dyn BuildRootIndex {
        self.root_index.as_ref()
    }

    /// Wall-clock millis at which compilation of `target` began in this
    /// invocation; 0 or less means no build is in progress for it.
    pub fn compilation_start_stamp(&self, target: &BuildTarget) -> i64 {
        let stamps = self.start_stamps.lock().unwrap();
        stamps.get(target).copied().unwrap_or(0)
    }

    pub fn set_compilation_start_stamp(&self, target: &BuildTarget, millis: i64) {
        let mut stamps = self.start_stamps.lock().unwrap();
        stamps.insert(target.clone(), millis);
    }

    pub(crate) fn round_delta(&self, round: CompilationRound) -> Option<Arc<FilesDelta>> {
        let slots = self.slots.lock().unwrap();
        match round {
            CompilationRound::Current => slots.current_round_delta.clone(),
            CompilationRound::Next => slots.next_round_delta.clone(),
        }
    }

    pub(crate) fn set_round_delta(&self, round: CompilationRound, delta: Option<Arc<FilesDelta>>) {
        let mut slots = self.slots.lock().unwrap();
        match round {
            CompilationRound::Current => slots.current_round_delta = delta,
            CompilationRound::Next => slots.next_round_delta = delta,
        }
    }

    pub(crate) fn set_chunk_targets(&self, targets: Option<HashSet<BuildTarget>>) {
        let mut slots = self.slots.lock().unwrap();
        slots.chunk_targets = targets;
    }

    pub(crate) fn is_in_chunk_targets(&self, target: &BuildTarget) -> bool {
        let slots = self.slots.lock().unwrap();
        slots
            .chunk_targets
            .as_ref()
            .map(|targets| targets.contains(target))
            .unwrap_or(false)
    }
}
