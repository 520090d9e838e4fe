// src/types.rs

//! Shared enums used across the state layer.

/// Which round of a chunk compilation a mark is aimed at.
///
/// - `Current`: the mark should be visible to the builders still running in
///   this round.
/// - `Next`: the mark is collected for the following round (default for
///   externally reported changes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilationRound {
    Current,
    Next,
}

/// Coarse classification of a build target.
///
/// Only module targets participate in multi-round compilation; everything
/// else (artifacts, resource copiers, ...) is compiled in a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Module,
    Other,
}

impl TargetKind {
    pub fn is_module(self) -> bool {
        matches!(self, TargetKind::Module)
    }
}
