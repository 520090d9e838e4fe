// src/lib.rs

//! Per-target dirty-file state tracking for incremental build drivers.
//!
//! The crate answers three questions repeatedly and cheaply: which files of
//! a build target are dirty right now, which files were deleted since the
//! last build, and whether new filesystem changes arrived while a build was
//! already running. [`BuildFsState`] is the entry point; change events come
//! in through [`BuildFsState::mark_dirty`] and
//! [`BuildFsState::register_deleted`], the compilation driver reads through
//! [`BuildFsState::process_files_to_recompile`] and commits results with
//! [`BuildFsState::mark_all_up_to_date`], and the whole state persists
//! across runs via [`BuildFsState::save`] / [`BuildFsState::load`].
//!
//! The target model, root index, compile scope and stamp store are consumed
//! through the traits in [`target`], [`roots`], [`scope`] and [`storage`];
//! one plain implementation of each ships alongside the trait.

pub mod config;
pub mod context;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod roots;
pub mod scope;
pub mod state;
pub mod storage;
pub mod target;
pub mod types;

pub use config::StateOptions;
pub use context::CompileContext;
pub use errors::{StateError, StateResult};
pub use fs::{FileSystem, RealFileSystem};
pub use roots::{BuildRootDescriptor, BuildRootIndex, StaticRootIndex};
pub use scope::{CompileScope, PatternScope, ScopePatterns};
pub use state::delta::FilesDelta;
pub use state::{BuildFsState, FORMAT_VERSION};
pub use storage::{Stamp, StampsStorage, TimestampStorage};
pub use target::chunks::{compute_chunks, TargetChunk};
pub use target::{BuildTarget, StaticTargetRegistry, TargetLoader, TargetTypeRegistry};
pub use types::{CompilationRound, TargetKind};
