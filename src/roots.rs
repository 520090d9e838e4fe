// src/roots.rs

//! Build root descriptors and the index resolving files to the roots that
//! contain them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::CompileContext;
use crate::target::BuildTarget;

/// A directory associated with a target, containing source files.
///
/// `root_id` is a stable integer assigned by the root index within the
/// owning target; it is what the persistent form records, so it must not
/// change between runs as long as the root exists. Generated roots hold
/// outputs of earlier build steps rather than user sources.
#[derive(Debug, Clone)]
pub struct BuildRootDescriptor {
    root_id: u32,
    target: BuildTarget,
    path: PathBuf,
    generated: bool,
}

impl BuildRootDescriptor {
    pub fn new(
        root_id: u32,
        target: BuildTarget,
        path: impl Into<PathBuf>,
        generated: bool,
    ) -> Self {
        Self {
            root_id,
            target,
            path: path.into(),
            generated,
        }
    }

    pub fn root_id(&self) -> u32 {
        self.root_id
    }

    pub fn target(&self) -> &BuildTarget {
        &self.target
    }

    /// Directory this root covers.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

impl PartialEq for BuildRootDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.root_id == other.root_id && self.target == other.target
    }
}

impl Eq for BuildRootDescriptor {}

impl Hash for BuildRootDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root_id.hash(state);
        self.target.hash(state);
    }
}

impl fmt::Display for BuildRootDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}:{}", self.target, self.root_id, self.path.display())
    }
}

/// Maps files to the root descriptors that contain them and resolves
/// persisted `(target, root_id)` pairs back to descriptors.
pub trait BuildRootIndex: Send + Sync {
    /// All roots whose directory contains `file`, across every target.
    fn find_all_parent_descriptors(
        &self,
        file: &Path,
        context: Option<&CompileContext>,
    ) -> Vec<Arc<BuildRootDescriptor>>;

    /// Resolve a persisted root id for the given target.
    fn find_root(&self, target: &BuildTarget, root_id: u32) -> Option<Arc<BuildRootDescriptor>>;
}

/// Straightforward [`BuildRootIndex`] over a fixed list of descriptors,
/// matching by path prefix.
#[derive(Debug, Default)]
pub struct StaticRootIndex {
    roots: Vec<Arc<BuildRootDescriptor>>,
}

impl StaticRootIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: Arc<BuildRootDescriptor>) {
        self.roots.push(descriptor);
    }

    pub fn roots(&self) -> &[Arc<BuildRootDescriptor>] {
        &self.roots
    }
}

impl BuildRootIndex for StaticRootIndex {
    fn find_all_parent_descriptors(
        &self,
        file: &Path,
        _context: Option<&CompileContext>,
    ) -> Vec<Arc<BuildRootDescriptor>> {
        self.roots
            .iter()
            .filter(|rd| file.starts_with(rd.path()))
            .cloned()
            .collect()
    }

    fn find_root(&self, target: &BuildTarget, root_id: u32) -> Option<Arc<BuildRootDescriptor>> {
        self.roots
            .iter()
            .find(|rd| rd.root_id() == root_id && rd.target() == target)
            .cloned()
    }
}
