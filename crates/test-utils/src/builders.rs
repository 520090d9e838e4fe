#![allow(dead_code)]

use std::sync::Arc;

use dirtydag::{
    BuildRootDescriptor, BuildTarget, CompileContext, PatternScope, ScopePatterns,
    StaticRootIndex, TargetChunk, TargetKind,
};

/// A module target of type `"module"` (participates in compilation rounds).
pub fn module_target(id: &str) -> BuildTarget {
    BuildTarget::new("module", id, TargetKind::Module)
}

/// A single-pass target of type `"artifact"`.
pub fn artifact_target(id: &str) -> BuildTarget {
    BuildTarget::new("artifact", id, TargetKind::Other)
}

/// A non-generated source root for `target`.
pub fn source_root(root_id: u32, target: &BuildTarget, path: &str) -> Arc<BuildRootDescriptor> {
    Arc::new(BuildRootDescriptor::new(root_id, target.clone(), path, false))
}

/// A generated root for `target` (outputs of earlier build steps).
pub fn generated_root(root_id: u32, target: &BuildTarget, path: &str) -> Arc<BuildRootDescriptor> {
    Arc::new(BuildRootDescriptor::new(root_id, target.clone(), path, true))
}

/// Builder for a [`CompileContext`] wired to a [`StaticRootIndex`].
pub struct ContextBuilder {
    roots: Vec<Arc<BuildRootDescriptor>>,
    scope_patterns: Vec<ScopePatterns>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            scope_patterns: Vec::new(),
        }
    }

    pub fn with_root(mut self, root: Arc<BuildRootDescriptor>) -> Self {
        self.roots.push(root);
        self
    }

    /// Constrain the compile scope for `target` to the given include globs.
    /// Targets without a constraint are fully affected.
    pub fn with_scope(mut self, target: &BuildTarget, include: &[&str]) -> Self {
        self.scope_patterns.push(ScopePatterns {
            target: target.clone(),
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
        });
        self
    }

    pub fn build(self) -> CompileContext {
        let mut index = StaticRootIndex::new();
        for root in self.roots {
            index.register(root);
        }
        let scope = if self.scope_patterns.is_empty() {
            PatternScope::all()
        } else {
            PatternScope::build(self.scope_patterns).expect("valid scope patterns in builder")
        };
        CompileContext::new(Arc::new(scope), Arc::new(index))
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A chunk over the given targets.
pub fn chunk_of(targets: &[&BuildTarget]) -> TargetChunk {
    TargetChunk::new(targets.iter().map(|t| (*t).clone()).collect())
}
