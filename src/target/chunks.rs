// src/target/chunks.rs

//! Grouping of build targets into chunks.
//!
//! A chunk is a set of targets built together, typically a strongly
//! connected component of the target dependency graph (a module dependency
//! cycle compiles as one unit).

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::target::BuildTarget;

/// A set of targets built together.
#[derive(Debug, Clone)]
pub struct TargetChunk {
    targets: Vec<BuildTarget>,
}

impl TargetChunk {
    pub fn new(targets: Vec<BuildTarget>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    /// Targets in this chunk that participate in multi-round compilation.
    pub fn module_targets(&self) -> impl Iterator<Item = &BuildTarget> {
        self.targets.iter().filter(|t| t.is_module())
    }

    pub fn contains(&self, target: &BuildTarget) -> bool {
        self.targets.contains(target)
    }
}

/// Group `targets` into chunks by strongly connected components of the
/// dependency graph described by `deps_of`.
///
/// `deps_of` returns the direct dependencies of a target; edges to targets
/// outside `targets` are ignored. Chunks come back in dependency order: a
/// chunk appears after every chunk it depends on.
pub fn compute_chunks(
    targets: &[BuildTarget],
    mut deps_of: impl FnMut(&BuildTarget) -> Vec<BuildTarget>,
) -> Vec<TargetChunk> {
    let index_of: HashMap<&BuildTarget, usize> =
        targets.iter().enumerate().map(|(i, t)| (t, i)).collect();

    // Edge direction: dependency -> dependent, so that the condensation's
    // topological order puts dependencies first once reversed below.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..targets.len() {
        graph.add_node(i);
    }
    for (i, target) in targets.iter().enumerate() {
        for dep in deps_of(target) {
            if let Some(&j) = index_of.get(&dep) {
                graph.add_edge(j, i, ());
            }
        }
    }

    // tarjan_scc yields components in reverse topological order of the
    // condensation; reversing gives dependencies-before-dependents.
    let mut components = tarjan_scc(&graph);
    components.reverse();

    let chunks: Vec<TargetChunk> = components
        .into_iter()
        .map(|component| {
            TargetChunk::new(component.into_iter().map(|i| targets[i].clone()).collect())
        })
        .collect();

    debug!(
        targets = targets.len(),
        chunks = chunks.len(),
        "grouped targets into chunks"
    );

    chunks
}
