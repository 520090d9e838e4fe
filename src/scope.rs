// src/scope.rs

//! Compile scope: the predicate "is this file in scope for this target?".

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::target::BuildTarget;

/// Decides whether a file should be processed for a target in the current
/// build invocation.
pub trait CompileScope: Send + Sync {
    fn is_affected(&self, target: &BuildTarget, file: &Path) -> bool;
}

/// Per-target include/exclude patterns for a [`PatternScope`].
///
/// Patterns are globs matched against the path exactly as the state layer
/// sees it (normally absolute), e.g. `"**/*.rs"` or `"/project/src/**"`.
#[derive(Debug, Clone)]
pub struct ScopePatterns {
    pub target: BuildTarget,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

struct TargetScopeProfile {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl TargetScopeProfile {
    fn matches(&self, path: &Path) -> bool {
        if !self.include.is_match(path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                return false;
            }
        }
        true
    }
}

/// Glob-based [`CompileScope`].
///
/// Targets without a registered pattern set are fully affected; an empty
/// `PatternScope` therefore behaves as a whole-project scope.
pub struct PatternScope {
    profiles: HashMap<BuildTarget, TargetScopeProfile>,
}

impl PatternScope {
    /// A scope affecting every file of every target.
    pub fn all() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Compile per-target patterns into a scope.
    pub fn build(patterns: Vec<ScopePatterns>) -> Result<Self> {
        let mut profiles = HashMap::new();

        for spec in patterns {
            let include = build_globset(&spec.include)
                .with_context(|| format!("building include globset for target {}", spec.target))?;

            let exclude = if spec.exclude.is_empty() {
                None
            } else {
                Some(build_globset(&spec.exclude).with_context(|| {
                    format!("building exclude globset for target {}", spec.target)
                })?)
            };

            profiles.insert(spec.target, TargetScopeProfile { include, exclude });
        }

        Ok(Self { profiles })
    }
}

impl CompileScope for PatternScope {
    fn is_affected(&self, target: &BuildTarget, file: &Path) -> bool {
        match self.profiles.get(target) {
            Some(profile) => profile.matches(file),
            None => true,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
