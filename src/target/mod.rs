// src/target/mod.rs

//! Build target identities and the registry used to reconstitute them when
//! loading persisted state.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::TargetKind;

pub mod chunks;

/// A unit of incremental compilation (e.g. a module's production or test
/// source set).
///
/// Identity is the `(type_id, id)` pair; the kind rides along so the state
/// layer can tell module targets (which participate in multi-round
/// compilation) from everything else, but does not take part in equality.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    type_id: String,
    id: String,
    kind: TargetKind,
}

impl BuildTarget {
    pub fn new(type_id: impl Into<String>, id: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            type_id: type_id.into(),
            id: id.into(),
            kind,
        }
    }

    /// Id of the target type this target belongs to.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Id of the target within its type.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Whether multiple compilation rounds apply to this target.
    pub fn is_module(&self) -> bool {
        self.kind.is_module()
    }
}

impl PartialEq for BuildTarget {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.id == other.id
    }
}

impl Eq for BuildTarget {}

impl Hash for BuildTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_id, self.id)
    }
}

/// Reconstitutes targets of one type from their persisted id strings.
///
/// Returning `None` means the id no longer resolves to a live target (the
/// module was removed, a plugin changed its naming scheme, ...); the caller
/// skips the record and keeps loading.
pub trait TargetLoader {
    fn create_target(&self, target_id: &str) -> Option<BuildTarget>;
}

/// Registry of known target types.
///
/// `create_loader` looks up a type by id and binds a loader for it against
/// whatever project model the registry holds. Unknown type ids yield `None`,
/// which makes the persisted records of that type skippable rather than
/// fatal.
pub trait TargetTypeRegistry {
    fn create_loader(&self, type_id: &str) -> Option<Box<dyn TargetLoader + '_>>;
}

/// Registry over a fixed set of declared target types.
///
/// Each declared type reconstitutes targets directly from their id string;
/// suitable for drivers whose target identity is fully encoded in the id, and
/// for tests.
#[derive(Debug, Default)]
pub struct StaticTargetRegistry {
    kinds: HashMap<String, TargetKind>,
}

impl StaticTargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a target type. Targets of this type are reconstituted with the
    /// given kind.
    pub fn declare_type(&mut self, type_id: impl Into<String>, kind: TargetKind) {
        self.kinds.insert(type_id.into(), kind);
    }
}

impl TargetTypeRegistry for StaticTargetRegistry {
    fn create_loader(&self, type_id: &str) -> Option<Box<dyn TargetLoader + '_>> {
        let kind = *self.kinds.get(type_id)?;
        Some(Box::new(StaticTargetLoader {
            type_id: type_id.to_string(),
            kind,
        }))
    }
}

struct StaticTargetLoader {
    type_id: String,
    kind: TargetKind,
}

impl TargetLoader for StaticTargetLoader {
    fn create_target(&self, target_id: &str) -> Option<BuildTarget> {
        Some(BuildTarget::new(self.type_id.clone(), target_id, self.kind))
    }
}
