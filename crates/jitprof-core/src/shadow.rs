//! Per-object side table.
//!
//! Metadata is keyed by object identity instead of being attached to the
//! target program's objects. Records are never reclaimed during a run.

use crate::host::{LocationId, ObjectRef};
use crate::shape::NodeId;
use rustc_hash::FxHashMap;

/// Profiler metadata for one observed object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowRecord {
    /// Allocation site, stamped once
    pub creation_site: Option<LocationId>,
    /// Current hidden class, if computed
    pub hidden_class: Option<NodeId>,
    /// Identity used in function/prototype edge labels, assigned lazily
    pub unique_id: Option<u32>,
    /// Set when the object was read through the `arguments` variable
    pub arguments_like: bool,
}

/// Identity-keyed store of [`ShadowRecord`]s.
#[derive(Debug, Default)]
pub struct ShadowStore {
    records: FxHashMap<ObjectRef, ShadowRecord>,
}

impl ShadowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for `obj`, creating an empty one on first touch
    #[inline]
    pub fn get_or_create(&mut self, obj: ObjectRef) -> &mut ShadowRecord {
        self.records.entry(obj).or_default()
    }

    /// Get the record for `obj` if it has been touched
    #[inline]
    pub fn get(&self, obj: ObjectRef) -> Option<&ShadowRecord> {
        self.records.get(&obj)
    }

    /// Whether `obj` has been flagged as an arguments object
    pub fn is_arguments_like(&self, obj: ObjectRef) -> bool {
        self.records.get(&obj).is_some_and(|r| r.arguments_like)
    }

    /// Stamp the creation site unless one is already recorded
    pub fn stamp_creation(&mut self, obj: ObjectRef, site: LocationId) -> bool {
        let record = self.get_or_create(obj);
        if record.creation_site.is_none() {
            record.creation_site = Some(site);
            true
        } else {
            false
        }
    }

    /// Number of objects with a record
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no object has been touched
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
