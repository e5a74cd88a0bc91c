//! Property-level merge rules
//!
//! A context tracks, per object, the durable value it last absorbed (the
//! snapshot) and the value it holds in memory. When the object is written
//! back, or when newer durable values are absorbed, the two sides are
//! reconciled property by property: properties the context never touched
//! always take the store's value; properties it did touch follow the policy.

use crate::model::{Property, Record};
use crate::storage::{MergeResolver, PendingUpdate};
use tracing::debug;

/// How a context reconciles its in-memory changes with the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Changed in-memory property values overwrite stored ones
    #[default]
    PropertyObjectTrump,
    /// Stored values win for properties changed on both sides
    PropertyStoreTrump,
}

/// Result of reconciling one object
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged: Record,
    /// Properties changed both in memory and in the store, to different values
    pub conflicts: Vec<Property>,
}

impl MergePolicy {
    /// Reconcile `current` (in memory, derived from `snapshot`) with `durable`.
    pub fn merge(&self, snapshot: &Record, current: &Record, durable: &Record) -> MergeOutcome {
        let mut merged = durable.clone();
        let mut conflicts = Vec::new();

        for property in snapshot.changed_properties(current) {
            let store_changed = !snapshot.same_value(durable, property);
            if store_changed && !durable.same_value(current, property) {
                conflicts.push(property);
            }
            let memory_wins = match self {
                Self::PropertyObjectTrump => true,
                Self::PropertyStoreTrump => !store_changed,
            };
            if memory_wins {
                merged.copy_value(current, property);
            }
        }

        MergeOutcome { merged, conflicts }
    }
}

impl MergeResolver for MergePolicy {
    fn resolve(&self, pending: &PendingUpdate, durable: &Record) -> Record {
        let outcome = self.merge(&pending.snapshot, &pending.current, durable);
        if !outcome.conflicts.is_empty() {
            debug!(
                id = %pending.id(),
                policy = ?self,
                conflicts = ?outcome.conflicts,
                "merged conflicting property changes"
            );
        }
        outcome.merged
    }
}
