//! A point-in-time snapshot of store cardinality, used by the planner to
//! estimate pattern selectivity.

use std::collections::HashMap;

/// Which triple slot a term occupies, for cardinality lookups that are
/// otherwise identical across subject/predicate/object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Subject,
    Predicate,
    Object,
}

/// A snapshot of [`crate::TripleStore`] cardinality.
///
/// Stats are either maintained incrementally by the store or rebuilt on
/// demand via `TripleStore::stats()`; either way the caller receives an
/// owned, detached copy that stays valid for the duration of planning
/// even if the store is mutated concurrently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    pub total_triples: usize,
    pub unique_subjects: usize,
    pub unique_predicates: usize,
    pub unique_objects: usize,
    pub subject_counts: HashMap<String, usize>,
    pub predicate_counts: HashMap<String, usize>,
    pub object_counts: HashMap<String, usize>,
}

impl IndexStats {
    /// Known cardinality for `term` in the given `slot`, or `None` if the
    /// term never appears there.
    pub fn selectivity_hint(&self, slot: Slot, term: &str) -> Option<usize> {
        let counts = match slot {
            Slot::Subject => &self.subject_counts,
            Slot::Predicate => &self.predicate_counts,
            Slot::Object => &self.object_counts,
        };
        counts.get(term).copied()
    }
}
