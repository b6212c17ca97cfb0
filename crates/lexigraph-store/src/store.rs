//! The in-memory triple store.

use std::collections::HashMap;
use std::sync::RwLock;

use lexigraph_core::Triple;

use crate::stats::{IndexStats, Slot};

/// The empty string is the wildcard: `find("", "p", "")` means "any
/// subject, predicate `p`, any object".
const WILDCARD: &str = "";

#[derive(Debug, Default)]
struct Inner {
    triples: Vec<Triple>,
    subject_index: HashMap<String, Vec<usize>>,
    predicate_index: HashMap<String, Vec<usize>>,
    object_index: HashMap<String, Vec<usize>>,
}

impl Inner {
    fn insert(&mut self, triple: Triple) -> bool {
        if self.contains(&triple.subject, &triple.predicate, &triple.object) {
            return false;
        }
        let idx = self.triples.len();
        self.subject_index
            .entry(triple.subject.clone())
            .or_default()
            .push(idx);
        self.predicate_index
            .entry(triple.predicate.clone())
            .or_default()
            .push(idx);
        self.object_index
            .entry(triple.object.clone())
            .or_default()
            .push(idx);
        self.triples.push(triple);
        true
    }

    fn contains(&self, subject: &str, predicate: &str, object: &str) -> bool {
        self.find_indices(subject, predicate, object).next().is_some()
    }

    /// The core matching algorithm: pick the smallest candidate set among
    /// the bound slots, then filter it by the remaining bound slots.
    ///
    /// Picking the smallest index first (rather than intersecting all
    /// bound indexes) keeps the common case — one or two bound terms —
    /// a single index lookup plus a cheap linear filter, at the cost of
    /// a possibly-larger-than-necessary scan when two very common terms
    /// are bound together. For the scale this store targets (a single
    /// regulatory corpus in memory) that tradeoff favors simplicity.
    fn find_indices(&self, subject: &str, predicate: &str, object: &str) -> Box<dyn Iterator<Item = usize> + '_> {
        let bound_s = subject != WILDCARD;
        let bound_p = predicate != WILDCARD;
        let bound_o = object != WILDCARD;

        if !bound_s && !bound_p && !bound_o {
            return Box::new(0..self.triples.len());
        }

        let mut candidates: Vec<(usize, &Vec<usize>)> = Vec::new();
        if bound_s {
            if let Some(v) = self.subject_index.get(subject) {
                candidates.push((v.len(), v));
            } else {
                return Box::new(std::iter::empty());
            }
        }
        if bound_p {
            if let Some(v) = self.predicate_index.get(predicate) {
                candidates.push((v.len(), v));
            } else {
                return Box::new(std::iter::empty());
            }
        }
        if bound_o {
            if let Some(v) = self.object_index.get(object) {
                candidates.push((v.len(), v));
            } else {
                return Box::new(std::iter::empty());
            }
        }

        let (_, smallest) = candidates
            .into_iter()
            .min_by_key(|(len, _)| *len)
            .expect("at least one slot is bound");

        let subject = subject.to_string();
        let predicate = predicate.to_string();
        let object = object.to_string();
        Box::new(smallest.iter().copied().filter(move |&idx| {
            let t = &self.triples[idx];
            (!bound_s || t.subject == subject)
                && (!bound_p || t.predicate == predicate)
                && (!bound_o || t.object == object)
        }))
    }

    fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            total_triples: self.triples.len(),
            unique_subjects: self.subject_index.len(),
            unique_predicates: self.predicate_index.len(),
            unique_objects: self.object_index.len(),
            ..Default::default()
        };
        for (k, v) in &self.subject_index {
            stats.subject_counts.insert(k.clone(), v.len());
        }
        for (k, v) in &self.predicate_index {
            stats.predicate_counts.insert(k.clone(), v.len());
        }
        for (k, v) in &self.object_index {
            stats.object_counts.insert(k.clone(), v.len());
        }
        stats
    }
}

/// A set of RDF triples indexed by subject, predicate, and object.
///
/// Every public method takes `&self`: internal mutability is through an
/// `RwLock<Inner>`, so a single store can be wrapped in `Arc` and shared
/// across concurrent readers with infrequent writers.
#[derive(Debug, Default)]
pub struct TripleStore {
    inner: RwLock<Inner>,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `triple` if it is not already present. Returns `true` if
    /// the store changed.
    pub fn add(&self, triple: Triple) -> bool {
        self.inner
            .write()
            .expect("triple store lock poisoned")
            .insert(triple)
    }

    /// Inserts every triple in `triples`, skipping duplicates. Returns the
    /// number actually added.
    pub fn bulk_add<I: IntoIterator<Item = Triple>>(&self, triples: I) -> usize {
        let mut guard = self.inner.write().expect("triple store lock poisoned");
        triples.into_iter().filter(|t| guard.insert(t.clone())).count()
    }

    /// Returns every stored triple matching the pattern, in insertion
    /// order. Pass `""` for any slot to leave it unbound.
    pub fn find(&self, subject: &str, predicate: &str, object: &str) -> Vec<Triple> {
        let guard = self.inner.read().expect("triple store lock poisoned");
        guard
            .find_indices(subject, predicate, object)
            .map(|idx| guard.triples[idx].clone())
            .collect()
    }

    pub fn contains(&self, subject: &str, predicate: &str, object: &str) -> bool {
        self.inner
            .read()
            .expect("triple store lock poisoned")
            .contains(subject, predicate, object)
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("triple store lock poisoned").triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> IndexStats {
        self.inner.read().expect("triple store lock poisoned").stats()
    }

    /// Convenience wrapper over [`IndexStats::selectivity_hint`] that
    /// avoids the caller taking a stats snapshot just to read one slot.
    pub fn selectivity_hint(&self, slot: Slot, term: &str) -> Option<usize> {
        let guard = self.inner.read().expect("triple store lock poisoned");
        let counts = match slot {
            Slot::Subject => &guard.subject_index,
            Slot::Predicate => &guard.predicate_index,
            Slot::Object => &guard.object_index,
        };
        counts.get(term).map(|v| v.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(s, p, o)
    }

    #[test]
    fn add_is_idempotent() {
        let store = TripleStore::new();
        assert!(store.add(t("<a>", "<p>", "<b>")));
        assert!(!store.add(t("<a>", "<p>", "<b>")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn find_with_all_wildcards_returns_insertion_order() {
        let store = TripleStore::new();
        store.add(t("<a>", "<p>", "<b>"));
        store.add(t("<c>", "<p>", "<d>"));
        store.add(t("<e>", "<p>", "<f>"));
        let found = store.find("", "", "");
        assert_eq!(
            found,
            vec![
                t("<a>", "<p>", "<b>"),
                t("<c>", "<p>", "<d>"),
                t("<e>", "<p>", "<f>"),
            ]
        );
    }

    #[test]
    fn find_fully_bound_returns_at_most_one() {
        let store = TripleStore::new();
        store.add(t("<a>", "<p>", "<b>"));
        store.add(t("<a>", "<p>", "<c>"));
        let found = store.find("<a>", "<p>", "<b>");
        assert_eq!(found, vec![t("<a>", "<p>", "<b>")]);
    }

    #[test]
    fn find_filters_on_remaining_bound_slots() {
        let store = TripleStore::new();
        store.add(t("<a>", "<p1>", "<x>"));
        store.add(t("<a>", "<p2>", "<x>"));
        store.add(t("<b>", "<p1>", "<x>"));
        let found = store.find("<a>", "", "<x>");
        assert_eq!(found, vec![t("<a>", "<p1>", "<x>"), t("<a>", "<p2>", "<x>")]);
    }

    #[test]
    fn find_unknown_bound_term_returns_empty() {
        let store = TripleStore::new();
        store.add(t("<a>", "<p>", "<b>"));
        assert!(store.find("<missing>", "", "").is_empty());
    }

    #[test]
    fn contains_matches_find() {
        let store = TripleStore::new();
        store.add(t("<a>", "<p>", "<b>"));
        assert!(store.contains("<a>", "<p>", "<b>"));
        assert!(!store.contains("<a>", "<p>", "<other>"));
    }

    #[test]
    fn stats_counts_unique_terms_per_slot() {
        let store = TripleStore::new();
        store.add(t("<a>", "<p>", "<x>"));
        store.add(t("<a>", "<p>", "<y>"));
        let stats = store.stats();
        assert_eq!(stats.total_triples, 2);
        assert_eq!(stats.unique_subjects, 1);
        assert_eq!(stats.unique_objects, 2);
    }

    #[test]
    fn bulk_add_skips_duplicates_and_reports_count() {
        let store = TripleStore::new();
        store.add(t("<a>", "<p>", "<b>"));
        let added = store.bulk_add(vec![t("<a>", "<p>", "<b>"), t("<c>", "<p>", "<d>")]);
        assert_eq!(added, 1);
        assert_eq!(store.len(), 2);
    }
}
