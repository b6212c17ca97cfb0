//! Selectivity-driven reordering of WHERE patterns.
//!
//! Grounded in the teacher's `fukurow-sparql::optimizer` —
//! `estimate_triple_selectivity` and the `BgpReordering` rule's stable
//! sort — generalized from the teacher's fixed IRI/Literal-based guess
//! constants to reading cardinality straight out of [`IndexStats`].

use lexigraph_core::term;
use lexigraph_store::{IndexStats, Slot};

use crate::ast::{Query, SelectQuery, TriplePattern};

const UNKNOWN_SELECTIVITY: f64 = 0.1;

/// Reorders `query.where_clause` by ascending estimated selectivity when
/// there are at least two patterns to reorder; otherwise returns the
/// query unchanged. The sort is stable, so patterns tied on selectivity
/// keep their original relative order.
pub fn plan(query: &Query, stats: &IndexStats) -> Query {
    match query {
        Query::Select(select) if select.where_clause.len() > 1 => {
            let mut reordered = select.clone();
            reorder(&mut reordered, stats);
            Query::Select(reordered)
        }
        other => other.clone(),
    }
}

fn reorder(query: &mut SelectQuery, stats: &IndexStats) {
    let mut indexed: Vec<(usize, f64)> = query
        .where_clause
        .iter()
        .enumerate()
        .map(|(i, pattern)| (i, estimate_selectivity(pattern, stats)))
        .collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let reordered: Vec<TriplePattern> = indexed
        .into_iter()
        .map(|(i, _)| query.where_clause[i].clone())
        .collect();
    query.where_clause = reordered;
}

/// Spec.md §4.4's estimator: start from the total triple count, then
/// narrow by each bound slot in `(subject, predicate, object)` order.
/// The first bound slot sets `sel` outright; subsequent bound slots
/// multiply in their own selectivity (`count / total`). Unbound slots
/// leave `sel` untouched. The final estimate is clamped above
/// [`UNKNOWN_SELECTIVITY`] so a pattern with no stats never sorts as
/// "free".
fn estimate_selectivity(pattern: &TriplePattern, stats: &IndexStats) -> f64 {
    let total = stats.total_triples.max(1) as f64;
    let mut sel = total;
    let mut bound = false;

    if !is_variable(&pattern.s) {
        sel = lookup(stats, Slot::Subject, &pattern.s);
        bound = true;
    }
    if !is_variable(&pattern.p) {
        let predicate_sel = lookup(stats, Slot::Predicate, &pattern.p);
        sel = if bound { sel * (predicate_sel / total) } else { predicate_sel };
        bound = true;
    }
    if !is_variable(&pattern.o) {
        let object_sel = lookup(stats, Slot::Object, &pattern.o);
        sel = if bound { sel * (object_sel / total) } else { object_sel };
    }

    sel.max(UNKNOWN_SELECTIVITY)
}

fn lookup(stats: &IndexStats, slot: Slot, term: &str) -> f64 {
    stats
        .selectivity_hint(slot, term)
        .map(|count| count as f64)
        .unwrap_or(UNKNOWN_SELECTIVITY)
}

fn is_variable(raw: &str) -> bool {
    term::is_variable(raw)
}
