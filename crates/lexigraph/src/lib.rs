//! # lexigraph
//!
//! An embedded RDF triple store coupled with a SPARQL-subset query
//! engine for regulatory knowledge graphs: articles, chapters,
//! meetings, motions, and their versions over time.
//!
//! This crate re-exports the split-out crates behind one facade —
//! `lexigraph-core` (term model, errors), `lexigraph-store` (triples,
//! temporal versioning), `lexigraph-query` (parser, planner, filter,
//! executor) — the way the teacher's top-level `fukurow` crate composes
//! its own split workspace. Unlike the teacher's feature-gated
//! re-exports (built for an optional cyber/web/wasm surface), every
//! lexigraph crate is load-bearing for the core engine, so nothing here
//! is behind a Cargo feature.
//!
//! ## Quick start
//!
//! ```
//! use lexigraph::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(TripleStore::new());
//! store.add(Triple::new("<GDPR:Art17>", "rdf:type", "<reg:Article>"));
//!
//! let engine = QueryEngine::new(store);
//! let result = engine.execute_select_str("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }").unwrap();
//! assert_eq!(result.count, 1);
//! ```

use std::sync::Arc;

pub use lexigraph_core as core;
pub use lexigraph_query as query;
pub use lexigraph_store as store;

pub use lexigraph_core::{term, Error, Result};
pub use lexigraph_core::Triple;
pub use lexigraph_store::{IndexStats, RangeChange, RangeChangeType, Slot, TemporalStore, TripleStore, VersionInfo, VersionStatus};
pub use lexigraph_query::{
    parse, plan, validate, AggregateExpression, AggregateFunction, AmendmentAdoption,
    AverageAdoptionTime, Binding, CancellationToken, ConstructQuery, ConstructResult,
    DescribeQuery, DescribeResult, DurationResult, ExecutionContext, ExecutionOutcome, Executor,
    ExecutorConfig, Filter, MeetingRangeSummary, OrderBy, Prefixes, Query, QueryMetrics,
    QueryResult, RangeQueryResult, RangeSummary, SelectQuery, TemporalExecutor, TemporalResult,
    Timeline, TimelineEvent, TimelineEventType, TriplePattern, VersionsResult,
};

/// Current crate version, surfaced for callers that log their
/// dependency versions at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bundles a [`TripleStore`] and [`TemporalStore`] with an [`Executor`]
/// and [`TemporalExecutor`] pair, so a caller wires one type instead of
/// three. Every entry point enumerated in the external interfaces is an
/// inherent method here, forwarding to the underlying executor.
pub struct QueryEngine {
    store: Arc<TripleStore>,
    temporal_store: Arc<TemporalStore>,
    temporal: TemporalExecutor,
}

impl QueryEngine {
    pub fn new(store: Arc<TripleStore>) -> Self {
        Self::with_config(store, ExecutorConfig::default())
    }

    pub fn with_config(store: Arc<TripleStore>, config: ExecutorConfig) -> Self {
        let temporal_store = Arc::new(TemporalStore::new());
        let executor = Executor::new(store.clone(), config);
        let temporal = TemporalExecutor::new(executor, temporal_store.clone());
        QueryEngine {
            store,
            temporal_store,
            temporal,
        }
    }

    pub fn store(&self) -> &Arc<TripleStore> {
        &self.store
    }

    pub fn temporal_store(&self) -> &Arc<TemporalStore> {
        &self.temporal_store
    }

    pub fn executor(&self) -> &Executor {
        self.temporal.executor()
    }

    pub fn refresh_stats(&self) {
        self.executor().refresh_stats();
    }

    pub fn execute(&self, query: &Query) -> Result<ExecutionOutcome> {
        self.executor().execute(query)
    }

    pub fn execute_with(&self, ctx: &ExecutionContext, query: &Query) -> Result<ExecutionOutcome> {
        self.executor().execute_with(ctx, query)
    }

    pub fn execute_string(&self, text: &str) -> Result<ExecutionOutcome> {
        self.executor().execute_string(text)
    }

    pub fn execute_select_str(&self, text: &str) -> Result<QueryResult> {
        let query = parse(text)?;
        self.executor().execute_select(&query)
    }

    pub fn execute_construct_str(&self, text: &str) -> Result<ConstructResult> {
        let query = parse(text)?;
        self.executor().execute_construct(&query)
    }

    pub fn execute_describe_str(&self, text: &str) -> Result<DescribeResult> {
        let query = parse(text)?;
        self.executor().execute_describe(&query)
    }

    pub fn execute_as_of(&self, query: &Query, at: chrono::DateTime<chrono::Utc>) -> Result<TemporalResult> {
        self.temporal.execute_as_of(query, at)
    }

    pub fn execute_between(
        &self,
        query: &Query,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Result<RangeQueryResult> {
        self.temporal.execute_between(query, from, to)
    }

    pub fn execute_between_meetings(
        &self,
        query: &Query,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<MeetingRangeSummary>> {
        self.temporal.execute_between_meetings(query, from, to)
    }

    pub fn get_versions(&self, s: &str) -> VersionsResult {
        self.temporal.get_versions(s)
    }

    pub fn get_timeline(&self, s: &str) -> Timeline {
        self.temporal.get_timeline(s)
    }

    pub fn get_duration(&self, s: &str) -> DurationResult {
        self.temporal.get_duration(s)
    }

    pub fn provisions_in_force_at(&self, query: &Query, at: chrono::DateTime<chrono::Utc>) -> Result<Vec<String>> {
        self.temporal.provisions_in_force_at(query, at)
    }

    pub fn amendments_adopted_in_range(
        &self,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Vec<AmendmentAdoption> {
        self.temporal.amendments_adopted_in_range(from, to)
    }

    pub fn average_time_to_adoption(&self) -> AverageAdoptionTime {
        self.temporal.average_time_to_adoption()
    }
}

/// Convenience imports for downstream consumers.
///
/// ```
/// use lexigraph::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Error, Executor, ExecutorConfig, Query, QueryEngine, QueryResult, Result, TemporalStore,
        Triple, TripleStore,
    };
    pub use crate::query::{parse, validate};
}
