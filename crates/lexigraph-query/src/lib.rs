//! SPARQL-subset parser, planner, filter evaluator, and executor.
//!
//! Text flows `parse` → `expand_prefixes` → (`plan`, if enabled) →
//! `Executor`/`TemporalExecutor`. Each stage is its own module so a
//! caller can stop early — run `parse` alone to validate a query body
//! without a store, or `plan` against a synthetic `IndexStats` to test
//! reordering in isolation.

pub mod ast;
pub mod executor;
pub mod filter;
pub mod parser;
pub mod planner;
pub mod temporal_executor;

pub use ast::{
    format, AggregateExpression, AggregateFunction, ConstructQuery, DescribeQuery, Filter,
    OrderBy, Prefixes, Query, SelectQuery, TriplePattern,
};
pub use executor::{
    CancellationToken, ConstructResult, DescribeResult, ExecutionContext, ExecutionOutcome,
    Executor, ExecutorConfig, QueryMetrics, QueryResult,
};
pub use filter::Binding;
pub use parser::{expand_prefixes, parse, validate};
pub use planner::plan;
pub use temporal_executor::{
    AmendmentAdoption, AverageAdoptionTime, DurationResult, MeetingRangeSummary, RangeQueryResult,
    RangeSummary, TemporalExecutor, TemporalResult, Timeline, TimelineEvent, TimelineEventType,
    VersionsResult,
};
