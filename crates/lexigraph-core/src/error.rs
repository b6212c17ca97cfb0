//! The error taxonomy shared by every crate in the workspace.
//!
//! `lexigraph-store` and `lexigraph-query` both return `lexigraph_core::Error`
//! rather than define their own — a `DataError` can originate from either a
//! temporal store lookup or a query layer that needed one, and keeping a
//! single enum means callers match on one type regardless of which crate
//! raised it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unrecognized tokens, missing WHERE, unbalanced braces, an
    /// unsupported top-level query keyword, or an empty query.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Non-fatal: surfaced only by an explicit `validate()` call, never by
    /// `execute`. Carries every violation found, not just the first.
    #[error("validation failed: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    /// An executor entry point received a query kind it does not
    /// implement (e.g. `execute_describe` called with a SELECT).
    #[error("unsupported query type: {0}")]
    UnsupportedQueryType(String),

    /// A cancellation token fired, or a deadline elapsed, at a checkpoint.
    #[error("query cancelled")]
    Cancelled,

    /// A temporal lookup could not locate a required resource — a missing
    /// meeting date, or a subject with no recorded versions.
    #[error("data error: {0}")]
    DataError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
