//! Term model and shared error taxonomy for the lexigraph RDF/SPARQL engine.
//!
//! This crate has no knowledge of indexes, query planning, or execution —
//! it only classifies and normalizes the raw strings that make up an RDF
//! term, and defines the `Triple` type and `Error` taxonomy every other
//! crate in the workspace shares.

pub mod error;
pub mod term;
pub mod triple;

pub use error::{Error, Result};
pub use term::{Term, TermKind};
pub use triple::Triple;
