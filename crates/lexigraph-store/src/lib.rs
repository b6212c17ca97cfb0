//! In-memory RDF triple store with S/P/O indexes, plus a temporal layer
//! tracking per-subject version history.
//!
//! The triple store is the only shared mutable resource in the system
//! (see the crate root of `lexigraph`): every public method takes `&self`
//! and synchronizes internally with an `RwLock`, so a single
//! `Arc<TripleStore>` can be handed to many concurrent query threads
//! without the caller coordinating locking.

pub mod stats;
pub mod store;
pub mod temporal;

pub use lexigraph_core::{Error, Result};
pub use stats::{IndexStats, Slot};
pub use store::TripleStore;
pub use temporal::{RangeChange, RangeChangeType, TemporalStore, VersionInfo, VersionStatus};
