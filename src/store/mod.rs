//! Graph storage.
//!
//! [`AdGraph`] is the session object for one page load: it owns every node,
//! the append-only edge log, the centrality cache and the deferred-resolution
//! tables. Nothing in it is process-global.

pub mod graph;
pub mod tables;

pub use graph::{AdGraph, GraphError};
pub use tables::{DeferredTables, PendingRequest};
