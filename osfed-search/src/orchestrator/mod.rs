//! Federation orchestrator: ordering, deduplication, merging and the
//! round loop that assembles merged pages.
//!
//! Sources are queried concurrently each round; their batches are merged
//! under a total order, deduplicated by identifier and truncated to the
//! page, and each source's cursor advances only by what the page consumed.

pub mod compare;
pub mod controller;
pub mod dedup;
pub mod merge;
