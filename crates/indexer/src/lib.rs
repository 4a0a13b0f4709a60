//! Block processing, in-memory stats storage, aggregation, and startup/live
//! sync orchestration for the fee indexer.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

/// Errors raised while processing or aggregating blocks.
mod error;
pub use error::ProcessError;

/// Per-block fee computation.
mod processor;
pub use processor::{compute_base_fee_next, BlockProcessor, ProcessedBlock};

/// In-memory keyed stores: stats, totals, latest-blocks ring.
mod store;
pub use store::{LatestBlocks, StatsStore};

/// Calendar-bucket aggregation and window totals.
mod aggregation;
pub use aggregation::AggregationEngine;

/// Startup catch-up sequence and live-tailing loop.
mod orchestrator;
pub use orchestrator::{SyncOrchestrator, SyncOrchestratorConfig};
