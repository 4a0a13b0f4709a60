//! Upstream RPC transport for the fee indexer.
//!
//! Three pieces live here: [`UpstreamClient`], a tagged JSON-RPC/HTTP
//! transport; [`ReceiptWorkerPool`], a bounded-concurrency fetcher for
//! per-transaction receipts; and [`HeadSubscription`], a reconnecting
//! `newHeads` websocket subscription.

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

/// The tagged HTTP JSON-RPC transport.
mod client;
pub use client::{parse_hex_u64, UpstreamClient};

/// Errors returned by [`UpstreamClient`] and [`ReceiptWorkerPool`].
mod error;
pub use error::UpstreamError;

/// The receipt worker pool.
mod receipts;
pub use receipts::{ReceiptAggregate, ReceiptWorkerPool};

/// The reconnecting `newHeads` subscription client.
mod subscription;
pub use subscription::HeadSubscription;

/// Decoded block-header fields the indexer needs out of
/// `eth_getBlockByNumber`.
pub mod block;
pub use block::{RawBlock, RawUncle};
