//! Data model and wire types for the fee indexer.
//!
//! This crate has no behavior of its own beyond codecs (hex big-integer
//! round-tripping, percentile extraction, calendar-bucket key math); the
//! components that populate and consume these types live in
//! `feeindex-indexer` and `feeindex-hub`.

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

/// Arbitrary-precision integer hex codec shared by storage and wire types.
mod hexnum;
pub use hexnum::{parse_hex_or_zero, HexI256, HexU256};

/// Core data model: [`BlockStats`], [`BlockStatsPercentiles`],
/// [`CumulativeTotals`], [`WindowTotals`], [`CalendarBucket`].
///
/// [`BlockStats`]: crate::primitives::BlockStats
/// [`BlockStatsPercentiles`]: crate::primitives::BlockStatsPercentiles
/// [`CumulativeTotals`]: crate::primitives::CumulativeTotals
/// [`WindowTotals`]: crate::primitives::WindowTotals
/// [`CalendarBucket`]: crate::primitives::CalendarBucket
pub mod primitives;
pub use primitives::{
    percentile_of_sorted, BaseFeePercentiles, BlockStats, BlockStatsPercentiles, CalendarBucket,
    CalendarPeriod, CumulativeTotals, WindowTotals, PERCENTILE_RANKS,
};

/// Client-facing wire payloads (`BlockData`, `InitialData`,
/// `AggregatesData`).
pub mod wire;

/// JSON-RPC 2.0 envelope types used both by the upstream client and the
/// subscription hub.
pub mod rpcmsg;
