//! Client-facing payload shapes delivered over the subscription hub.

use crate::{BlockStats, CalendarBucket, CumulativeTotals, WindowTotals};
use serde::{Deserialize, Serialize};

/// Pushed to every subscriber of the `data`/`blockStats` topics when a new
/// block is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    /// The protocol-deterministic base fee the next block will adopt.
    pub base_fee_next: crate::HexU256,
    /// The newly processed block's stats.
    pub block: BlockStats,
    /// Number of currently connected clients.
    pub clients: i64,
    /// Cumulative totals through this block.
    pub totals: CumulativeTotals,
    /// Totals over the trailing hour.
    pub totals_hour: WindowTotals,
    /// Totals over the trailing day.
    pub totals_day: WindowTotals,
    /// Totals over the trailing week.
    pub totals_week: WindowTotals,
    /// Totals over the trailing month.
    pub totals_month: WindowTotals,
    /// Last known ETH/USD spot price.
    pub usd_price: f64,
    /// Indexer software version.
    pub version: String,
}

/// Returned from `internal_getInitialData` on subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    /// The current chain head as known to the indexer.
    pub block_number: u64,
    /// Most recent N blocks, newest first.
    pub blocks: Vec<BlockStats>,
    /// Everything else a live `BlockData` push carries.
    #[serde(flatten)]
    pub data: BlockData,
}

/// Returned from `internal_getInitialAggregatesData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesData {
    /// Hourly buckets, newest first.
    pub totals_per_hour: Vec<CalendarBucket>,
    /// Daily buckets, newest first.
    pub totals_per_day: Vec<CalendarBucket>,
    /// Monthly buckets, newest first.
    pub totals_per_month: Vec<CalendarBucket>,
}

/// Returned from the health endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// `"OK"` when the process is serving traffic.
    pub status: HealthStatus,
    /// Number of blocks currently held in the in-memory store.
    pub blocks: usize,
}

/// Health status enum, serialized as the bare string the health endpoint
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// The process is serving traffic.
    #[serde(rename = "OK")]
    Ok,
}
