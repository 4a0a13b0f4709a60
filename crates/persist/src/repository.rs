use crate::error::Result;
use async_trait::async_trait;
use feeindex_types::{BlockStats, BlockStatsPercentiles};

/// Storage-backend-agnostic persistence interface.
///
/// Every write is an idempotent upsert keyed by block number: calling
/// [`Repository::add_block`] twice with the same [`BlockStats`] leaves the
/// store unchanged after the second call.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// The highest block number currently persisted, or `None` if empty.
    async fn highest_block_number(&self) -> Result<Option<u64>>;

    /// Every persisted [`BlockStats`] row, ascending by block number.
    async fn all_block_stats(&self) -> Result<Vec<BlockStats>>;

    /// Upsert one block's stats and percentile row.
    async fn add_block(&self, stats: &BlockStats, percentiles: &BlockStatsPercentiles) -> Result<()>;

    /// Batched upsert of many blocks at once.
    async fn add_blocks(&self, rows: &[(BlockStats, BlockStatsPercentiles)]) -> Result<()>;

    /// Block numbers greater than `from_block` missing from the store,
    /// relative to the contiguous range `[from_block, highest]`.
    async fn missing_block_numbers(&self, from_block: u64) -> Result<Vec<u64>>;
}
