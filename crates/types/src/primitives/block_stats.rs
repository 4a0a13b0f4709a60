use crate::HexU256;
use serde::{Deserialize, Serialize};

/// Per-block fee accounting, one row per canonical post-London block.
///
/// Invariants (enforced by the block processor, not by this type):
/// `tips >= 0`; `burned == sum(tx.gas_used * base_fee)`; `rewards ==
/// base_reward(era) + uncle adjustments`; post-London `gas_target ==
/// gas_limit / 2`, pre-London `gas_target == gas_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStats {
    /// Block number. Primary key.
    pub number: u64,
    /// Block timestamp, seconds since the Unix epoch.
    pub timestamp: u64,
    /// Base fee per gas for this block.
    pub base_fee: HexU256,
    /// Total wei burned (`gasUsed * baseFee` summed over transactions).
    pub burned: HexU256,
    /// The gas-usage equilibrium point for this block (half of
    /// `gas_limit` post-London, else `gas_limit`).
    pub gas_target: HexU256,
    /// Total gas used by this block.
    pub gas_used: HexU256,
    /// Median per-transaction priority fee, in wei.
    pub priority_fee: HexU256,
    /// Block reward: the era base reward plus uncle adjustments.
    pub rewards: HexU256,
    /// Total priority fees paid to the block producer.
    pub tips: HexU256,
    /// Number of transactions in the block.
    pub transactions: u64,
    /// Number of EIP-1559 (type-2) transactions in the block.
    pub type2_transactions: u64,
}

impl BlockStats {
    /// A zeroed row for `number`, used for empty blocks and as the
    /// not-found sentinel returned alongside a lookup error.
    pub fn empty(number: u64, timestamp: u64) -> Self {
        Self {
            number,
            timestamp,
            base_fee: HexU256::ZERO,
            burned: HexU256::ZERO,
            gas_target: HexU256::ZERO,
            gas_used: HexU256::ZERO,
            priority_fee: HexU256::ZERO,
            rewards: HexU256::ZERO,
            tips: HexU256::ZERO,
            transactions: 0,
            type2_transactions: 0,
        }
    }
}

/// Priority-fee-per-gas percentile row for one block, in Mwei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatsPercentiles {
    /// Block number this row belongs to.
    pub number: u64,
    /// Metric name. Always `"PFpG"` (priority fee per gas) today; kept as
    /// a field so a second metric can be added without a schema break.
    pub metric: String,
    /// 0th percentile (minimum).
    pub minimum: u64,
    /// 10th percentile.
    pub tenth: u64,
    /// 25th percentile.
    pub twenty_fifth: u64,
    /// 50th percentile (median).
    pub median: u64,
    /// 75th percentile.
    pub seventy_fifth: u64,
    /// 90th percentile.
    pub ninetieth: u64,
    /// 95th percentile.
    pub ninety_fifth: u64,
    /// 99th percentile.
    pub ninety_ninth: u64,
    /// 100th percentile (maximum).
    pub maximum: u64,
}

impl BlockStatsPercentiles {
    /// Build a percentile row from a sorted ascending slice of
    /// priority-fee-per-gas values (Mwei).
    pub fn from_sorted(number: u64, sorted: &[u64]) -> Self {
        use crate::percentile_of_sorted as p;
        Self {
            number,
            metric: "PFpG".to_owned(),
            minimum: p(sorted, 0),
            tenth: p(sorted, 10),
            twenty_fifth: p(sorted, 25),
            median: p(sorted, 50),
            seventy_fifth: p(sorted, 75),
            ninetieth: p(sorted, 90),
            ninety_fifth: p(sorted, 95),
            ninety_ninth: p(sorted, 99),
            maximum: p(sorted, 100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_is_all_zero() {
        let s = BlockStats::empty(12_965_000, 1_628_166_822);
        assert_eq!(s.burned, HexU256::ZERO);
        assert_eq!(s.tips, HexU256::ZERO);
        assert_eq!(s.transactions, 0);
    }

    #[test]
    fn percentile_row_is_monotone() {
        let values: Vec<u64> = (1..=100).collect();
        let row = BlockStatsPercentiles::from_sorted(1, &values);
        assert!(row.maximum >= row.ninety_ninth);
        assert!(row.ninety_ninth >= row.ninety_fifth);
        assert!(row.ninety_fifth >= row.ninetieth);
        assert!(row.ninetieth >= row.seventy_fifth);
        assert!(row.seventy_fifth >= row.median);
        assert!(row.median >= row.twenty_fifth);
        assert!(row.twenty_fifth >= row.tenth);
        assert!(row.tenth >= row.minimum);
    }
}
