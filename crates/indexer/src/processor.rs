use crate::error::{ProcessError, Result};
use alloy::primitives::U256;
use feeindex_constants::NetworkConstants;
use feeindex_rpc::{RawBlock, RawUncle, ReceiptWorkerPool, UpstreamClient};
use feeindex_types::{BlockStats, BlockStatsPercentiles, HexI256, HexU256};
use tracing::warn;

/// Everything produced by processing one block.
#[derive(Debug, Clone)]
pub struct ProcessedBlock {
    /// The computed fee-accounting row.
    pub stats: BlockStats,
    /// The priority-fee percentile row.
    pub percentiles: BlockStatsPercentiles,
    /// The protocol-deterministic base fee the next block will adopt.
    pub base_fee_next: HexU256,
}

/// Computes [`ProcessedBlock`]s from raw upstream data.
#[derive(Debug, Clone)]
pub struct BlockProcessor {
    rpc: UpstreamClient,
    receipts: ReceiptWorkerPool,
    network: NetworkConstants,
}

impl BlockProcessor {
    /// Build a processor against the given upstream client, receipt
    /// worker pool, and network constants.
    pub const fn new(rpc: UpstreamClient, receipts: ReceiptWorkerPool, network: NetworkConstants) -> Self {
        Self { rpc, receipts, network }
    }

    /// Fetch and compute everything for block `number`.
    ///
    /// `update_cache` is forwarded as the advisory cache-hint tag on every
    /// upstream call this makes.
    pub async fn process(&self, number: u64, update_cache: bool) -> Result<ProcessedBlock> {
        let raw = self
            .rpc
            .get_block_by_number(number, update_cache)
            .await?
            .ok_or_else(|| ProcessError::NotFound(format!("block {number} not found upstream")))?;
        let block = RawBlock::decode(&raw)?;

        let gas_limit = block.gas_limit;
        let gas_target = if self.network.is_post_london(number) {
            HexU256::new(gas_limit.0 / U256::from(2u64))
        } else {
            gas_limit
        };

        let base_fee = if number == self.network.london_block() {
            block.base_fee_per_gas.unwrap_or_else(|| HexU256::from_u128(feeindex_constants::DEFAULT_BASE_FEE_WEI))
        } else {
            block.base_fee_per_gas.unwrap_or(HexU256::ZERO)
        };

        let mut rewards = HexU256::from_u128(self.network.base_reward_wei(number));
        for (index, uncle_hash) in block.uncle_hashes.iter().enumerate() {
            let raw_uncle = self
                .rpc
                .get_uncle(number, index as u64, update_cache)
                .await?
                .ok_or_else(|| ProcessError::NotFound(format!("uncle {index} of block {number} not found")))?;
            let uncle = RawUncle::decode(&raw_uncle, uncle_hash).map_err(|e| ProcessError::InvariantViolation {
                block_number: number,
                message: e.to_string(),
            })?;

            let base_reward = U256::from(self.network.base_reward_wei(number));
            let distance = number.checked_sub(uncle.number).ok_or_else(|| ProcessError::InvariantViolation {
                block_number: number,
                message: format!("uncle {} is not an ancestor of including block {number}", uncle.number),
            })?;
            let miner_reward = base_reward * U256::from(8u64.saturating_sub(distance)) / U256::from(8u64);
            let inclusion_reward = base_reward / U256::from(32u64);
            rewards = HexU256::new(rewards.0 + miner_reward + inclusion_reward);
        }

        let agg = self.receipts.fetch_block_receipts(&block.transaction_hashes, number, base_fee, update_cache).await;

        let mut sorted_fees = agg.priority_fees_mwei.clone();
        sorted_fees.sort_unstable();
        let percentiles = BlockStatsPercentiles::from_sorted(number, &sorted_fees);
        let priority_fee = HexU256::new(U256::from(percentiles.median) * U256::from(1_000_000u64));

        if !block.transaction_hashes.is_empty() && agg.tips == HexI256::ZERO {
            warn!(block_number = number, "block produced zero total tips with non-empty transaction set");
        }
        if agg.tips.is_negative() {
            warn!(block_number = number, tips = %agg.tips, "block-level tip total is negative, clamping to zero");
        }

        let base_fee_next = compute_base_fee_next(base_fee, block.gas_used, gas_target);

        let stats = BlockStats {
            number,
            timestamp: block.timestamp,
            base_fee,
            burned: agg.burned,
            gas_target,
            gas_used: block.gas_used,
            priority_fee,
            rewards,
            tips: agg.tips.saturating_to_unsigned(),
            transactions: block.transaction_hashes.len() as u64,
            type2_transactions: agg.type2_count,
        };

        Ok(ProcessedBlock { stats, percentiles, base_fee_next })
    }
}

/// `baseFeeNext = baseFee + baseFee * (gasUsed - gasTarget) / gasTarget / 8`,
/// using truncated integer division at each step, matching the order of
/// operations of the system this was distilled from.
///
/// Exposed beyond this module so the subscription hub can derive a
/// `baseFeeNext` for historical blocks it renders (`internal_getInitialData`)
/// without needing to have kept the original [`ProcessedBlock`] around —
/// the quantity is a pure function of the stored [`BlockStats`] fields.
pub fn compute_base_fee_next(base_fee: HexU256, gas_used: HexU256, gas_target: HexU256) -> HexU256 {
    if gas_target.0 == U256::ZERO {
        return base_fee;
    }
    let gas_used = gas_used.0;
    let gas_target_val = gas_target.0;
    let base_fee_val = base_fee.0;

    let delta: U256 = if gas_used >= gas_target_val {
        let over = gas_used - gas_target_val;
        (over * base_fee_val) / gas_target_val / U256::from(8u64)
    } else {
        let under = gas_target_val - gas_used;
        let decrease = (under * base_fee_val) / gas_target_val / U256::from(8u64);
        return HexU256::new(base_fee_val.saturating_sub(decrease));
    };

    HexU256::new(base_fee_val + delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_fee_next_unchanged_at_target() {
        let base_fee = HexU256::from_u64(1_000_000_000);
        let next = compute_base_fee_next(base_fee, HexU256::from_u64(15_000_000), HexU256::from_u64(15_000_000));
        assert_eq!(next, base_fee);
    }

    #[test]
    fn base_fee_next_increases_when_over_target() {
        let base_fee = HexU256::from_u64(1_000_000_000);
        let next = compute_base_fee_next(base_fee, HexU256::from_u64(30_000_000), HexU256::from_u64(15_000_000));
        assert_eq!(next, HexU256::from_u64(1_125_000_000));
    }

    #[test]
    fn base_fee_next_decreases_when_under_target() {
        let base_fee = HexU256::from_u64(1_000_000_000);
        let next = compute_base_fee_next(base_fee, HexU256::from_u64(0), HexU256::from_u64(15_000_000));
        assert_eq!(next, HexU256::from_u64(875_000_000));
    }
}
