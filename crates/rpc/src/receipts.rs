use crate::client::UpstreamClient;
use alloy::primitives::U256;
use feeindex_types::{HexI256, HexU256};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

/// Result of fetching and aggregating every transaction receipt in one
/// block.
#[derive(Debug, Clone, Default)]
pub struct ReceiptAggregate {
    /// Per-transaction priority-fee-per-gas, in Mwei. Unsorted; callers
    /// must sort before percentile extraction.
    pub priority_fees_mwei: Vec<u64>,
    /// Sum of `gasUsed * baseFee` over every transaction in the block.
    pub burned: HexU256,
    /// Sum of `gasUsed * (effectiveGasPrice - baseFee)` over every
    /// transaction in the block, signed: an individual receipt can carry
    /// a negative tip (see [`OneReceipt::tips`]), and that is never
    /// clamped away before summing.
    pub tips: HexI256,
    /// Count of EIP-1559 (type-2) transactions.
    pub type2_count: u64,
}

/// Fixed-size concurrent fetcher for per-block transaction receipts.
///
/// Modeled after a pool of goroutines draining a shared job channel: here,
/// each transaction hash becomes one future, and a
/// [`tokio::sync::Semaphore`] sized to the worker count bounds how many
/// run concurrently — the same fixed-concurrency guarantee, without a
/// second channel abstraction for a single-consumer-per-future shape that
/// Rust's `mpsc` doesn't support natively.
#[derive(Debug, Clone)]
pub struct ReceiptWorkerPool {
    client: UpstreamClient,
    semaphore: Arc<Semaphore>,
}

impl ReceiptWorkerPool {
    /// Build a pool that fetches at most `worker_count` receipts
    /// concurrently.
    pub fn new(client: UpstreamClient, worker_count: usize) -> Self {
        Self { client, semaphore: Arc::new(Semaphore::new(worker_count.max(1))) }
    }

    /// Fetch and aggregate every receipt in `tx_hashes`.
    ///
    /// Receipts with an empty `blockNumber` (the node reports this for a
    /// transaction it has not yet indexed) are skipped with a warning;
    /// they never fail the whole block.
    pub async fn fetch_block_receipts(
        &self,
        tx_hashes: &[String],
        block_number: u64,
        base_fee: HexU256,
        update_cache: bool,
    ) -> ReceiptAggregate {
        let futures = tx_hashes.iter().map(|hash| {
            let client = self.client.clone();
            let semaphore = self.semaphore.clone();
            let hash = hash.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                fetch_one(&client, &hash, block_number, base_fee, update_cache).await
            }
        });

        let results = futures::future::join_all(futures).await;

        let mut agg = ReceiptAggregate::default();
        for receipt in results.into_iter().flatten() {
            agg.burned = agg.burned + receipt.burned;
            agg.tips = agg.tips + receipt.tips;
            agg.priority_fees_mwei.push(receipt.priority_fee_mwei);
            if receipt.is_type2 {
                agg.type2_count += 1;
            }
        }
        agg
    }
}

struct OneReceipt {
    burned: HexU256,
    /// `gasUsed * (effectiveGasPrice - baseFee)`, signed. A malformed or
    /// unusual receipt can report an `effectiveGasPrice` below `baseFee`,
    /// producing a negative tip; that is logged, not clamped to zero.
    tips: HexI256,
    priority_fee_mwei: u64,
    is_type2: bool,
}

async fn fetch_one(
    client: &UpstreamClient,
    hash: &str,
    block_number: u64,
    base_fee: HexU256,
    update_cache: bool,
) -> Option<OneReceipt> {
    let receipt = match client.get_transaction_receipt(hash, block_number, update_cache).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            warn!(%hash, "receipt not found upstream, skipping");
            return None;
        }
        Err(e) => {
            warn!(%hash, error = %e, "failed to fetch receipt, skipping");
            return None;
        }
    };

    let block_number_field = receipt.get("blockNumber").and_then(|v| v.as_str()).unwrap_or("");
    if block_number_field.is_empty() {
        warn!(%hash, "receipt has empty blockNumber, skipping");
        return None;
    }

    let gas_used = parse_hex_u256_field(&receipt, "gasUsed")?;
    let effective_gas_price = parse_hex_u256_field(&receipt, "effectiveGasPrice").unwrap_or(HexU256::ZERO);
    let tx_type = receipt.get("type").and_then(|v| v.as_str()).unwrap_or("0x0");

    let burned = HexU256::new(*gas_used * *base_fee);
    let paid = HexU256::new(*gas_used * *effective_gas_price);
    let tips = HexI256::signed_diff(paid.0, burned.0);
    if tips.is_negative() {
        warn!(%hash, paid = %paid, burned = %burned, "receipt paid less than it burned, tip is negative");
    }

    let priority_fee_per_gas =
        if gas_used.0 == U256::ZERO || tips.is_negative() { U256::ZERO } else { tips.unsigned_abs() / gas_used.0 };
    let priority_fee_mwei = (priority_fee_per_gas / U256::from(1_000_000u64))
        .try_into()
        .unwrap_or(u64::MAX);

    Some(OneReceipt { burned, tips, priority_fee_mwei, is_type2: tx_type == "0x2" })
}

fn parse_hex_u256_field(value: &serde_json::Value, field: &str) -> Option<HexU256> {
    let s = value.get(field)?.as_str()?;
    feeindex_types::parse_hex_or_zero(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_default_is_zero() {
        let agg = ReceiptAggregate::default();
        assert_eq!(agg.burned, HexU256::ZERO);
        assert_eq!(agg.tips, HexI256::ZERO);
        assert_eq!(agg.type2_count, 0);
        assert!(agg.priority_fees_mwei.is_empty());
    }
}
