use crate::error::{ProcessError, Result};
use crate::store::{ReplaceOrPrependList, StatsStore};
use feeindex_constants::NetworkConstants;
use feeindex_types::{
    BaseFeePercentiles, CalendarBucket, CalendarPeriod, CumulativeTotals, WindowTotals,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Maximum number of refinement steps
/// [`AggregationEngine::find_block_near_timestamp`] will take before
/// giving up and returning its best estimate. Bounds the cost of a
/// pathological gap (e.g. a long run of missing blocks).
const MAX_BRACKETING_STEPS: u32 = 64;

/// A window longer than this (seconds) advances the search estimate in
/// large strides instead of one block at a time.
const COARSE_STEP_THRESHOLD_SECS: i64 = 40 * 60;

/// Calendar-bucket aggregation (hour/day/month) and time-window totals.
#[derive(Debug)]
pub struct AggregationEngine {
    store: Arc<StatsStore>,
    network: NetworkConstants,
    hour: Mutex<ReplaceOrPrependList<CalendarBucket>>,
    day: Mutex<ReplaceOrPrependList<CalendarBucket>>,
    month: Mutex<ReplaceOrPrependList<CalendarBucket>>,
}

impl AggregationEngine {
    /// Build an aggregation engine over `store`.
    pub fn new(store: Arc<StatsStore>, network: NetworkConstants) -> Self {
        Self {
            store,
            network,
            hour: Mutex::new(ReplaceOrPrependList::new()),
            day: Mutex::new(ReplaceOrPrependList::new()),
            month: Mutex::new(ReplaceOrPrependList::new()),
        }
    }

    /// Totals over the closed block range `[start_block, end_block]`,
    /// computed as `totals[end] - totals[start]`.
    pub fn totals_block_delta(&self, start_block: u64, end_block: u64) -> Result<WindowTotals> {
        let start = self.totals_or_zero(start_block);
        let end = self
            .store
            .get_totals(end_block)
            .ok_or_else(|| ProcessError::NotFound(format!("no totals recorded for block {end_block}")))?;
        Ok(WindowTotals::delta(start_block, end_block, start, end))
    }

    fn totals_or_zero(&self, block: u64) -> CumulativeTotals {
        if block < self.network.london_block() {
            CumulativeTotals::ZERO
        } else {
            self.store.get_totals(block).unwrap_or(CumulativeTotals::ZERO)
        }
    }

    /// Totals over `[start_ts, end_ts)`, resolved to the nearest blocks via
    /// [`Self::find_block_near_timestamp`].
    ///
    /// `start_ts` is clamped up to the London activation timestamp;
    /// `end_ts` is clamped down to the latest processed block's
    /// timestamp. Requires `start_ts < end_ts` after clamping.
    pub fn totals_time_delta(&self, start_ts: u64, end_ts: u64) -> Result<WindowTotals> {
        let start_ts = start_ts.max(self.network.london_timestamp());
        let latest_ts = self.latest_timestamp()?;
        let end_ts = end_ts.min(latest_ts);
        if start_ts >= end_ts {
            return Err(ProcessError::InvalidRange("endTime must be greater than startTime".into()));
        }

        let start_block = self.find_block_near_timestamp(start_ts)?;
        let end_block = self.find_block_near_timestamp(end_ts)?;
        self.totals_block_delta(start_block, end_block)
    }

    /// Base-fee (Gwei) percentile summary over every block in
    /// `[start_ts, end_ts)`.
    pub fn base_fee_percentiles_time_delta(&self, start_ts: u64, end_ts: u64) -> Result<BaseFeePercentiles> {
        let start_ts = start_ts.max(self.network.london_timestamp());
        let latest_ts = self.latest_timestamp()?;
        let end_ts = end_ts.min(latest_ts);
        if start_ts >= end_ts {
            return Err(ProcessError::InvalidRange("endTime must be greater than startTime".into()));
        }

        let start_block = self.find_block_near_timestamp(start_ts)?;
        let end_block = self.find_block_near_timestamp(end_ts)?;
        Ok(self.base_fee_percentiles_block_range(start_block, end_block))
    }

    fn base_fee_percentiles_block_range(&self, start_block: u64, end_block: u64) -> BaseFeePercentiles {
        let mut gwei: Vec<u64> = (start_block..=end_block)
            .filter_map(|n| self.store.get_stats(n))
            .map(|s| (s.base_fee.0 / alloy::primitives::U256::from(1_000_000_000u64)).to::<u64>())
            .collect();
        gwei.sort_unstable();
        use feeindex_types::percentile_of_sorted as p;
        BaseFeePercentiles {
            minimum: p(&gwei, 0),
            median: p(&gwei, 50),
            ninetieth: p(&gwei, 90),
            maximum: p(&gwei, 100),
        }
    }

    fn latest_timestamp(&self) -> Result<u64> {
        let latest = self.store.latest_block().get();
        self.store
            .get_stats(latest)
            .map(|s| s.timestamp)
            .ok_or_else(|| ProcessError::NotFound("no blocks processed yet".into()))
    }

    /// Resolve a timestamp to the nearest known block number via iterative
    /// refinement: start from an estimate assuming a flat ~5s block time,
    /// then home in on the target using the five-minute bucket index as a
    /// shortcut, advancing by `gap/120` blocks while more than 40 minutes
    /// away and by one block at a time once close.
    pub fn find_block_near_timestamp(&self, target_ts: u64) -> Result<u64> {
        let latest_block = self.store.latest_block().get();
        let latest_ts = self.latest_timestamp()?;

        let mut n = if let Some(indexed) = self.store.approx_block_for_timestamp(target_ts) {
            indexed
        } else {
            let diff_secs = latest_ts as i64 - target_ts as i64;
            let estimate = latest_block as i64 - diff_secs / 5;
            estimate.clamp(self.network.london_block() as i64, latest_block as i64) as u64
        };

        for _ in 0..MAX_BRACKETING_STEPS {
            let Some(stats) = self.store.get_stats(n) else {
                // Gap at this exact block number; nudge toward the chain
                // head and let the loop re-evaluate.
                n = (n + 1).min(latest_block);
                continue;
            };
            let gap = target_ts as i64 - stats.timestamp as i64;
            if gap == 0 {
                return Ok(n);
            }
            let step = if gap.abs() > COARSE_STEP_THRESHOLD_SECS { gap / 120 } else { gap.signum() };
            let next = (n as i64 + step).clamp(self.network.london_block() as i64, latest_block as i64) as u64;
            if next == n {
                return Ok(n);
            }
            n = next;
        }
        Ok(n)
    }

    /// Refresh the hour/day/month buckets that contain `block`'s
    /// timestamp, folding it into the in-progress bucket (or starting a
    /// new one).
    pub fn observe_block(&self, block_number: u64, timestamp: u64) {
        self.refresh_period(&self.hour, CalendarPeriod::Hour, block_number, timestamp);
        self.refresh_period(&self.day, CalendarPeriod::Day, block_number, timestamp);
        self.refresh_period(&self.month, CalendarPeriod::Month, block_number, timestamp);
    }

    fn refresh_period(
        &self,
        list: &Mutex<ReplaceOrPrependList<CalendarBucket>>,
        period: CalendarPeriod,
        block_number: u64,
        timestamp: u64,
    ) {
        let period_start = period.truncate(timestamp);
        let period_end = period.next(period_start);

        let block_start = self.store.approx_block_for_timestamp(period_start).unwrap_or(block_number);
        let percentiles = self.base_fee_percentiles_block_range(block_start, block_number);
        let totals = self.totals_block_delta(block_start, block_number).unwrap_or_else(|_| WindowTotals {
            id: format!("{block_start}:{block_number}"),
            burned: Default::default(),
            rewards: Default::default(),
            tips: Default::default(),
            issuance: Default::default(),
            duration: 0,
        });

        let bucket = CalendarBucket {
            period,
            period_start,
            period_end,
            burned: totals.burned,
            issuance: totals.issuance,
            rewards: totals.rewards,
            tips: totals.tips,
            duration: timestamp.saturating_sub(period_start),
            base_fee_percentiles: percentiles,
        };

        list.lock().add(bucket, |b| b.period_start.to_string());
    }

    /// The most recent `count` hourly buckets, newest first.
    pub fn hourly(&self, count: usize) -> Vec<CalendarBucket> {
        self.hour.lock().tail(count).into_iter().cloned().collect()
    }

    /// The most recent `count` daily buckets, newest first.
    pub fn daily(&self, count: usize) -> Vec<CalendarBucket> {
        self.day.lock().tail(count).into_iter().cloned().collect()
    }

    /// The most recent `count` monthly buckets, newest first.
    pub fn monthly(&self, count: usize) -> Vec<CalendarBucket> {
        self.month.lock().tail(count).into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeindex_types::BlockStats;

    fn engine_with_blocks(blocks: &[(u64, u64)]) -> AggregationEngine {
        let store = Arc::new(StatsStore::new(1000));
        for &(number, timestamp) in blocks {
            store.put_stats(BlockStats::empty(number, timestamp));
            store.put_totals(number, timestamp, CumulativeTotals::ZERO);
            store.latest_block().update(number);
        }
        AggregationEngine::new(store, NetworkConstants::mainnet())
    }

    #[test]
    fn finds_exact_block_when_present() {
        let blocks: Vec<(u64, u64)> =
            (12_965_000..12_965_100).map(|n| (n, 1_628_166_822 + (n - 12_965_000) * 12)).collect();
        let engine = engine_with_blocks(&blocks);
        let target_ts = 1_628_166_822 + 50 * 12;
        let found = engine.find_block_near_timestamp(target_ts).unwrap();
        assert_eq!(found, 12_965_050);
    }
}
