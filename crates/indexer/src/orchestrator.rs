use crate::aggregation::AggregationEngine;
use crate::error::Result;
use crate::processor::{BlockProcessor, ProcessedBlock};
use crate::store::StatsStore;
use feeindex_constants::NetworkConstants;
use feeindex_persist::Repository;
use feeindex_rpc::{HeadSubscription, UpstreamClient};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

/// Tunables for [`SyncOrchestrator`].
#[derive(Debug, Clone, Copy)]
pub struct SyncOrchestratorConfig {
    /// Block count flushed to the persistence layer per catch-up batch.
    pub catch_up_batch_size: u64,
    /// Poll interval while waiting for the upstream node to finish
    /// syncing.
    pub sync_poll_interval: Duration,
    /// Sleep after a duplicate-header re-process before resuming the live
    /// loop.
    pub duplicate_header_pause: Duration,
}

impl Default for SyncOrchestratorConfig {
    fn default() -> Self {
        Self {
            catch_up_batch_size: 100,
            sync_poll_interval: Duration::from_secs(5),
            duplicate_header_pause: Duration::from_millis(100),
        }
    }
}

/// Drives the store from cold start to chain head, then live-tails new
/// blocks from the upstream node's `newHeads` subscription.
pub struct SyncOrchestrator<R: Repository> {
    rpc: UpstreamClient,
    processor: BlockProcessor,
    store: Arc<StatsStore>,
    aggregation: Arc<AggregationEngine>,
    repository: Arc<R>,
    network: NetworkConstants,
    config: SyncOrchestratorConfig,
    /// Fan-out sink: every processed (non-duplicate-unchanged) block is
    /// sent here for the subscription hub to broadcast.
    broadcast: broadcast::Sender<ProcessedBlock>,
}

impl<R: Repository> SyncOrchestrator<R> {
    /// Build a new orchestrator. `broadcast` is the channel the
    /// subscription hub subscribes to for live block pushes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc: UpstreamClient,
        processor: BlockProcessor,
        store: Arc<StatsStore>,
        aggregation: Arc<AggregationEngine>,
        repository: Arc<R>,
        network: NetworkConstants,
        config: SyncOrchestratorConfig,
        broadcast: broadcast::Sender<ProcessedBlock>,
    ) -> Self {
        Self { rpc, processor, store, aggregation, repository, network, config, broadcast }
    }

    /// Run the full startup sequence: wait for upstream sync, load the
    /// persisted store, catch up to chain head, fill gaps, rebuild
    /// totals, rebuild calendar buckets, and populate the latest-blocks
    /// ring. Does not start live tailing.
    pub async fn startup(&self) -> Result<()> {
        self.wait_for_upstream_sync().await?;

        let highest_in_db = self.repository.highest_block_number().await?;
        for stats in self.repository.all_block_stats().await? {
            self.store.put_stats(stats);
        }
        info!(blocks_loaded = self.store.stats_len(), "loaded persisted stats");

        self.catch_up(highest_in_db).await?;
        self.fill_gaps().await?;
        self.rebuild_totals();
        self.rebuild_calendar_buckets();

        let tail = self.repository.all_block_stats().await?;
        for block in tail.into_iter().rev().take(300) {
            self.store.push_latest(block, false);
        }

        Ok(())
    }

    async fn wait_for_upstream_sync(&self) -> Result<()> {
        loop {
            match self.rpc.eth_syncing().await? {
                None => return Ok(()),
                Some(progress) => {
                    warn!(?progress, "upstream node still syncing, waiting");
                    tokio::time::sleep(self.config.sync_poll_interval).await;
                }
            }
        }
    }

    async fn catch_up(&self, highest_in_db: Option<u64>) -> Result<()> {
        let mut next = highest_in_db.map(|h| h + 1).unwrap_or_else(|| self.network.london_block());
        let mut batch = Vec::new();

        loop {
            let latest = self.rpc.eth_block_number().await?;
            if next > latest {
                break;
            }
            while next <= latest {
                let processed = self.processor.process(next, false).await?;
                self.store.put_stats(processed.stats);
                batch.push((processed.stats, processed.percentiles));
                next += 1;
                if batch.len() as u64 >= self.config.catch_up_batch_size {
                    self.repository.add_blocks(&batch).await?;
                    batch.clear();
                }
            }
        }
        if !batch.is_empty() {
            self.repository.add_blocks(&batch).await?;
        }
        Ok(())
    }

    async fn fill_gaps(&self) -> Result<()> {
        for number in self.missing_block_numbers() {
            match self.processor.process(number, true).await {
                Ok(processed) => {
                    self.store.put_stats(processed.stats);
                    self.repository.add_block(&processed.stats, &processed.percentiles).await?;
                }
                Err(e) => error!(block_number = number, error = %e, "failed to fill gap"),
            }
        }
        Ok(())
    }

    fn missing_block_numbers(&self) -> Vec<u64> {
        let mut missing = self.store.missing_blocks(self.network.london_block());
        if self.store.get_stats(self.network.london_block()).is_none() {
            missing.insert(0, self.network.london_block());
        }
        missing
    }

    fn rebuild_totals(&self) {
        let mut running = feeindex_types::CumulativeTotals::ZERO;
        let highest = self.store.highest_stats_block().unwrap_or(self.network.london_block());
        for number in self.network.london_block()..=highest {
            let Some(stats) = self.store.get_stats(number) else { continue };
            let duration = stats.timestamp.saturating_sub(self.network.london_timestamp());
            running = running.accumulate(stats.burned, stats.rewards, stats.tips, duration);
            self.store.put_totals(number, stats.timestamp, running);
        }
    }

    fn rebuild_calendar_buckets(&self) {
        let highest = self.store.highest_stats_block().unwrap_or(self.network.london_block());
        for number in self.network.london_block()..=highest {
            if let Some(stats) = self.store.get_stats(number) {
                self.aggregation.observe_block(stats.number, stats.timestamp);
            }
        }
    }

    /// Recompute cumulative totals for the 10 most recent blocks,
    /// absorbing any late gap-fill.
    fn update_recent_totals(&self, up_to: u64) {
        let from = up_to.saturating_sub(10).max(self.network.london_block());
        let mut running = if from == self.network.london_block() {
            feeindex_types::CumulativeTotals::ZERO
        } else {
            self.store.get_totals(from - 1).unwrap_or(feeindex_types::CumulativeTotals::ZERO)
        };
        for number in from..=up_to {
            let Some(stats) = self.store.get_stats(number) else { continue };
            let duration = stats.timestamp.saturating_sub(self.network.london_timestamp());
            running = running.accumulate(stats.burned, stats.rewards, stats.tips, duration);
            self.store.put_totals(number, stats.timestamp, running);
        }
    }

    /// Process one block end-to-end: compute, store, recompute recent
    /// totals, refresh calendar buckets, persist, and push to the
    /// broadcast channel (unless `duplicate` and the result is
    /// unchanged).
    async fn process_and_publish(&self, number: u64, duplicate: bool) -> Result<()> {
        let processed = self.processor.process(number, duplicate).await?;

        if duplicate {
            if let Some(existing) = self.store.get_stats(number) {
                if existing == processed.stats {
                    return Ok(());
                }
            }
        }

        self.store.put_stats(processed.stats);
        self.update_recent_totals(number);
        for missing in self.store.missing_blocks(self.network.london_block()) {
            if let Ok(filled) = self.processor.process(missing, true).await {
                self.store.put_stats(filled.stats);
                self.repository.add_block(&filled.stats, &filled.percentiles).await?;
            }
        }
        self.aggregation.observe_block(processed.stats.number, processed.stats.timestamp);
        self.repository.add_block(&processed.stats, &processed.percentiles).await?;
        self.store.push_latest(processed.stats, duplicate);
        self.store.latest_block().update(number);

        let _ = self.broadcast.send(processed);
        Ok(())
    }

    /// Begin live-tailing the upstream `newHeads` feed. Runs until the
    /// process is shut down; reconnects on upstream failure with a fixed
    /// backoff (handled inside [`HeadSubscription`]).
    pub async fn run_live(&self, head_subscription: HeadSubscription) {
        let (tx, mut rx) = mpsc::channel::<Value>(16);
        tokio::spawn(head_subscription.run(tx));

        while let Some(header) = rx.recv().await {
            let Some(number_hex) = header.get("number").and_then(Value::as_str) else { continue };
            let Ok(number) = feeindex_rpc::parse_hex_u64(number_hex) else { continue };

            let last = self.store.latest_block().get();
            if number == last {
                if last == 0 {
                    continue;
                }
                if let Err(e) = self.process_and_publish(last - 1, true).await {
                    error!(block_number = last - 1, error = %e, "failed to re-process duplicate header");
                }
                tokio::time::sleep(self.config.duplicate_header_pause).await;
                continue;
            }

            if let Err(e) = self.process_and_publish(number, false).await {
                error!(block_number = number, error = %e, "failed to process new block");
            }
        }
    }
}
