use feeindex_types::{BlockStats, CumulativeTotals};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// Bounded, newest-first ring of the most recent [`BlockStats`].
#[derive(Debug)]
pub struct LatestBlocks {
    blocks: VecDeque<BlockStats>,
    max_blocks: usize,
}

impl LatestBlocks {
    /// Build an empty ring holding at most `max_blocks` entries.
    pub fn new(max_blocks: usize) -> Self {
        Self { blocks: VecDeque::with_capacity(max_blocks), max_blocks }
    }

    /// Add `block` to the front. When `replacing` is set, the current
    /// head is evicted first (used when a duplicate-header re-process
    /// changes a block's stats).
    pub fn add(&mut self, block: BlockStats, replacing: bool) {
        if replacing {
            self.blocks.pop_front();
        }
        self.blocks.push_front(block);
        while self.blocks.len() > self.max_blocks {
            self.blocks.pop_back();
        }
    }

    /// The newest `count` blocks, newest first.
    pub fn tail(&self, count: usize) -> Vec<BlockStats> {
        self.blocks.iter().take(count).copied().collect()
    }

    /// All blocks currently held, newest first.
    pub fn all(&self) -> Vec<BlockStats> {
        self.blocks.iter().copied().collect()
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Monotone counter tracking the highest block number processed.
#[derive(Debug, Default)]
pub struct LatestBlock(AtomicU64);

impl LatestBlock {
    /// A counter starting at zero.
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advance to `candidate` iff it is strictly greater than the current
    /// value. Returns whether the counter advanced.
    pub fn update(&self, candidate: u64) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (candidate > current).then_some(candidate)
            })
            .is_ok()
    }
}

/// A newest-first list where adding an entry replaces the head when its
/// `id` matches (an in-progress bucket/window refresh), or prepends a new
/// entry otherwise.
///
/// Shared shape behind the hour/day/month [`crate::AggregationEngine`]
/// bucket lists.
#[derive(Debug, Default)]
pub struct ReplaceOrPrependList<T> {
    items: VecDeque<T>,
}

impl<T> ReplaceOrPrependList<T> {
    /// An empty list.
    pub const fn new() -> Self {
        Self { items: VecDeque::new() }
    }

    /// Add `item`. `id_of` extracts the comparison key; if it matches the
    /// current head's key, the head is replaced, otherwise `item` is
    /// prepended.
    pub fn add(&mut self, item: T, id_of: impl Fn(&T) -> String) {
        if let Some(head) = self.items.front() {
            if id_of(head) == id_of(&item) {
                self.items[0] = item;
                return;
            }
        }
        self.items.push_front(item);
    }

    /// The newest `count` items, newest first.
    pub fn tail(&self, count: usize) -> Vec<&T> {
        self.items.iter().take(count).collect()
    }

    /// Every item, newest first.
    pub fn all(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// In-memory keyed stores for per-block stats and cumulative totals, plus
/// the latest-block counter and ring.
///
/// Each field is guarded by its own lock; there is no global lock, so a
/// reader of `latest_blocks` never blocks a writer of `stats_by_block`.
#[derive(Debug)]
pub struct StatsStore {
    stats_by_block: Mutex<BTreeMap<u64, BlockStats>>,
    totals_by_block: Mutex<BTreeMap<u64, CumulativeTotals>>,
    /// Coarse five-minute-bucket index over `totals_by_block`, consulted
    /// by the aggregation engine to shrink its block-bracketing search
    /// before doing exact work. See `SPEC_FULL.md` §3
    /// `[SUPPLEMENT] TotalsByTime bucket index`.
    totals_by_time: Mutex<BTreeMap<u64, u64>>,
    latest_block: LatestBlock,
    latest_blocks: Mutex<LatestBlocks>,
}

impl StatsStore {
    /// Build an empty store whose ring holds at most `ring_capacity`
    /// blocks.
    pub fn new(ring_capacity: usize) -> Self {
        Self {
            stats_by_block: Mutex::new(BTreeMap::new()),
            totals_by_block: Mutex::new(BTreeMap::new()),
            totals_by_time: Mutex::new(BTreeMap::new()),
            latest_block: LatestBlock::new(),
            latest_blocks: Mutex::new(LatestBlocks::new(ring_capacity)),
        }
    }

    /// The monotone latest-block counter.
    pub const fn latest_block(&self) -> &LatestBlock {
        &self.latest_block
    }

    /// Insert or replace a block's stats.
    pub fn put_stats(&self, stats: BlockStats) {
        self.stats_by_block.lock().insert(stats.number, stats);
    }

    /// Look up a block's stats.
    pub fn get_stats(&self, number: u64) -> Option<BlockStats> {
        self.stats_by_block.lock().get(&number).copied()
    }

    /// Number of blocks currently held.
    pub fn stats_len(&self) -> usize {
        self.stats_by_block.lock().len()
    }

    /// The highest block number held, if any.
    pub fn highest_stats_block(&self) -> Option<u64> {
        self.stats_by_block.lock().keys().next_back().copied()
    }

    /// Block numbers missing from the contiguous range
    /// `[from, highest_stats_block]`.
    pub fn missing_blocks(&self, from: u64) -> Vec<u64> {
        let map = self.stats_by_block.lock();
        let mut missing = Vec::new();
        let mut prev: Option<u64> = None;
        for &n in map.keys().filter(|&&n| n >= from) {
            if let Some(p) = prev {
                missing.extend((p + 1)..n);
            }
            prev = Some(n);
        }
        missing
    }

    /// Insert or replace a block's cumulative totals, updating the
    /// five-minute bucket index.
    pub fn put_totals(&self, number: u64, timestamp: u64, totals: CumulativeTotals) {
        self.totals_by_block.lock().insert(number, totals);
        self.totals_by_time.lock().insert(timestamp / 300, number);
    }

    /// Look up a block's cumulative totals.
    pub fn get_totals(&self, number: u64) -> Option<CumulativeTotals> {
        self.totals_by_block.lock().get(&number).copied()
    }

    /// The most recent `count` block numbers with totals recorded,
    /// ascending.
    pub fn recent_totals_blocks(&self, count: u64) -> Vec<u64> {
        let map = self.totals_by_block.lock();
        map.keys().rev().take(count as usize).rev().copied().collect()
    }

    /// Approximate block number for a timestamp, via the five-minute
    /// bucket index. Returns the nearest indexed block at or before the
    /// bucket, if any.
    pub fn approx_block_for_timestamp(&self, ts: u64) -> Option<u64> {
        let index = self.totals_by_time.lock();
        index.range(..=(ts / 300)).next_back().map(|(_, &n)| n)
    }

    /// Add a block to the latest-blocks ring.
    pub fn push_latest(&self, block: BlockStats, replacing: bool) {
        self.latest_blocks.lock().add(block, replacing);
    }

    /// The newest `count` blocks in the ring, newest first.
    pub fn latest_tail(&self, count: usize) -> Vec<BlockStats> {
        self.latest_blocks.lock().tail(count)
    }

    /// Every block currently in the ring, newest first.
    pub fn latest_all(&self) -> Vec<BlockStats> {
        self.latest_blocks.lock().all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_block_is_monotone() {
        let l = LatestBlock::new();
        assert!(l.update(5));
        assert_eq!(l.get(), 5);
        assert!(!l.update(3));
        assert_eq!(l.get(), 5);
        assert!(l.update(6));
        assert_eq!(l.get(), 6);
    }

    #[test]
    fn latest_blocks_evicts_oldest_past_capacity() {
        let mut ring = LatestBlocks::new(2);
        ring.add(BlockStats::empty(1, 0), false);
        ring.add(BlockStats::empty(2, 0), false);
        ring.add(BlockStats::empty(3, 0), false);
        let all = ring.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].number, 3);
        assert_eq!(all[1].number, 2);
    }

    #[test]
    fn latest_blocks_replacing_evicts_head_first() {
        let mut ring = LatestBlocks::new(5);
        ring.add(BlockStats::empty(1, 0), false);
        ring.add(BlockStats::empty(2, 0), false);
        ring.add(BlockStats::empty(2, 100), true);
        let all = ring.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].timestamp, 100);
    }

    #[test]
    fn store_finds_gaps() {
        let store = StatsStore::new(10);
        for n in [100u64, 101, 103] {
            store.put_stats(BlockStats::empty(n, 0));
        }
        assert_eq!(store.missing_blocks(100), vec![102]);
    }

    #[test]
    fn replace_or_prepend_list_replaces_matching_head() {
        let mut list = ReplaceOrPrependList::new();
        list.add(("a".to_owned(), 1), |(id, _)| id.clone());
        list.add(("a".to_owned(), 2), |(id, _)| id.clone());
        list.add(("b".to_owned(), 3), |(id, _)| id.clone());
        let all: Vec<_> = list.all().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1, 3);
        assert_eq!(all[1].1, 2);
    }
}
