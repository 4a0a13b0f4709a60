//! Core data model.

mod block_stats;
pub use block_stats::{BlockStats, BlockStatsPercentiles};

mod totals;
pub use totals::{CumulativeTotals, WindowTotals};

mod calendar;
pub use calendar::{BaseFeePercentiles, CalendarBucket, CalendarPeriod};

mod percentile;
pub use percentile::{percentile_of_sorted, PERCENTILE_RANKS};
