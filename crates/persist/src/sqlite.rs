use crate::error::{Result, StoreError};
use crate::repository::Repository;
use async_trait::async_trait;
use feeindex_types::{BlockStats, BlockStatsPercentiles, HexU256};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::instrument;

/// SQLite-backed [`Repository`] implementation.
///
/// Monetary fields are stored as `0x`-prefixed hex text, never as a native
/// SQLite integer column, since SQLite's integers are signed 64-bit and
/// cannot hold the values this system routinely produces.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (creating if absent) the SQLite database at `path` and run
    /// pending migrations.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(8).connect(connection_string).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| StoreError::Database(e.into()))?;
        Ok(Self { pool })
    }

    /// Wrap an already-open pool (used by tests against an in-memory
    /// database).
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    #[instrument(skip(self))]
    async fn highest_block_number(&self) -> Result<Option<u64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT MAX(number) FROM block_stats")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|(n,)| if n < 0 { None } else { Some(n as u64) }))
    }

    #[instrument(skip(self))]
    async fn all_block_stats(&self) -> Result<Vec<BlockStats>> {
        let rows: Vec<BlockStatsRow> = sqlx::query_as(
            "SELECT number, timestamp, base_fee, burned, gas_target, gas_used, priority_fee, \
             rewards, tips, transactions, type2_transactions FROM block_stats ORDER BY number ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BlockStatsRow::into_stats).collect()
    }

    #[instrument(skip(self, stats, percentiles))]
    async fn add_block(&self, stats: &BlockStats, percentiles: &BlockStatsPercentiles) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_block(&mut tx, stats).await?;
        upsert_percentiles(&mut tx, percentiles).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, rows))]
    async fn add_blocks(&self, rows: &[(BlockStats, BlockStatsPercentiles)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (stats, percentiles) in rows {
            upsert_block(&mut tx, stats).await?;
            upsert_percentiles(&mut tx, percentiles).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn missing_block_numbers(&self, from_block: u64) -> Result<Vec<u64>> {
        let numbers: Vec<(i64,)> =
            sqlx::query_as("SELECT number FROM block_stats WHERE number >= ? ORDER BY number ASC")
                .bind(from_block as i64)
                .fetch_all(&self.pool)
                .await?;
        let mut missing = Vec::new();
        let mut prev: Option<i64> = None;
        for (n,) in numbers {
            if let Some(p) = prev {
                for gap in (p + 1)..n {
                    missing.push(gap as u64);
                }
            }
            prev = Some(n);
        }
        Ok(missing)
    }
}

async fn upsert_block(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, stats: &BlockStats) -> Result<()> {
    sqlx::query(
        "INSERT INTO block_stats (number, timestamp, base_fee, burned, gas_target, gas_used, \
         priority_fee, rewards, tips, transactions, type2_transactions) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(number) DO UPDATE SET \
            timestamp = excluded.timestamp, base_fee = excluded.base_fee, burned = excluded.burned, \
            gas_target = excluded.gas_target, gas_used = excluded.gas_used, \
            priority_fee = excluded.priority_fee, rewards = excluded.rewards, tips = excluded.tips, \
            transactions = excluded.transactions, type2_transactions = excluded.type2_transactions",
    )
    .bind(stats.number as i64)
    .bind(stats.timestamp as i64)
    .bind(stats.base_fee.to_hex_string())
    .bind(stats.burned.to_hex_string())
    .bind(stats.gas_target.to_hex_string())
    .bind(stats.gas_used.to_hex_string())
    .bind(stats.priority_fee.to_hex_string())
    .bind(stats.rewards.to_hex_string())
    .bind(stats.tips.to_hex_string())
    .bind(stats.transactions as i64)
    .bind(stats.type2_transactions as i64)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_percentiles(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    p: &BlockStatsPercentiles,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO block_stats_percentiles (number, metric, minimum, tenth, twenty_fifth, \
         median, seventy_fifth, ninetieth, ninety_fifth, ninety_ninth, maximum) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(number, metric) DO UPDATE SET \
            minimum = excluded.minimum, tenth = excluded.tenth, twenty_fifth = excluded.twenty_fifth, \
            median = excluded.median, seventy_fifth = excluded.seventy_fifth, \
            ninetieth = excluded.ninetieth, ninety_fifth = excluded.ninety_fifth, \
            ninety_ninth = excluded.ninety_ninth, maximum = excluded.maximum",
    )
    .bind(p.number as i64)
    .bind(&p.metric)
    .bind(p.minimum as i64)
    .bind(p.tenth as i64)
    .bind(p.twenty_fifth as i64)
    .bind(p.median as i64)
    .bind(p.seventy_fifth as i64)
    .bind(p.ninetieth as i64)
    .bind(p.ninety_fifth as i64)
    .bind(p.ninety_ninth as i64)
    .bind(p.maximum as i64)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct BlockStatsRow {
    number: i64,
    timestamp: i64,
    base_fee: String,
    burned: String,
    gas_target: String,
    gas_used: String,
    priority_fee: String,
    rewards: String,
    tips: String,
    transactions: i64,
    type2_transactions: i64,
}

impl BlockStatsRow {
    fn into_stats(self) -> Result<BlockStats> {
        let hex = |s: &str| -> Result<HexU256> { s.parse().map_err(|_| StoreError::Decode(s.to_owned())) };
        Ok(BlockStats {
            number: self.number as u64,
            timestamp: self.timestamp as u64,
            base_fee: hex(&self.base_fee)?,
            burned: hex(&self.burned)?,
            gas_target: hex(&self.gas_target)?,
            gas_used: hex(&self.gas_used)?,
            priority_fee: hex(&self.priority_fee)?,
            rewards: hex(&self.rewards)?,
            tips: hex(&self.tips)?,
            transactions: self.transactions as u64,
            type2_transactions: self.type2_transactions as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeindex_types::BlockStatsPercentiles;

    async fn memory_repo() -> SqliteRepository {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteRepository::from_pool(pool)
    }

    #[tokio::test]
    async fn add_block_is_idempotent() {
        let repo = memory_repo().await;
        let stats = BlockStats::empty(12_965_000, 1_628_166_822);
        let percentiles = BlockStatsPercentiles::from_sorted(stats.number, &[]);

        repo.add_block(&stats, &percentiles).await.unwrap();
        repo.add_block(&stats, &percentiles).await.unwrap();

        let all = repo.all_block_stats().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].number, 12_965_000);
    }

    #[tokio::test]
    async fn missing_block_numbers_finds_gaps() {
        let repo = memory_repo().await;
        for n in [100u64, 101, 103, 105] {
            let stats = BlockStats::empty(n, 0);
            let percentiles = BlockStatsPercentiles::from_sorted(n, &[]);
            repo.add_block(&stats, &percentiles).await.unwrap();
        }
        let missing = repo.missing_block_numbers(100).await.unwrap();
        assert_eq!(missing, vec![102, 104]);
    }
}
