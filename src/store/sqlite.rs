// SQLite store. One row per (snapshot, metric) keyed by the full calendar key;
// reads group rows by a key prefix with row-value range comparison.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use super::{Store, StoreError};
use crate::bucket::{self, BucketKey, GroupedRow, KEY_COLUMNS};
use crate::models::Snapshot;

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn open(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                day INTEGER NOT NULL,
                hour INTEGER NOT NULL,
                minute INTEGER NOT NULL,
                second INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                value INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_counts_key ON counts(name, year, month, day, hour, minute, second)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS timings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                day INTEGER NOT NULL,
                hour INTEGER NOT NULL,
                minute INTEGER NOT NULL,
                second INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                sum INTEGER NOT NULL,
                count INTEGER NOT NULL,
                min INTEGER NOT NULL,
                max INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_timings_key ON timings(name, year, month, day, hour, minute, second)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(
        skip(self, snapshot),
        fields(
            store = "sqlite",
            operation = "write",
            counts = snapshot.counts.len(),
            timings = snapshot.timings.len()
        )
    )]
    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if snapshot.is_empty() {
            return Ok(());
        }
        let created_at = snapshot.timestamp.timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for (name, count) in &snapshot.counts {
            let key = bucket::encode(name, snapshot.timestamp);
            let query = sqlx::query(
                "INSERT INTO counts (name, year, month, day, hour, minute, second, created_at, value) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(name.as_str());
            bind_parts(query, &key)
                .bind(created_at)
                .bind(count.value)
                .execute(&mut *tx)
                .await?;
        }

        for (name, timing) in &snapshot.timings {
            let key = bucket::encode(name, snapshot.timestamp);
            let query = sqlx::query(
                "INSERT INTO timings (name, year, month, day, hour, minute, second, created_at, sum, count, min, max) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(name.as_str());
            bind_parts(query, &key)
                .bind(created_at)
                .bind(timing.sum)
                .bind(timing.count)
                .bind(timing.min)
                .bind(timing.max)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(store = "sqlite", operation = "names"))]
    async fn names(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM counts UNION SELECT name FROM timings ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.try_get::<String, _>("name")?);
        }
        Ok(out)
    }

    #[instrument(
        skip(self, start, end),
        fields(store = "sqlite", operation = "scan_counts", name = start.name(), depth = start.depth())
    )]
    async fn scan_counts(
        &self,
        start: &BucketKey,
        end: &BucketKey,
    ) -> Result<Vec<GroupedRow>, StoreError> {
        let depth = start.depth().min(end.depth());
        let sql = grouped_scan_sql(depth);
        let query = sqlx::query(&sql).bind(start.name());
        let query = bind_parts(query, &start.truncate(depth));
        let rows = bind_parts(query, &end.truncate(depth))
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut parts = Vec::with_capacity(depth);
            for i in 0..depth {
                parts.push(row.try_get::<i32, _>(i)?);
            }
            out.push(GroupedRow {
                key: BucketKey::new(start.name(), parts)?,
                sum: row.try_get("sum")?,
                count: row.try_get("count")?,
            });
        }
        Ok(out)
    }
}

/// Bind the calendar components of `key`, in key order.
fn bind_parts<'q>(mut query: SqliteQuery<'q>, key: &BucketKey) -> SqliteQuery<'q> {
    for part in key.parts() {
        query = query.bind(*part);
    }
    query
}

/// Grouped range scan at `depth` key components. Binds: name, `depth` start parts, `depth` end parts.
/// `TOTAL` sums as REAL and never raises on overflow, unlike integer `SUM`.
fn grouped_scan_sql(depth: usize) -> String {
    let cols = KEY_COLUMNS[..depth].join(", ");
    let params = vec!["?"; depth].join(", ");
    format!(
        "SELECT {cols}, TOTAL(value) AS sum, COUNT(*) AS count FROM counts \
         WHERE name = ? AND ({cols}) >= ({params}) AND ({cols}) <= ({params}) \
         GROUP BY {cols} ORDER BY {cols}"
    )
}
