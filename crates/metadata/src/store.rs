//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::RecordRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: RecordRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite store and apply the schema.
    ///
    /// `":memory:"` opens a private in-memory database that lives as long as
    /// the store.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_secs: Option<u64>) -> MetadataResult<Self> {
        let path = path.as_ref();
        let busy_timeout = Duration::from_secs(busy_timeout_secs.unwrap_or(5));
        let in_memory = path.as_os_str() == ":memory:";

        let opts = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        let opts = opts.busy_timeout(busy_timeout);

        // A single connection serializes writers: SQLite permits one writer at
        // a time and this keeps subtree moves free of lock-upgrade failures.
        // The in-memory database disappears with its connection, so it must
        // never be recycled.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), in_memory, "SQLite record store opened");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::{MovedRecord, RecordRow};
    use propagator_core::RecordPath;

    const SUBTREE_FILTER: &str = "(path = ? OR (path >= ? AND path < ?))";

    #[async_trait]
    impl RecordRepo for SqliteStore {
        async fn get_record(&self, path: &RecordPath) -> MetadataResult<Option<RecordRow>> {
            let row = sqlx::query_as::<_, RecordRow>(
                "SELECT id, path, checksum, etag, mtime FROM records WHERE path = ?",
            )
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn find_by_prefix(&self, prefix: &RecordPath) -> MetadataResult<Vec<RecordRow>> {
            let (lo, hi) = prefix.subtree_range();
            let rows = sqlx::query_as::<_, RecordRow>(&format!(
                "SELECT id, path, checksum, etag, mtime FROM records WHERE {SUBTREE_FILTER} ORDER BY path"
            ))
            .bind(prefix.as_str())
            .bind(lo)
            .bind(hi)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn upsert_record(&self, row: &RecordRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO records (id, path, checksum, etag, mtime)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(path) DO UPDATE SET
                    checksum = excluded.checksum,
                    etag = excluded.etag,
                    mtime = excluded.mtime
                "#,
            )
            .bind(&row.id)
            .bind(&row.path)
            .bind(&row.checksum)
            .bind(&row.etag)
            .bind(row.mtime)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn update_fingerprint_if_newer(
            &self,
            path: &RecordPath,
            etag: &str,
            mtime: i64,
        ) -> MetadataResult<u64> {
            let result =
                sqlx::query("UPDATE records SET etag = ?, mtime = ? WHERE path = ? AND mtime < ?")
                    .bind(etag)
                    .bind(mtime)
                    .bind(path.as_str())
                    .bind(mtime)
                    .execute(&self.pool)
                    .await?;
            Ok(result.rows_affected())
        }

        async fn insert_placeholder(&self, row: &RecordRow) -> MetadataResult<bool> {
            let result = sqlx::query(
                r#"
                INSERT INTO records (id, path, checksum, etag, mtime)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(path) DO NOTHING
                "#,
            )
            .bind(&row.id)
            .bind(&row.path)
            .bind(&row.checksum)
            .bind(&row.etag)
            .bind(row.mtime)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn delete_by_prefix_before(
            &self,
            prefix: &RecordPath,
            cutoff: i64,
        ) -> MetadataResult<u64> {
            let (lo, hi) = prefix.subtree_range();
            let result = sqlx::query(&format!(
                "DELETE FROM records WHERE {SUBTREE_FILTER} AND mtime < ?"
            ))
            .bind(prefix.as_str())
            .bind(lo)
            .bind(hi)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }

        async fn move_subtree(
            &self,
            src: &RecordPath,
            dst: &RecordPath,
            etag: &str,
            mtime: i64,
        ) -> MetadataResult<Vec<MovedRecord>> {
            if dst != src && dst.is_within(src) {
                return Err(MetadataError::Constraint(format!(
                    "cannot move {src} into its own subtree {dst}"
                )));
            }

            // The match and the rewrite share one transaction so no writer can
            // slip a record into the subtree between them. Dropping `tx` on an
            // early return rolls everything back.
            let mut tx = self.pool.begin().await?;

            let (lo, hi) = src.subtree_range();
            let rows = sqlx::query_as::<_, RecordRow>(&format!(
                "SELECT id, path, checksum, etag, mtime FROM records WHERE {SUBTREE_FILTER} ORDER BY length(path), path"
            ))
            .bind(src.as_str())
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *tx)
            .await?;

            // Shortest paths first. Each rename shortens a path by the same
            // amount, so when dst is an ancestor of src any row still holding
            // a target name is shorter than the row being renamed onto it and
            // has already moved away. Otherwise the two subtrees are disjoint.
            let mut moved = Vec::with_capacity(rows.len());
            for row in rows {
                let from = RecordPath::parse(&row.path).map_err(|e| {
                    MetadataError::Internal(format!("stored path {} is invalid: {e}", row.path))
                })?;
                let to = from.rebase(src, dst).ok_or_else(|| {
                    MetadataError::Internal(format!("{from} is not within {src}"))
                })?;

                let result = sqlx::query("UPDATE records SET path = ?, etag = ?, mtime = ? WHERE id = ?")
                    .bind(to.as_str())
                    .bind(etag)
                    .bind(mtime)
                    .bind(&row.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| match e {
                        sqlx::Error::Database(db) if db.is_unique_violation() => {
                            MetadataError::Constraint(format!("{to} already exists"))
                        }
                        other => MetadataError::Database(other),
                    })?;

                if result.rows_affected() != 1 {
                    return Err(MetadataError::Internal(format!(
                        "record {} vanished during move",
                        row.id
                    )));
                }

                moved.push(MovedRecord {
                    id: row.id,
                    from: from.into(),
                    to: to.into(),
                });
            }

            tx.commit().await?;
            Ok(moved)
        }

        async fn count_records(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    checksum TEXT NOT NULL DEFAULT '',
    etag TEXT NOT NULL,
    mtime INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_mtime ON records(mtime);
"#;
