//! Record repository.

use crate::error::MetadataResult;
use crate::models::{MovedRecord, RecordRow};
use async_trait::async_trait;
use propagator_core::RecordPath;

/// Repository for path fingerprint records.
///
/// Prefix arguments match whole path segments: `/a/b` covers `/a/b` and
/// everything beneath it, never `/a/bc`.
#[async_trait]
pub trait RecordRepo: Send + Sync {
    /// Get the record at an exact path.
    async fn get_record(&self, path: &RecordPath) -> MetadataResult<Option<RecordRow>>;

    /// Get every record in the subtree rooted at `prefix`, ordered by path.
    async fn find_by_prefix(&self, prefix: &RecordPath) -> MetadataResult<Vec<RecordRow>>;

    /// Insert a record, or replace checksum/etag/mtime of the record already
    /// holding `row.path`. The existing id is kept on conflict.
    async fn upsert_record(&self, row: &RecordRow) -> MetadataResult<()>;

    /// Set etag/mtime on the record at `path` only when its stored mtime is
    /// strictly older than `mtime`. Returns the number of rows changed.
    async fn update_fingerprint_if_newer(
        &self,
        path: &RecordPath,
        etag: &str,
        mtime: i64,
    ) -> MetadataResult<u64>;

    /// Insert a record only if its path is free. Returns whether a row was
    /// inserted.
    async fn insert_placeholder(&self, row: &RecordRow) -> MetadataResult<bool>;

    /// Delete every record in the subtree whose mtime is older than
    /// `cutoff`. Returns the number of rows deleted.
    async fn delete_by_prefix_before(&self, prefix: &RecordPath, cutoff: i64)
    -> MetadataResult<u64>;

    /// Move the subtree at `src` under `dst` in one transaction, stamping
    /// every moved record with `etag`/`mtime`. Ids and checksums are kept.
    /// Nothing is moved if any row fails.
    async fn move_subtree(
        &self,
        src: &RecordPath,
        dst: &RecordPath,
        etag: &str,
        mtime: i64,
    ) -> MetadataResult<Vec<MovedRecord>>;

    /// Total number of records.
    async fn count_records(&self) -> MetadataResult<u64>;
}
