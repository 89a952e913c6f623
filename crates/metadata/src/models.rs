//! Database models mapping to the records schema.

use sqlx::FromRow;

/// A path and its change fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RecordRow {
    /// Minted once per path; survives content updates and moves.
    pub id: String,
    /// Normalized absolute path (unique).
    pub path: String,
    /// Content checksum; empty for directory records.
    pub checksum: String,
    pub etag: String,
    /// Modification time in Unix seconds.
    pub mtime: i64,
}

/// A record rewritten by a subtree move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedRecord {
    pub id: String,
    pub from: String,
    pub to: String,
}
