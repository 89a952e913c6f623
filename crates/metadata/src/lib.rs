//! Record store for the propagator service.
//!
//! One table of `path -> (id, checksum, etag, mtime)` records with:
//! - exact and segment-bounded subtree lookups
//! - atomic upsert keyed on path
//! - mtime-guarded fingerprint updates
//! - cutoff-guarded subtree deletes
//! - transactional subtree moves

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{MovedRecord, RecordRow};
pub use repos::RecordRepo;
pub use store::{MetadataStore, SqliteStore};

use propagator_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            busy_timeout_secs,
        } => {
            let store = SqliteStore::new(path, Some(*busy_timeout_secs)).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
