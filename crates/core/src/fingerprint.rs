//! Change fingerprints.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Current time as Unix seconds.
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// The `(etag, mtime)` pair identifying a path's version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Opaque version tag, regenerated on every mutation.
    pub etag: String,
    /// Modification time in Unix seconds.
    pub mtime: i64,
}

impl Fingerprint {
    /// Create a fingerprint from its parts.
    pub fn new(etag: impl Into<String>, mtime: i64) -> Self {
        Self {
            etag: etag.into(),
            mtime,
        }
    }

    /// Mint a new etag stamped with the current time.
    pub fn fresh() -> Self {
        Self::at(unix_now())
    }

    /// Mint a new etag stamped with `mtime`.
    pub fn at(mtime: i64) -> Self {
        Self {
            etag: new_etag(),
            mtime,
        }
    }
}

/// Generate a new opaque etag.
pub fn new_etag() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new record identifier.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_fingerprints_differ() {
        let a = Fingerprint::fresh();
        let b = Fingerprint::fresh();
        assert_ne!(a.etag, b.etag);
        assert!(b.mtime >= a.mtime);
    }
}
