//! Test fixtures for paths, records and callers.

use propagator_core::fingerprint::unix_now;
use propagator_core::{Identity, RecordPath};
use propagator_metadata::RecordRow;
use propagator_server::{RequestContext, TraceId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique record ids.
static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Home directory of `user` under the default four-segment layout.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn home(user: &str) -> String {
    let initial = user.chars().next().unwrap_or('x');
    format!("/local/users/{initial}/{user}")
}

/// Parse a path, panicking on invalid input.
#[allow(dead_code)]
pub fn path(raw: &str) -> RecordPath {
    RecordPath::parse(raw).expect("valid test path")
}

/// A record row with a unique id stamped `age_secs` in the past.
#[allow(dead_code)]
pub fn aged_row(path: &str, checksum: &str, age_secs: i64) -> RecordRow {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    RecordRow {
        id: format!("seed-{n}"),
        path: path.to_string(),
        checksum: checksum.to_string(),
        etag: format!("seed-etag-{n}"),
        mtime: unix_now() - age_secs,
    }
}

/// A record row with a fixed id and mtime.
#[allow(dead_code)]
pub fn row(id: &str, path: &str, mtime: i64) -> RecordRow {
    RecordRow {
        id: id.to_string(),
        path: path.to_string(),
        checksum: format!("ck-{id}"),
        etag: format!("etag-{id}"),
        mtime,
    }
}

/// A verified caller context for `user`.
#[allow(dead_code)]
pub fn ctx(user: &str) -> RequestContext {
    RequestContext::new(TraceId::new(), Identity::new(user))
}
