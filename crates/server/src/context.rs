//! Per-request context: trace id and verified caller.

use propagator_core::Identity;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to keep log lines bounded.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// The value is truncated to MAX_TRACE_ID_LEN characters and anything
    /// outside printable ASCII is dropped.
    pub fn from_client(value: &str) -> Self {
        // Limit by character count, not byte count, so multi-byte input
        // never splits on a UTF-8 boundary.
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.trim().is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a record operation needs to know about its caller.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub trace_id: TraceId,
    pub identity: Identity,
}

impl RequestContext {
    pub fn new(trace_id: TraceId, identity: Identity) -> Self {
        Self { trace_id, identity }
    }

    /// Username of the verified caller.
    pub fn user(&self) -> &str {
        &self.identity.username
    }
}
