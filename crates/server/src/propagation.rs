//! Ancestor fingerprint propagation.
//!
//! After a record changes, every ancestor between the owning home directory
//! and the record's parent receives the same fingerprint, so clients polling
//! any directory see that something below it changed. Each ancestor update is
//! guarded by a strict `mtime` comparison and ancestors never regress.
//!
//! Propagation is best effort: per-ancestor failures are logged and reported
//! in a [`PropagationReport`], never returned to the caller.

use crate::context::TraceId;
use propagator_core::fingerprint::new_record_id;
use propagator_core::{Fingerprint, PathLayout, RecordPath};
use propagator_metadata::{MetadataStore, RecordRow};
use std::sync::Arc;

/// What happened to one ancestor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AncestorStatus {
    /// Existing record took the new fingerprint.
    Updated,
    /// No record existed and a placeholder was inserted.
    Created,
    /// The stored fingerprint is as new or newer; left untouched.
    Stale,
    /// The store rejected the update.
    Failed(String),
}

/// Outcome for a single ancestor.
#[derive(Clone, Debug)]
pub struct AncestorOutcome {
    pub path: RecordPath,
    pub status: AncestorStatus,
}

/// Per-ancestor outcomes of one propagation pass, ordered from the home
/// directory down to the parent.
#[derive(Clone, Debug, Default)]
pub struct PropagationReport {
    pub outcomes: Vec<AncestorOutcome>,
    /// Set when the ancestor list itself could not be computed.
    pub error: Option<String>,
}

impl PropagationReport {
    /// Whether every ancestor was reached without a store error.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.failures().next().is_none()
    }

    /// Ancestors whose update failed.
    pub fn failures(&self) -> impl Iterator<Item = &AncestorOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, AncestorStatus::Failed(_)))
    }

    /// Status recorded for `path`, if it was an ancestor.
    pub fn status_of(&self, path: &RecordPath) -> Option<&AncestorStatus> {
        self.outcomes
            .iter()
            .find(|o| &o.path == path)
            .map(|o| &o.status)
    }

    fn count(&self, status: fn(&AncestorStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| status(&o.status)).count()
    }
}

/// Pushes fingerprints up the tree.
#[derive(Clone)]
pub struct Propagator {
    store: Arc<dyn MetadataStore>,
    layout: PathLayout,
    create_missing: bool,
}

impl Propagator {
    pub fn new(store: Arc<dyn MetadataStore>, layout: PathLayout, create_missing: bool) -> Self {
        Self {
            store,
            layout,
            create_missing,
        }
    }

    /// Apply `fingerprint` to every ancestor of `path`.
    pub async fn propagate(
        &self,
        path: &RecordPath,
        fingerprint: &Fingerprint,
        trace_id: &TraceId,
    ) -> PropagationReport {
        let ancestors = match self.layout.ancestors(path) {
            Ok(ancestors) => ancestors,
            Err(e) => {
                tracing::warn!(
                    trace_id = %trace_id,
                    path = %path,
                    error = %e,
                    "Cannot resolve ancestors, skipping propagation"
                );
                return PropagationReport {
                    outcomes: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        let mut report = PropagationReport {
            outcomes: Vec::with_capacity(ancestors.len()),
            error: None,
        };

        for ancestor in ancestors {
            let status = self.apply(&ancestor, fingerprint).await;
            if let AncestorStatus::Failed(reason) = &status {
                tracing::warn!(
                    trace_id = %trace_id,
                    origin = %path,
                    ancestor = %ancestor,
                    error = %reason,
                    "Ancestor propagation failed"
                );
            }
            report.outcomes.push(AncestorOutcome {
                path: ancestor,
                status,
            });
        }

        tracing::debug!(
            trace_id = %trace_id,
            origin = %path,
            etag = %fingerprint.etag,
            mtime = fingerprint.mtime,
            updated = report.count(|s| *s == AncestorStatus::Updated),
            created = report.count(|s| *s == AncestorStatus::Created),
            stale = report.count(|s| *s == AncestorStatus::Stale),
            failed = report.count(|s| matches!(s, AncestorStatus::Failed(_))),
            "Propagation finished"
        );

        report
    }

    async fn apply(&self, ancestor: &RecordPath, fingerprint: &Fingerprint) -> AncestorStatus {
        match self
            .store
            .update_fingerprint_if_newer(ancestor, &fingerprint.etag, fingerprint.mtime)
            .await
        {
            Ok(0) => {}
            Ok(_) => return AncestorStatus::Updated,
            Err(e) => return AncestorStatus::Failed(e.to_string()),
        }

        if !self.create_missing {
            return AncestorStatus::Stale;
        }

        let placeholder = RecordRow {
            id: new_record_id(),
            path: ancestor.as_str().to_string(),
            checksum: String::new(),
            etag: fingerprint.etag.clone(),
            mtime: fingerprint.mtime,
        };
        match self.store.insert_placeholder(&placeholder).await {
            Ok(true) => AncestorStatus::Created,
            // Someone else holds the path with a fingerprint at least as new.
            Ok(false) => AncestorStatus::Stale,
            Err(e) => AncestorStatus::Failed(e.to_string()),
        }
    }
}
