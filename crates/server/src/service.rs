//! Record operations: Get, Put, Mv and Rm.
//!
//! Every operation takes a [`RequestContext`] proving the caller was
//! verified, normalizes and authorizes its paths before touching the store,
//! performs the primary write, then propagates a fingerprint to the
//! ancestors. Only primary-write failures reach the caller.

use crate::auth::IdentityVerifier;
use crate::context::{RequestContext, TraceId};
use crate::error::{ServiceError, ServiceResult};
use crate::policy::AccessPolicy;
use crate::propagation::{PropagationReport, Propagator};
use propagator_core::fingerprint::{new_record_id, unix_now};
use propagator_core::{Fingerprint, PathLayout, RecordPath};
use propagator_metadata::{MetadataStore, MovedRecord, RecordRow};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Client-facing projection of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: String,
    pub path: String,
    pub etag: String,
    pub mtime: i64,
    pub checksum: String,
}

impl From<RecordRow> for RecordView {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            path: row.path,
            etag: row.etag,
            mtime: row.mtime,
            checksum: row.checksum,
        }
    }
}

/// Result of a Put.
#[derive(Debug)]
pub struct PutOutcome {
    pub path: RecordPath,
    pub fingerprint: Fingerprint,
    pub propagation: PropagationReport,
}

/// Result of a Mv. Empty when nothing matched `src`.
#[derive(Debug, Default)]
pub struct MoveOutcome {
    pub moved: Vec<MovedRecord>,
    pub fingerprint: Option<Fingerprint>,
    pub propagation: Option<PropagationReport>,
}

/// Result of an Rm.
#[derive(Debug)]
pub struct RemoveOutcome {
    pub deleted: u64,
    pub fingerprint: Fingerprint,
    pub propagation: PropagationReport,
}

/// The record service.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn MetadataStore>,
    verifier: Arc<dyn IdentityVerifier>,
    policy: Arc<dyn AccessPolicy>,
    propagator: Propagator,
    layout: PathLayout,
}

impl RecordService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        verifier: Arc<dyn IdentityVerifier>,
        policy: Arc<dyn AccessPolicy>,
        layout: PathLayout,
        create_missing_ancestors: bool,
    ) -> Self {
        let propagator = Propagator::new(store.clone(), layout, create_missing_ancestors);
        Self {
            store,
            verifier,
            policy,
            propagator,
            layout,
        }
    }

    /// Verify an access token and bind the caller to `trace_id`.
    pub fn authenticate(&self, token: &str, trace_id: TraceId) -> ServiceResult<RequestContext> {
        let identity = self
            .verifier
            .verify(token)
            .map_err(|e| ServiceError::Unauthenticated(e.to_string()))?;
        Ok(RequestContext::new(trace_id, identity))
    }

    /// Normalize `raw`, check it lies at or below a home directory, and
    /// consult the access policy.
    fn resolve(&self, ctx: &RequestContext, raw: &str) -> ServiceResult<RecordPath> {
        let path = RecordPath::parse(raw)?;
        self.layout.validate(&path)?;
        self.policy.authorize(&ctx.identity, &path).map_err(|reason| {
            tracing::warn!(
                trace_id = %ctx.trace_id,
                user = %ctx.user(),
                path = %path,
                policy = self.policy.name(),
                "Access denied"
            );
            ServiceError::PermissionDenied(reason)
        })?;
        Ok(path)
    }

    /// Fetch a record, optionally creating an empty one when it is missing.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        raw_path: &str,
        force_creation: bool,
    ) -> ServiceResult<RecordView> {
        let path = self.resolve(ctx, raw_path)?;

        if let Some(row) = self.store.get_record(&path).await? {
            return Ok(row.into());
        }

        if !force_creation {
            return Err(ServiceError::NotFound(path.to_string()));
        }

        tracing::info!(trace_id = %ctx.trace_id, path = %path, "Record missing, creating on read");
        self.put_resolved(ctx, path.clone(), String::new()).await?;

        match self.store.get_record(&path).await? {
            Some(row) => Ok(row.into()),
            None => Err(ServiceError::Internal(format!(
                "{path} missing right after creation"
            ))),
        }
    }

    /// Create or update a record with a fresh fingerprint.
    pub async fn put(
        &self,
        ctx: &RequestContext,
        raw_path: &str,
        checksum: &str,
    ) -> ServiceResult<PutOutcome> {
        let path = self.resolve(ctx, raw_path)?;
        self.put_resolved(ctx, path, checksum.to_string()).await
    }

    async fn put_resolved(
        &self,
        ctx: &RequestContext,
        path: RecordPath,
        checksum: String,
    ) -> ServiceResult<PutOutcome> {
        // The upsert keys on path, so a stale id here is ignored on conflict.
        let id = match self.store.get_record(&path).await? {
            Some(existing) => existing.id,
            None => new_record_id(),
        };
        let fingerprint = Fingerprint::fresh();

        self.store
            .upsert_record(&RecordRow {
                id,
                path: path.as_str().to_string(),
                checksum,
                etag: fingerprint.etag.clone(),
                mtime: fingerprint.mtime,
            })
            .await?;

        tracing::info!(
            trace_id = %ctx.trace_id,
            user = %ctx.user(),
            path = %path,
            etag = %fingerprint.etag,
            mtime = fingerprint.mtime,
            "Record written"
        );

        let propagation = self
            .propagator
            .propagate(&path, &fingerprint, &ctx.trace_id)
            .await;

        Ok(PutOutcome {
            path,
            fingerprint,
            propagation,
        })
    }

    /// Move a record and everything below it.
    pub async fn mv(
        &self,
        ctx: &RequestContext,
        raw_src: &str,
        raw_dst: &str,
    ) -> ServiceResult<MoveOutcome> {
        let src = self.resolve(ctx, raw_src)?;
        let dst = self.resolve(ctx, raw_dst)?;

        if src == dst {
            tracing::debug!(trace_id = %ctx.trace_id, path = %src, "Move onto itself, nothing to do");
            return Ok(MoveOutcome::default());
        }
        if dst.is_within(&src) {
            return Err(ServiceError::InvalidPath(format!(
                "cannot move {src} into its own subtree {dst}"
            )));
        }

        let fingerprint = Fingerprint::fresh();
        let moved = self
            .store
            .move_subtree(&src, &dst, &fingerprint.etag, fingerprint.mtime)
            .await?;

        if moved.is_empty() {
            tracing::info!(trace_id = %ctx.trace_id, src = %src, "No records under source, nothing moved");
            return Ok(MoveOutcome::default());
        }

        tracing::info!(
            trace_id = %ctx.trace_id,
            user = %ctx.user(),
            src = %src,
            dst = %dst,
            count = moved.len(),
            etag = %fingerprint.etag,
            "Subtree moved"
        );

        let propagation = self
            .propagator
            .propagate(&dst, &fingerprint, &ctx.trace_id)
            .await;

        Ok(MoveOutcome {
            moved,
            fingerprint: Some(fingerprint),
            propagation: Some(propagation),
        })
    }

    /// Remove a record and everything below it that predates this call.
    pub async fn rm(&self, ctx: &RequestContext, raw_path: &str) -> ServiceResult<RemoveOutcome> {
        let path = self.resolve(ctx, raw_path)?;
        let cutoff = unix_now();

        let deleted = self.store.delete_by_prefix_before(&path, cutoff).await?;

        tracing::info!(
            trace_id = %ctx.trace_id,
            user = %ctx.user(),
            path = %path,
            cutoff,
            deleted,
            "Subtree removed"
        );

        let fingerprint = Fingerprint::at(cutoff);
        let propagation = self
            .propagator
            .propagate(&path, &fingerprint, &ctx.trace_id)
            .await;

        Ok(RemoveOutcome {
            deleted,
            fingerprint,
            propagation,
        })
    }
}
