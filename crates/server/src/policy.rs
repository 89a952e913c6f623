//! Authorization policies applied after path normalization.

use propagator_core::config::PolicyKind;
use propagator_core::{Identity, PathLayout, RecordPath};
use std::sync::Arc;

/// Decides whether a verified identity may touch a path.
pub trait AccessPolicy: Send + Sync {
    /// Returns `Err(reason)` when access is refused.
    fn authorize(&self, identity: &Identity, path: &RecordPath) -> Result<(), String>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Any verified identity may touch any path.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn authorize(&self, _identity: &Identity, _path: &RecordPath) -> Result<(), String> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "allow_all"
    }
}

/// A caller may only touch paths inside their own home directory.
#[derive(Debug, Clone, Copy)]
pub struct HomeOwner {
    layout: PathLayout,
}

impl HomeOwner {
    pub fn new(layout: PathLayout) -> Self {
        Self { layout }
    }
}

impl AccessPolicy for HomeOwner {
    fn authorize(&self, identity: &Identity, path: &RecordPath) -> Result<(), String> {
        let owner = self.layout.owner_of(path).map_err(|e| e.to_string())?;
        if owner == identity.username {
            Ok(())
        } else {
            Err(format!(
                "{} may not access {path} (owned by {owner})",
                identity.username
            ))
        }
    }

    fn name(&self) -> &'static str {
        "home_owner"
    }
}

/// Build the configured policy.
pub fn from_kind(kind: PolicyKind, layout: PathLayout) -> Arc<dyn AccessPolicy> {
    match kind {
        PolicyKind::AllowAll => Arc::new(AllowAll),
        PolicyKind::HomeOwner => Arc::new(HomeOwner::new(layout)),
    }
}
