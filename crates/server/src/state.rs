//! Application state shared across handlers.

use crate::auth::SharedSecretVerifier;
use crate::policy;
use crate::service::RecordService;
use propagator_core::config::AppConfig;
use propagator_metadata::MetadataStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Record store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Record operations.
    pub service: Arc<RecordService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Fails when the configuration does not validate.
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>) -> propagator_core::Result<Self> {
        config.validate().map_err(propagator_core::Error::Config)?;
        let layout = config.layout.layout()?;

        let service = RecordService::new(
            metadata.clone(),
            Arc::new(SharedSecretVerifier::new(config.auth.shared_secret.clone())),
            policy::from_kind(config.auth.policy, layout),
            layout,
            config.propagation.create_missing_ancestors,
        );

        tracing::debug!(
            home_depth = layout.home_depth(),
            policy = ?config.auth.policy,
            create_missing_ancestors = config.propagation.create_missing_ancestors,
            "Record service configured"
        );

        Ok(Self {
            config: Arc::new(config),
            metadata,
            service: Arc::new(service),
        })
    }
}
