//! HTTP service that keeps directory fingerprints current.
//!
//! This crate provides:
//! - Get/Put/Mv/Rm record operations behind a verified identity
//! - Best-effort fingerprint propagation to ancestor directories
//! - Pluggable access policies
//! - The axum router, auth middleware, and error mapping

pub mod auth;
pub mod context;
pub mod error;
pub mod handlers;
pub mod policy;
pub mod propagation;
pub mod routes;
pub mod service;
pub mod state;

pub use context::{RequestContext, TraceId};
pub use error::{ServiceError, ServiceResult};
pub use routes::create_router;
pub use service::RecordService;
pub use state::AppState;
