//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/records/get", post(handlers::get_record))
        .route("/v1/records/put", post(handlers::put_record))
        .route("/v1/records/mv", post(handlers::move_record))
        .route("/v1/records/rm", post(handlers::remove_record))
        // Order of execution: TraceLayer -> Auth -> Handler
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
