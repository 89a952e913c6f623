//! Server test utilities.

use super::metadata::TestMetadata;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use propagator_core::config::AppConfig;
use propagator_core::{Identity, identity};
use propagator_metadata::MetadataStore;
use propagator_server::{AppState, create_router};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _metadata: TestMetadata,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server over a temporary SQLite database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let metadata = TestMetadata::new()
            .await
            .expect("Failed to create metadata store");

        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let state =
            AppState::new(config, metadata.store()).expect("Failed to build application state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _metadata: metadata,
        }
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Mint a non-expiring token for `username` with the server's secret.
    pub fn token_for(&self, username: &str) -> String {
        identity::issue(
            &Identity::new(username),
            &self.state.config.auth.shared_secret,
            None,
        )
        .expect("Failed to issue token")
    }

    /// Send a request and return status, headers and the JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        auth_token: Option<&str>,
        trace_id: Option<&str>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = auth_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(trace_id) = trace_id {
            builder = builder.header("X-Trace-Id", trace_id);
        }

        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let request = builder.body(body).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (status, headers, json)
    }

    /// POST a JSON body as `username`.
    pub async fn post_as(&self, username: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let token = self.token_for(username);
        let (status, _, json) = self
            .request("POST", uri, Some(body), Some(&token), None)
            .await;
        (status, json)
    }
}
