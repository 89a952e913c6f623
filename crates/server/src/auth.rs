//! Authentication middleware and identity verification.

use crate::context::{RequestContext, TraceId};
use crate::error::ServiceError;
use crate::state::AppState;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderValue;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use propagator_core::Identity;
use propagator_core::identity;
use tracing::Instrument;

/// Header carrying the request trace id in both directions.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Turns an access token into a caller identity.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> propagator_core::Result<Identity>;
}

/// Verifies HMAC-signed tokens minted with a shared secret.
pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl IdentityVerifier for SharedSecretVerifier {
    fn verify(&self, token: &str) -> propagator_core::Result<Identity> {
        identity::verify(token, &self.secret)
    }
}

impl std::fmt::Debug for SharedSecretVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretVerifier").finish_non_exhaustive()
    }
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Failed verification, kept so handlers can report why.
#[derive(Clone, Debug)]
struct AuthFailure(String);

/// Authentication middleware: resolves the trace id, verifies the bearer
/// token, and runs the request inside a span carrying both.
///
/// Requests without a valid token still reach the router so unauthenticated
/// routes keep working; record handlers refuse them through the
/// [`RequestContext`] extractor.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    req.extensions_mut().insert(trace_id.clone());

    let token = extract_bearer_token(&req).map(str::to_string);
    let mut user = String::new();

    match token {
        Some(token) => match state.service.authenticate(&token, trace_id.clone()) {
            Ok(ctx) => {
                user = ctx.user().to_string();
                req.extensions_mut().insert(ctx);
            }
            Err(e) => {
                tracing::warn!(trace_id = %trace_id, error = %e, "Token verification failed");
                req.extensions_mut().insert(AuthFailure(e.to_string()));
            }
        },
        None => {
            req.extensions_mut()
                .insert(AuthFailure("missing bearer token".to_string()));
        }
    }

    let mut response = next
        .run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id, user = %user))
        .await;

    // Sanitized ids are printable ASCII, so this only fails on bugs.
    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<RequestContext>() {
            return Ok(ctx.clone());
        }
        let reason = parts
            .extensions
            .get::<AuthFailure>()
            .map(|f| f.0.clone())
            .unwrap_or_else(|| "authentication required".to_string());
        Err(ServiceError::Unauthenticated(reason))
    }
}
