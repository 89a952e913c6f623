//! Record RPC handlers.

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};
use crate::service::RecordView;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Maximum request body size for record RPCs (64 KiB).
const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct GetRequest {
    pub path: String,
    #[serde(default)]
    pub force_creation: bool,
}

#[derive(Debug, Deserialize)]
pub struct PutRequest {
    pub path: String,
    #[serde(default)]
    pub checksum: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub src: String,
    pub dst: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub path: String,
}

/// Empty success body.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

async fn read_json<T: DeserializeOwned>(req: Request) -> ServiceResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|e| ServiceError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::BadRequest(format!("invalid JSON: {e}")))
}

/// POST /v1/records/get
pub async fn get_record(
    State(state): State<AppState>,
    ctx: RequestContext,
    req: Request,
) -> ServiceResult<Json<RecordView>> {
    let body: GetRequest = read_json(req).await?;
    let record = state
        .service
        .get(&ctx, &body.path, body.force_creation)
        .await?;
    Ok(Json(record))
}

/// POST /v1/records/put
pub async fn put_record(
    State(state): State<AppState>,
    ctx: RequestContext,
    req: Request,
) -> ServiceResult<Json<Empty>> {
    let body: PutRequest = read_json(req).await?;
    state.service.put(&ctx, &body.path, &body.checksum).await?;
    Ok(Json(Empty {}))
}

/// POST /v1/records/mv
pub async fn move_record(
    State(state): State<AppState>,
    ctx: RequestContext,
    req: Request,
) -> ServiceResult<Json<Empty>> {
    let body: MoveRequest = read_json(req).await?;
    state.service.mv(&ctx, &body.src, &body.dst).await?;
    Ok(Json(Empty {}))
}

/// POST /v1/records/rm
pub async fn remove_record(
    State(state): State<AppState>,
    ctx: RequestContext,
    req: Request,
) -> ServiceResult<Json<Empty>> {
    let body: RemoveRequest = read_json(req).await?;
    state.service.rm(&ctx, &body.path).await?;
    Ok(Json(Empty {}))
}
