use crate::domain::{Epoch, FixSubmission, LocationFix};
use crate::web::{RouteResult, TokenBody, WebState, parse_body};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum LocationResponse {
    Fix(LocationFix),
    Empty {},
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StateResponse {
    epoch: Epoch,
    has_location: bool,
    server_time: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpdateLocationBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(flatten)]
    fix: FixSubmission,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateLocationResponse {
    ok: bool,
    location: LocationFix,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResetResponse {
    ok: bool,
    new_epoch: Epoch,
}

pub(crate) async fn get_location(State(state): State<WebState>) -> Json<LocationResponse> {
    match state.store.current().fix {
        Some(fix) => Json(LocationResponse::Fix(fix)),
        None => Json(LocationResponse::Empty {}),
    }
}

pub(crate) async fn get_state(State(state): State<WebState>) -> Json<StateResponse> {
    let snapshot = state.store.current();
    Json(StateResponse {
        epoch: snapshot.epoch,
        has_location: snapshot.has_location(),
        server_time: Utc::now().timestamp_millis(),
    })
}

#[instrument(skip_all)]
pub(crate) async fn update_location(State(state): State<WebState>, body: Bytes) -> RouteResult<Json<UpdateLocationResponse>> {
    let UpdateLocationBody { token, fix } = parse_body(&body);
    let location = state.store.update(token.as_deref(), fix).await?;

    Ok(Json(UpdateLocationResponse { ok: true, location }))
}

#[instrument(skip_all)]
pub(crate) async fn reset(State(state): State<WebState>, body: Bytes) -> RouteResult<Json<ResetResponse>> {
    let TokenBody { token } = parse_body(&body);
    let new_epoch = state.store.reset(token.as_deref()).await?;
    info!(epoch = %new_epoch, "🔄 Forced reset, new epoch {}", new_epoch);

    Ok(Json(ResetResponse { ok: true, new_epoch }))
}
