use crate::path::{coords_to_positions, feature_collection};
use crate::route::BuildDiagnostics;
use crate::web::{RouteResult, TokenBody, WebState, parse_body};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geojson::FeatureCollection;
use serde::Serialize;
use tracing::{info, instrument};

const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RouteDebugResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    diagnostics: Option<BuildDiagnostics>,
    sample: Vec<[f64; 2]>,
}

pub(crate) async fn get_route(State(state): State<WebState>) -> RouteResult<Json<FeatureCollection>> {
    let cached = state.routes.current().await?;

    Ok(Json(feature_collection(&cached.path, &state.route_name, &cached.diagnostics.source)))
}

/// Diagnostics of the last build without triggering a new one.
pub(crate) async fn route_debug(State(state): State<WebState>) -> Response {
    let diagnostics = state.routes.last_diagnostics().await;
    match state.routes.cached().await {
        Some(cached) => Json(RouteDebugResponse {
            ok: true,
            error: None,
            diagnostics,
            sample: coords_to_positions(&cached.path.coords()[..cached.path.coords().len().min(SAMPLE_SIZE)]),
        })
        .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RouteDebugResponse {
                ok: false,
                error: Some("no route has been built".to_string()),
                diagnostics,
                sample: Vec::new(),
            }),
        )
            .into_response(),
    }
}

#[instrument(skip_all)]
pub(crate) async fn reload_route(State(state): State<WebState>, body: Bytes) -> RouteResult<Response> {
    let TokenBody { token } = parse_body(&body);
    state.store.authorize(token.as_deref(), "reload route")?;

    info!("🗺️ Reloading route on request");
    let response = match state.routes.reload().await {
        Ok(cached) => Json(RouteDebugResponse {
            ok: true,
            error: None,
            diagnostics: Some(cached.diagnostics),
            sample: Vec::new(),
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RouteDebugResponse {
                ok: false,
                error: Some(e.to_string()),
                diagnostics: e.diagnostics().cloned(),
                sample: Vec::new(),
            }),
        )
            .into_response(),
    };
    Ok(response)
}
