use crate::domain::Epoch;
use crate::path::{line_string, split};
use crate::web::{RouteResult, WebState};
use axum::Json;
use axum::extract::State;
use geojson::Geometry;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressResponse {
    epoch: Epoch,
    has_location: bool,
    distance_km: f64,
    total_km: f64,
    fraction: f64,
    completed: Option<Geometry>,
    upcoming: Option<Geometry>,
}

/// The current fix projected onto the route. Without a fix the whole route is upcoming.
pub(crate) async fn get_progress(State(state): State<WebState>) -> RouteResult<Json<ProgressResponse>> {
    let cached = state.routes.current().await?;
    let snapshot = state.store.current();

    let distance_km = snapshot.fix.as_ref().map(|fix| cached.path.project_distance(fix.coord())).unwrap_or_default();
    let progress = split(&cached.path, distance_km);

    Ok(Json(ProgressResponse {
        epoch: snapshot.epoch,
        has_location: snapshot.has_location(),
        distance_km: progress.distance_km,
        total_km: progress.total_km,
        fraction: progress.fraction(),
        completed: progress.completed.as_deref().map(line_string),
        upcoming: progress.upcoming.as_deref().map(line_string),
    }))
}
