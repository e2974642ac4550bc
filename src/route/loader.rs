use crate::domain::RawWaypoint;
use crate::path::{GeoJsonError, RoutePath, path_from_geojson};
use crate::route::RouteBuildError;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Reads the waypoint list: a JSON array of `{name, lat, lng}` objects with loosely typed coordinates.
#[instrument(skip_all, fields(file = file_name(path)))]
pub async fn load_waypoints(path: &Path) -> Result<Vec<RawWaypoint>, RouteBuildError> {
    info!("📁 Loading waypoints...");
    let content = read(path).await?;
    let entries = serde_json::from_str::<Vec<Value>>(&content).map_err(|source| RouteBuildError::InvalidWaypoints {
        source,
        path: path.to_path_buf(),
    })?;

    let waypoints = entries.iter().map(RawWaypoint::from).collect::<Vec<_>>();
    info!("📁 Loading waypoints... OK, {} found", waypoints.len());
    Ok(waypoints)
}

/// Reads a pre-built path stored as GeoJSON.
#[instrument(skip_all, fields(file = file_name(path)))]
pub async fn load_path_file(path: &Path) -> Result<RoutePath, RouteBuildError> {
    info!("📁 Loading pre-built path...");
    let content = read(path).await?;
    let invalid = |source: GeoJsonError| RouteBuildError::InvalidPathFile {
        source,
        path: path.to_path_buf(),
    };

    let value = serde_json::from_str::<Value>(&content).map_err(|e| invalid(e.into()))?;
    let route_path = path_from_geojson(value).map_err(invalid)?;

    info!("📁 Loading pre-built path... OK, {} points, {:.2} km", route_path.coords().len(), route_path.total_length_km());
    Ok(route_path)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown")
}

async fn read(path: &Path) -> Result<String, RouteBuildError> {
    fs::read_to_string(path).await.map_err(|source| RouteBuildError::Io {
        source,
        path: path.to_path_buf(),
    })
}
