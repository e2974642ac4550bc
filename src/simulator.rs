use crate::app_config::AppConfig;
use crate::domain::RawWaypoint;
use crate::route::{RouteBuildError, load_waypoints};
use chrono::Utc;
use geo::Coord;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
struct FixRequest<'a> {
    lat: f64,
    lng: f64,
    accuracy: f64,
    ts: i64,
    token: &'a str,
}

#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error(transparent)]
    Load(#[from] RouteBuildError),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("waypoint file has no numeric points")]
    NoPoints,
}

/// Posts one fix per point to the server, waiting `interval` between posts. The first failed post ends the run.
pub struct Simulator {
    client: Client,
    waypoints_file: PathBuf,
    base_url: String,
    token: String,
    interval: Duration,
    accuracy_m: f64,
}

impl Simulator {
    pub fn new(config: &AppConfig) -> Self {
        Simulator {
            client: Client::new(),
            waypoints_file: config.route().waypoints_file().clone(),
            base_url: config.viewer().server_url().trim_end_matches('/').to_string(),
            token: config.auth().shared_secret().to_string(),
            interval: config.simulator().interval_ms(),
            accuracy_m: config.simulator().accuracy_m(),
        }
    }

    /// Replays the configured waypoints and returns the number of fixes posted.
    #[instrument(skip_all)]
    pub async fn run(&self) -> Result<usize, SimulatorError> {
        let raw = load_waypoints(&self.waypoints_file).await?;
        let points = numeric_points(&raw);
        if points.is_empty() {
            return Err(SimulatorError::NoPoints);
        }
        self.replay(&points).await
    }

    pub async fn replay(&self, points: &[Coord<f64>]) -> Result<usize, SimulatorError> {
        let url = format!("{}/api/update-location", self.base_url);
        for (index, point) in points.iter().enumerate() {
            if index > 0 {
                sleep(self.interval).await;
            }

            let request = FixRequest {
                lat: point.y,
                lng: point.x,
                accuracy: self.accuracy_m,
                ts: Utc::now().timestamp_millis(),
                token: &self.token,
            };
            self.client.post(&url).json(&request).send().await?.error_for_status()?;
            info!("🛷 Sent fix {}/{} at {:.6}, {:.6}", index + 1, points.len(), point.y, point.x);
        }
        Ok(points.len())
    }
}

fn numeric_points(raw: &[RawWaypoint]) -> Vec<Coord<f64>> {
    raw.iter()
        .filter_map(|waypoint| match (waypoint.lat, waypoint.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some(Coord { x: lng, y: lat }),
            _ => None,
        })
        .collect()
}
