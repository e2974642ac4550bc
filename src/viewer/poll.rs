use crate::domain::{Epoch, LocationFix};
use crate::path::{RoutePath, path_from_geojson};
use crate::viewer::{ViewerError, ViewerEvent};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, instrument, warn};

const MIN_POLL_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub epoch: Epoch,
    pub has_location: bool,
    pub server_time: i64,
}

pub async fn fetch_route(client: &Client, base_url: &str) -> Result<RoutePath, ViewerError> {
    let value: Value = client.get(format!("{}/api/route", base_url)).send().await?.error_for_status()?.json().await?;
    Ok(path_from_geojson(value)?)
}

pub async fn fetch_state(client: &Client, base_url: &str) -> Result<SyncState, ViewerError> {
    Ok(client.get(format!("{}/api/state", base_url)).send().await?.error_for_status()?.json().await?)
}

/// The server's current fix, if it has one. An empty object means no fix.
pub async fn fetch_location(client: &Client, base_url: &str) -> Result<Option<LocationFix>, ViewerError> {
    let value: Value = client.get(format!("{}/api/location", base_url)).send().await?.error_for_status()?.json().await?;
    if value.as_object().is_some_and(|object| object.is_empty()) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

/// Pull fallback for epoch changes missed by the push channel.
#[instrument(skip(tx, client))]
pub async fn poll_state(tx: Sender<ViewerEvent>, client: Client, base_url: String, period: Duration) {
    let mut ticker = interval(period.max(MIN_POLL_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match fetch_state(&client, &base_url).await {
            Ok(state) => {
                debug!(epoch = %state.epoch, "🔁 Polled state");
                let event = ViewerEvent::State {
                    epoch: state.epoch,
                    has_location: state.has_location,
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!("⚠️ Could not poll state: {}", e),
        }
    }
}

/// Pull fallback for fixes missed by the push channel.
#[instrument(skip(tx, client))]
pub async fn poll_location(tx: Sender<ViewerEvent>, client: Client, base_url: String, period: Duration) {
    let mut ticker = interval(period.max(MIN_POLL_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match fetch_location(&client, &base_url).await {
            Ok(Some(fix)) => {
                if tx.send(ViewerEvent::Location(fix)).await.is_err() {
                    return;
                }
            }
            Ok(None) => debug!("🔁 Polled location, none yet"),
            Err(e) => warn!("⚠️ Could not poll location: {}", e),
        }
    }
}
