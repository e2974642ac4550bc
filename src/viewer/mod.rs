use crate::app_config::{AppConfig, Viewer};
use crate::path::{GeoJsonError, RoutePath};
use crate::route::RetryPolicy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task;
use tokio_retry::Retry;
use tracing::{info, instrument, warn};

pub mod listen;
pub mod poll;
pub mod sse;
mod state;

pub use state::{ViewerEvent, ViewerState, ViewerUpdate};

const ROUTE_FETCH_ATTEMPTS: usize = 5;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid route: {0}")]
    Route(#[from] GeoJsonError),
    #[error("stream closed")]
    StreamClosed,
    #[error("no data for {0:?}")]
    Stale(Duration),
}

/// Follows the server like a browser viewer would: loads the route, then applies pushed and polled events to a
/// local [`ViewerState`] and logs the progress. Runs until every event source has stopped.
#[instrument(skip_all, fields(server = config.viewer().server_url()))]
pub async fn follow(config: &AppConfig) -> Result<(), ViewerError> {
    let viewer = config.viewer();
    let base_url = viewer.server_url().trim_end_matches('/').to_string();
    let client = Client::new();

    info!("🗺️ Fetching route...");
    let path = fetch_route_with_retry(&client, &base_url, &route_fetch_policy(viewer).with_jitter(true)).await?;
    info!("🗺️ Fetching route... OK, {} points, {:.2} km", path.coords().len(), path.total_length_km());
    let mut state = ViewerState::new(Arc::new(path));

    let (tx, mut rx) = mpsc::channel::<ViewerEvent>(32);

    let listen_config = listen::Config {
        url: base_url.clone(),
        retry: reconnect_policy(viewer).with_jitter(true),
        stale_connection_timeout: viewer.stale_connection_timeout_ms(),
    };
    let listen_tx = tx.clone();
    let listen_client = client.clone();
    task::spawn(async move {
        if let Err(e) = listen::listen(listen_tx, &listen_client, &listen_config).await {
            warn!("⚠️ Gave up on the SSE stream: {}", e);
        }
    });
    task::spawn(poll::poll_state(tx.clone(), client.clone(), base_url.clone(), viewer.sync_interval_ms()));
    task::spawn(poll::poll_location(tx, client, base_url, viewer.location_poll_interval_ms()));

    while let Some(event) = rx.recv().await {
        log_update(&state.handle(event));
    }

    Ok(())
}

fn route_fetch_policy(viewer: &Viewer) -> RetryPolicy {
    RetryPolicy::new(ROUTE_FETCH_ATTEMPTS, viewer.retry_ms(), viewer.retry_max_delay_ms(), viewer.stale_connection_timeout_ms())
}

fn reconnect_policy(viewer: &Viewer) -> RetryPolicy {
    RetryPolicy::unbounded(viewer.retry_ms(), viewer.retry_max_delay_ms(), viewer.stale_connection_timeout_ms())
}

async fn fetch_route_with_retry(client: &Client, base_url: &str, policy: &RetryPolicy) -> Result<RoutePath, ViewerError> {
    Retry::spawn(policy.delays(), || async {
        poll::fetch_route(client, base_url)
            .await
            .inspect_err(|e| warn!("🗺️ Fetching route... failed, {}", e))
    })
    .await
}

fn log_update(update: &ViewerUpdate) {
    match update {
        ViewerUpdate::Unchanged => {}
        ViewerUpdate::EpochAdopted(epoch) => info!(epoch = %epoch, "🟣 Following epoch {}", epoch),
        ViewerUpdate::HardReset { previous, current } => {
            info!(epoch = %current, "🔄 Epoch {} replaced {}, whole route upcoming", current, previous)
        }
        ViewerUpdate::Progressed(progress) => info!(
            "🛷 {:.2} of {:.2} km done ({:.0}%), {:.2} km to go",
            progress.completed_km(),
            progress.total_km,
            progress.fraction() * 100.0,
            progress.upcoming_km()
        ),
    }
}
