use crate::domain::{Epoch, LocationFix};
use crate::route::RetryPolicy;
use crate::viewer::sse::{ServerSentEvent, SseDecoder};
use crate::viewer::{ViewerError, ViewerEvent};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::timeout;
use tokio_retry::Retry;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
pub struct Config {
    pub url: String,
    pub retry: RetryPolicy,
    pub stale_connection_timeout: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatePayload {
    epoch: Epoch,
    has_location: bool,
}

#[derive(Deserialize)]
struct ResetPayload {
    timestamp: i64,
    epoch: Epoch,
}

/// Follows the push channel until the receiving side goes away, reconnecting after the delays of `config.retry`.
#[instrument(skip_all, fields(url = %config.url))]
pub async fn listen(tx: Sender<ViewerEvent>, client: &Client, config: &Config) -> Result<(), ViewerError> {
    info!("Connecting to SSE stream {}...", config.url);
    Retry::spawn(config.retry.delays(), || async {
        match connect_sse_stream(tx.clone(), client, config).await {
            Ok(_) => {
                info!("✅ Viewer stopped, closing SSE stream");
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ SSE error: {}. Retrying...", e);
                Err(e)
            }
        }
    })
    .await
}

/// Returns `Ok` only once the receiver is dropped. Every other way the stream ends is an error, so the caller
/// reconnects.
pub(crate) async fn connect_sse_stream(tx: Sender<ViewerEvent>, client: &Client, config: &Config) -> Result<(), ViewerError> {
    let url = format!("{}/api/events", config.url);
    let response = client.get(&url).header("Accept", "text/event-stream").send().await?.error_for_status()?;

    if response.status() == StatusCode::OK {
        info!(status = %response.status(), "Connecting to SSE stream {}... OK", config.url);
    }

    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();
    loop {
        let chunk = timeout(config.stale_connection_timeout, stream.next()).await;
        match chunk {
            Ok(Some(Ok(chunk))) => {
                for block in decoder.push(&String::from_utf8_lossy(&chunk)) {
                    let Some(event) = decode(&block) else {
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
            }
            Ok(Some(Err(e))) => {
                error!("❌ SSE stream error: {}", e);
                return Err(e.into());
            }
            Ok(None) => {
                warn!("🔴 SSE stream ended");
                return Err(ViewerError::StreamClosed);
            }
            Err(_) => {
                warn!("⏳ No data for {} seconds. Reconnecting...", config.stale_connection_timeout.as_secs());
                return Err(ViewerError::Stale(config.stale_connection_timeout));
            }
        }
    }
}

/// Maps one event block onto a viewer event. Keep-alives, unknown events and malformed data yield nothing.
fn decode(block: &str) -> Option<ViewerEvent> {
    let event = match ServerSentEvent::<Value>::from_str(block) {
        Ok(event) => event,
        Err(e) => {
            warn!("⚠️ Ignoring malformed event: {}", e);
            return None;
        }
    };
    if event.is_keep_alive() {
        return None;
    }
    debug!(event = block, "🔸 Received event: {:?}", event);

    let data = event.data?;
    let decoded = match event.event.as_deref() {
        Some("state") => {
            serde_json::from_value::<StatePayload>(data).map(|state| ViewerEvent::State {
                epoch: state.epoch,
                has_location: state.has_location,
            })
        }
        Some("location") => serde_json::from_value::<LocationFix>(data).map(ViewerEvent::Location),
        Some("reset") => {
            serde_json::from_value::<ResetPayload>(data).map(|reset| ViewerEvent::Reset {
                timestamp: reset.timestamp,
                epoch: reset.epoch,
            })
        }
        other => {
            debug!("Ignoring event {:?}", other);
            return None;
        }
    };

    decoded.inspect_err(|e| warn!("⚠️ Ignoring event with unexpected data: {}", e)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tokio::sync::mpsc;

    fn config(url: String) -> Config {
        Config {
            url,
            retry: RetryPolicy::unbounded(Duration::from_millis(10), Duration::from_millis(20), Duration::from_secs(5)),
            stale_connection_timeout: Duration::from_secs(5),
        }
    }

    #[rstest]
    #[case("event: state\ndata: {\"epoch\":5,\"hasLocation\":true}", Some(ViewerEvent::State { epoch: Epoch::from_millis(5), has_location: true }))]
    #[case("event: reset\ndata: {\"timestamp\":6,\"epoch\":6}", Some(ViewerEvent::Reset { timestamp: 6, epoch: Epoch::from_millis(6) }))]
    #[case(":", None)]
    #[case("event: unknown\ndata: {}", None)]
    #[case("event: state\ndata: {\"epoch\":\"soon\"}", None)]
    #[case("event: state\ndata: not json", None)]
    fn decode_maps_event_blocks(#[case] block: &str, #[case] expected: Option<ViewerEvent>) {
        assert_eq!(decode(block), expected);
    }

    #[test_log::test(tokio::test)]
    async fn connect_sse_stream_forwards_events_until_the_stream_ends() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/events")
            .match_header("accept", "text/event-stream")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(concat!(
                "event: state\ndata: {\"epoch\":5,\"hasLocation\":true}\n\n",
                ":\n\n",
                "event: location\ndata: {\"lat\":40.88,\"lng\":-72.94,\"accuracy\":null,\"clientTimestamp\":7,\"serverTimestamp\":8}\n\n",
            ))
            .create_async()
            .await;
        let (tx, mut rx) = mpsc::channel(8);

        let result = connect_sse_stream(tx, &Client::new(), &config(server.url())).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ViewerError::StreamClosed)));
        assert_eq!(
            rx.recv().await,
            Some(ViewerEvent::State {
                epoch: Epoch::from_millis(5),
                has_location: true
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(ViewerEvent::Location(LocationFix {
                lat: 40.88,
                lng: -72.94,
                accuracy: None,
                client_timestamp: 7,
                server_timestamp: 8,
            }))
        );
    }

    #[test_log::test(tokio::test)]
    async fn connect_sse_stream_stops_when_the_viewer_is_gone() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/events")
            .with_status(200)
            .with_body("event: state\ndata: {\"epoch\":5,\"hasLocation\":false}\n\n")
            .create_async()
            .await;
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let result = connect_sse_stream(tx, &Client::new(), &config(server.url())).await;

        assert!(result.is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn connect_sse_stream_fails_on_a_server_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/api/events").with_status(503).create_async().await;
        let (tx, _rx) = mpsc::channel(8);

        let result = connect_sse_stream(tx, &Client::new(), &config(server.url())).await;

        assert!(matches!(result, Err(ViewerError::Request(_))));
    }
}
