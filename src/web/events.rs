use crate::domain::Epoch;
use crate::domain::events::Event;
use crate::store::{StoreSnapshot, Subscription};
use crate::web::{RouteResult, WebState};
use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

pub(crate) const STATE_EVENT: &str = "state";
pub(crate) const LOCATION_EVENT: &str = "location";
pub(crate) const RESET_EVENT: &str = "reset";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatePayload {
    epoch: Epoch,
    has_location: bool,
}

#[derive(Debug, Serialize)]
struct ResetPayload {
    timestamp: i64,
    epoch: Epoch,
}

/// Push channel. A new subscriber first gets the current state (and fix), then every committed change in order.
pub(crate) async fn events(State(state): State<WebState>) -> RouteResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let Subscription { snapshot, events } = state.store.subscribe().await?;
    info!(epoch = %snapshot.epoch, "📡 Viewer subscribed");

    let store = state.store.clone();
    let updates = BroadcastStream::new(events).flat_map(move |received| {
        let events = match received {
            Ok(event) => change_events(&event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                // Dropped events are replaced by the state they led to
                warn!("⏳ Viewer lagged behind by {} event(s), resending state", skipped);
                snapshot_events(&store.current())
            }
        };
        stream::iter(events)
    });

    let stream = stream::iter(snapshot_events(&snapshot)).chain(updates).map(Ok);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn snapshot_events(snapshot: &StoreSnapshot) -> Vec<SseEvent> {
    let state = StatePayload {
        epoch: snapshot.epoch,
        has_location: snapshot.has_location(),
    };

    let mut events = Vec::with_capacity(2);
    events.extend(sse_event(STATE_EVENT, &state));
    if let Some(fix) = &snapshot.fix {
        events.extend(sse_event(LOCATION_EVENT, fix));
    }
    events
}

fn change_events(event: &Event) -> Vec<SseEvent> {
    match event {
        Event::Location(fix) => sse_event(LOCATION_EVENT, fix).into_iter().collect(),
        Event::Reset { timestamp, epoch } => sse_event(
            RESET_EVENT,
            &ResetPayload {
                timestamp: *timestamp,
                epoch: *epoch,
            },
        )
        .into_iter()
        .collect(),
    }
}

fn sse_event<T: Serialize>(name: &str, data: &T) -> Option<SseEvent> {
    SseEvent::default()
        .event(name)
        .json_data(data)
        .inspect_err(|e| warn!("⚠️ Could not serialize '{}' event: {}", name, e))
        .ok()
}
