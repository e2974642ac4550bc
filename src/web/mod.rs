pub use crate::web::common::{RouteErrorResponse, RouteResult};

use crate::route::RouteCache;
use crate::store::LocationStore;
use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

pub mod common;
mod events;
mod location;
mod progress;
mod route;

#[derive(Clone)]
pub struct WebState {
    pub store: LocationStore,
    pub routes: Arc<RouteCache>,
    pub route_name: Arc<str>,
}

pub fn routes(state: WebState) -> Router {
    let api = Router::new()
        .route("/route", get(route::get_route))
        .route("/route-debug", get(route::route_debug))
        .route("/reload-route", post(route::reload_route))
        .route("/location", get(location::get_location))
        .route("/state", get(location::get_state))
        .route("/update-location", post(location::update_location))
        .route("/reset", post(location::reset))
        .route("/progress", get(progress::get_progress))
        .route("/events", get(events::events))
        .fallback(common::route_not_found)
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(SetResponseHeaderLayer::overriding(header::CACHE_CONTROL, HeaderValue::from_static("no-store")))
        .layer(TraceLayer::new_for_http())
}

#[instrument(skip(state))]
pub async fn start_web_server(state: WebState, bind_address: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    info!("🌐 Listening on {}", listener.local_addr()?);

    axum::serve(listener, routes(state).into_make_service()).await
}

/// Write requests carry the shared secret in their JSON body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenBody {
    #[serde(default)]
    pub token: Option<String>,
}

/// Lenient JSON body parsing: a missing or malformed body yields the default, so authentication is always checked
/// before any validation error can be reported.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}
