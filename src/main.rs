use sleigh::app_config::AppConfig;
use sleigh::auth::SharedSecret;
use sleigh::route::{RouteCache, RouteSource};
use sleigh::store::LocationStore;
use sleigh::store_listener::store_listener;
use sleigh::web::{WebState, start_web_server};
use std::sync::Arc;
use tokio::task;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    let store = LocationStore::spawn(config.core(), SharedSecret::new(config.auth().shared_secret()));
    let notifier_rx = store.notifier();
    info!(epoch = %store.current().epoch, "✅  Initialized store");

    task::spawn(async move {
        store_listener(notifier_rx).await;
    });
    info!("✅  Initialized store listener");

    let routes = Arc::new(RouteCache::new(RouteSource::from_config(&config)?));
    let warm_up = routes.clone();
    task::spawn(async move {
        // Viewers get the cached route, or trigger the build themselves if this fails
        if let Err(e) = warm_up.current().await {
            warn!("⚠️ Could not build the route at startup: {}", e);
        }
    });

    let state = WebState {
        store,
        routes,
        route_name: Arc::from(config.route().name()),
    };
    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    start_web_server(state, config.server().bind_address()).await?;

    Ok(())
}
