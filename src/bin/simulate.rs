use sleigh::app_config::AppConfig;
use sleigh::simulator::Simulator;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} simulator v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    let sent = Simulator::new(&config).run().await?;
    info!("🏁 Replayed {} fixes", sent);

    Ok(())
}
