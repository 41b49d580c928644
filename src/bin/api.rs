use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wanderwise::{api::start_server, config::AppConfig, orchestrator::Flows};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    if config.gemini.api_key.is_none() {
        warn!("GEMINI_API_KEY not set; flow requests will fail until it is configured");
    }
    if config.geocoding.api_key.is_none() {
        warn!("No geocoding key; coordinates will be used as the location name");
    }

    info!("WanderWise flow service");
    info!("Port: {}", config.port);

    let flows = Arc::new(Flows::from_config(&config)?);
    info!("Registered flows: {}", flows.registry().list().join(", "));

    start_server(flows, config.port).await?;

    Ok(())
}
