use load_planner::api;
use load_planner::config::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let engine_config = app_config.engine.engine_config();

    info!("🚚 Load planner starting...");
    if let Err(err) = api::start_api_server(app_config.api, engine_config).await {
        tracing::error!("❌ Could not run API server: {}", err);
        std::process::exit(1);
    }
}
