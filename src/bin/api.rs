use anyhow::{Context, Result};
use smart_summary::api::SummaryServer;
use smart_summary::core::config::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    smart_summary::setup_logging(config.log_format);

    info!(
        project = %config.project_name,
        model = %config.openai_model,
        addr = %config.bind_addr(),
        "Starting smart-summary API"
    );

    let server = SummaryServer::new(config).context("Failed to initialize server")?;
    server.serve().await.context("Server terminated with an error")?;

    Ok(())
}
