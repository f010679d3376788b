use callboard::application::DashboardService;
use callboard::config::Config;
use callboard::infrastructure::api::ApiClient;
use callboard::infrastructure::persistence::FileSessionStore;
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting Callboard dashboard client");

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded: {:?}", config);

    let store = Arc::new(FileSessionStore::at_default_location()?);
    let api = Arc::new(ApiClient::new(&config.api)?);
    let service = Arc::new(DashboardService::new(
        api,
        store,
        config.polling.poller_settings(),
    ));

    // Initial data load
    service.reload(false).await?;
    service.refresh_uploads().await?;
    info!(
        "{} patients loaded across {} uploads",
        service.state().patients().len(),
        service.state().uploads().len()
    );

    // Pick up a batch-calling session interrupted by a restart
    service.resume_if_interrupted();

    if std::env::args().any(|arg| arg == "--batch-call") {
        let outcome = service.start_batch_call().await?;
        info!(
            "Batch call dispatched: {}/{} calls accepted",
            outcome.successful, outcome.total_attempted
        );
        service.wait_for_calls().await;
        info!("Batch-calling session finished");
    } else {
        service.wait_for_calls().await;
    }

    Ok(())
}
