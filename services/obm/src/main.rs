use tokio::sync::watch;
use tracing::info;

use obm::config::ObmConfig;
use obm::queue;
use obm::service::ObmService;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    info!("Starting OBM service");
    let config = ObmConfig::from_env();

    // The durable queue transport is deployment-specific; the in-memory
    // queue stands in so the engine loop can be driven locally. The
    // producer handle must outlive the loop or recv() reports a closed
    // queue.
    let (ingress, _producer) = queue::in_memory(1_024);

    let service = ObmService::start(config, ingress)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = shutdown_tx.send(true);
        }
    });

    service.run(shutdown_rx).await?;
    info!("OBM service stopped");
    Ok(())
}
