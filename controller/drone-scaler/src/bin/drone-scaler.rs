//! Drone Scaler binary - polls a Drone metrics endpoint and logs scale recommendations

use anyhow::Context;
use drone_scaler::{Config, HttpMetricsClient, Metrics, Poller};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse_config();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    config.validate().context("Invalid configuration")?;

    info!("Starting Drone Scaler");
    info!("Configuration:");
    info!("  Endpoint: {}", config.endpoint_url());
    info!("  Metric: {}", config.metric_name);
    info!("  Bearer token: {}", config.bearer_token().is_some());
    info!(
        "  Poll interval: {}",
        humantime::format_duration(config.poll_interval())
    );
    info!(
        "  Request timeout: {}",
        humantime::format_duration(config.request_timeout())
    );
    info!("  Scale up above: {}", config.scale_up_threshold);
    info!("  Increment policy: {:?}", config.increment_policy);

    let client = HttpMetricsClient::from_config(&config)?;
    let metrics = Metrics::new();
    let mut poller = Poller::new(&config, client, metrics.clone());

    poller
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C, polling until killed: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    metrics.log_summary();
    info!("Drone Scaler exited normally");
    Ok(())
}
