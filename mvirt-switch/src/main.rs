//! mvirt-switch daemon entry point.

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mvirt_switch::agent::{AgentOptions, SwitchAgent};
use mvirt_switch::clients::{HealthcheckClient, HomeAssistantClient, QmClient};
use mvirt_switch::config::{Args, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mvirt_switch=info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_args(&args)?;

    info!("Starting mvirt-switch");
    info!("Home Assistant: {}", config.ha_url);
    info!("Entity prefix: {}", config.entity_prefix);
    info!(
        "Poll interval: {}s, fetch errors: {:?}, dry run: {}",
        config.poll_interval.as_secs(),
        config.on_fetch_error,
        config.dry_run
    );

    let ha = HomeAssistantClient::connect(&config).await?;
    info!("Home Assistant API is running");

    let qm = QmClient::new(config.qm_path.clone());
    let mut agent = SwitchAgent::new(ha, qm.clone(), qm, AgentOptions::from(&config));

    if let Some(url) = &config.healthcheck_url {
        let healthcheck = HealthcheckClient::new(url.clone(), config.http_timeout)?;
        info!("Healthcheck: {}", healthcheck.url());
        agent = agent.with_liveness(healthcheck);
    }

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = signal::ctrl_c() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    };

    agent.run(shutdown).await
}
