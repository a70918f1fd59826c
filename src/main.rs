use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wabridge::config;
use wabridge::gateway::GatewayClient;
use wabridge::identity::IdentityResolver;
use wabridge::ingest::Pipeline;
use wabridge::store::memory::{InMemoryStore, LoggingDispatcher};
use wabridge::webhook;

#[derive(Parser)]
#[command(name = "wabridge", version, about = "WhatsApp gateway webhook bridge")]
struct Cli {
    /// Path to the config file (default: ./wabridge.json)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    config.validate()?;

    info!(
        "wabridge {} starting for channel {}",
        wabridge::VERSION,
        config.channel.channel_id
    );

    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(GatewayClient::new(
        &config.gateway,
        &config.channel.phone_number,
    ));
    if !gateway.validate_connection().await {
        warn!("gateway not reachable at {} — continuing, sends will fail until it is", config.gateway.base_url);
    }

    let resolver = IdentityResolver::new(
        store.clone(),
        store.clone(),
        Arc::new(LoggingDispatcher),
        gateway,
        config.channel.clone(),
    );
    let pipeline = Arc::new(Pipeline::new(resolver, store, config.channel.clone()));

    webhook::serve(config.webhook.port, &config.webhook.path, pipeline).await
}
