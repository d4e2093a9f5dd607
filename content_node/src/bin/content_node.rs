use anyhow::Result;
use clap::Parser;
use content_node::{api::start_api_server, config::Config, node::build_state};
use log::info;
use std::path::PathBuf;

/// Content Node Arguments
#[derive(Parser)]
#[clap(name = "content-node")]
#[clap(about = "Validates, authorizes and stores signed scene deployments")]
struct Args {
    /// Path to node configuration file
    #[clap(long, default_value = content_node::config::DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    /// Overrides server.host
    #[clap(long)]
    host: Option<String>,

    /// Overrides server.port
    #[clap(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting content node...");
    info!("Config path: {:?}", args.config_path);

    let mut config = Config::load(&args.config_path)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!("Storage: {:?}", config.storage.kind);
    info!("Land registry: {}", config.land_registry.url);

    let state = build_state(&config).await?;
    start_api_server(&config.bind_address(), state).await
}
