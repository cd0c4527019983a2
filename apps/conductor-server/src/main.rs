use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use conductor_config::ConductorConfig;

#[derive(Debug, Parser)]
#[command(name = "conductor-server")]
struct Args {
    #[arg(long, default_value = "config/conductor.yaml")]
    config: PathBuf,
    /// Overrides server.listen from the config file
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = if args.config.exists() {
        conductor_config::load_config(&args.config)?
    } else {
        tracing::info!(path = %args.config.display(), "config file not found; using defaults");
        ConductorConfig::default()
    };

    let listen = match args.listen {
        Some(listen) => listen,
        None => config
            .server
            .listen
            .parse()
            .context("invalid server.listen address")?,
    };

    conductor_server::run_server(config, listen).await
}
