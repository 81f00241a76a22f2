use clap::Parser;
use spikebot::server;
use spikebot::settings::{load_env_files, AppConfig};
use spikebot::Result;
use tracing_subscriber::EnvFilter;

/// AI backend for the Crash/Boom scalping EA
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Bind host (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides SERVER_PORT)
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    load_env_files();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    tracing::info!("OpenAI Model: {}", config.openai_model);
    tracing::info!(
        "Spike detection: min size {} pips, recovery window {} bars, retracement window {} bars",
        config.min_spike_size,
        config.recovery_window,
        config.retracement_window
    );
    if !config.openai_configured() {
        tracing::warn!("Please set OPENAI_API_KEY environment variable (default parameters will be served)");
    }

    server::serve(&config).await?;

    tracing::info!("AI backend server stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("spikebot=info,tower_http=info")),
        )
        .init();
}
