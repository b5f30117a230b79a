use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedsnap::app::AppContext;
use feedsnap::cli::Cli;
use feedsnap::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let pipeline = AppContext::new(config)?.launch().await?;
    pipeline.run().await?;

    Ok(())
}
