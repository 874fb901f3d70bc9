mod args;
mod input;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use aqua_environments::{
    db::{migrate, new_pool},
    ingest::Ingestor,
};
use args::Args;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    if let Err(e) = run().await {
        tracing::error!("telemetry ingester failed: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

fn init_tracing() -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,aqua_environments=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize tracing")
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let pool = new_pool(&args.database_url, args.max_connections).await?;
    migrate(&pool).await?;

    let stream = input::open(&args.input).await?;
    tracing::info!(input = %args.input.display(), "device stream opened");

    let mut ingestor = Ingestor::new(pool);

    tokio::select! {
        res = ingestor.run(stream) => res.context("ingestion stopped")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
    }

    tracing::info!(stats = ?ingestor.stats(), "telemetry ingester stopped");
    Ok(())
}
