mod args;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use aqua_environments::{
    dashboard::{chart_series, current_status, latest_reading, status_history},
    db::new_pool,
};
use args::{Args, Command};
use chrono::{TimeDelta, Utc};
use clap::Parser as _;
use serde::Serialize;

const EXIT_NOT_FOUND: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    match run().await {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(EXIT_NOT_FOUND),
        Err(e) => {
            tracing::error!("dashboard query failed: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,aqua_environments=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize tracing")
}

/// Returns `false` when there was nothing to report.
async fn run() -> Result<bool> {
    let args = Args::parse();

    let pool = new_pool(&args.database_url, 1).await?;

    match args.command {
        Command::Status { staleness_minutes } => {
            let threshold = TimeDelta::try_minutes(staleness_minutes)
                .context("staleness window out of range")?;
            let report = current_status(&pool, Utc::now(), threshold)
                .await
                .context("failed to fetch latest sensor status")?;
            match report {
                Some(report) => print_json(&report),
                None => not_found("no sensor status found"),
            }
        }
        Command::Latest => {
            let reading = latest_reading(&pool)
                .await
                .context("failed to fetch latest sensor reading")?;
            match reading {
                Some(reading) => print_json(&reading),
                None => not_found("no sensor data found"),
            }
        }
        Command::Chart { limit } => {
            let chart = chart_series(&pool, limit, args.timezone)
                .await
                .context("failed to fetch sensor readings")?;
            print_json(&chart)
        }
        Command::StatusHistory { limit } => {
            let history = status_history(&pool, limit, args.timezone)
                .await
                .context("failed to fetch sensor status history")?;
            print_json(&history)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<bool> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize response")?;
    println!("{json}");
    Ok(true)
}

fn not_found(message: &str) -> Result<bool> {
    println!("{}", serde_json::json!({ "message": message }));
    Ok(false)
}
