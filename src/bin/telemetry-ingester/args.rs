use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    /// Device stream to read, one `<label>: <value>` per line. `-` reads stdin.
    #[arg(long, env = "TELEMETRY_INPUT", default_value = "-")]
    pub input: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 2)]
    pub max_connections: u32,
}
