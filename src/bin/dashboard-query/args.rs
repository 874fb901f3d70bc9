use aqua_environments::{dashboard::DEFAULT_HISTORY_LIMIT, telemetry::STALENESS_THRESHOLD};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "TZ", default_value = "UTC")]
    pub timezone: Tz,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Latest channel statuses, forced offline once the snapshot is too old.
    Status {
        #[arg(
            long,
            default_value_t = STALENESS_THRESHOLD.num_minutes(),
            value_parser = clap::value_parser!(i64).range(1..),
        )]
        staleness_minutes: i64,
    },

    /// Most recent complete reading.
    Latest,

    /// Recent readings as per-channel series.
    Chart {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Recent status snapshots as per-channel series.
    StatusHistory {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["dashboard-query", "--database-url", "postgres://localhost/test", "status"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    fn staleness(args: Args) -> i64 {
        match args.command {
            Command::Status { staleness_minutes } => staleness_minutes,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn staleness_defaults_to_threshold() {
        assert_eq!(staleness(parse(&[]).unwrap()), 30);
        assert_eq!(staleness(parse(&["--staleness-minutes", "45"]).unwrap()), 45);
    }

    #[test]
    fn staleness_must_be_positive() {
        assert!(parse(&["--staleness-minutes", "0"]).is_err());
        assert!(parse(&["--staleness-minutes=-5"]).is_err());
    }
}
