//! Command-line interface wiring for the backfill binary.

use crate::error::Result;
use clap::{Parser, Subcommand};

pub mod reset;
pub mod run;
pub mod status;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(
    name = "backfill",
    version,
    about = "Resumable backfill of historical articles into the RAG index"
)]
pub struct Cli {
    /// Enable debug-level logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run::run(args).await,
            Commands::Status(args) => status::run(args).await,
            Commands::ResetCursor(args) => reset::run(args).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Stream historical articles into the RAG index, resuming from the
    /// saved cursor
    Run(run::Args),
    /// Show the saved cursor position
    Status(status::Args),
    /// Clear saved progress so the next run starts from the beginning
    ResetCursor(reset::Args),
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_date_bounds_and_tuning_flags() {
        let cli = Cli::try_parse_from([
            "backfill",
            "run",
            "--from",
            "2025-01-02",
            "--to",
            "2025-02-28",
            "--batch-size",
            "10",
            "--concurrency",
            "2",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.from, NaiveDate::from_ymd_opt(2025, 1, 2));
                assert_eq!(args.to, NaiveDate::from_ymd_opt(2025, 2, 28));
                assert_eq!(args.batch_size, 10);
                assert_eq!(args.concurrency, 2);
                assert!(args.dry_run);
                assert!(!args.hyper_boost);
            }
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn run_rejects_malformed_dates() {
        let result = Cli::try_parse_from(["backfill", "run", "--from", "02/01/2025"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_defaults_match_the_documented_values() {
        let cli = Cli::try_parse_from(["backfill", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.batch_size, 40);
                assert_eq!(args.concurrency, 4);
                assert_eq!(args.cursor_file.to_str(), Some("cursor.json"));
                assert!(!args.dry_run);
            }
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn reset_cursor_is_spelled_with_a_hyphen() {
        let cli = Cli::try_parse_from([
            "backfill",
            "reset-cursor",
            "--cursor-file",
            "/tmp/c.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::ResetCursor(_)));
    }

    #[test]
    fn verbose_is_accepted_anywhere() {
        let cli = Cli::try_parse_from(["backfill", "status", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
