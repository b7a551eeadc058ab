//! CLI entry-point for the backfill run itself.

use crate::config::{BackfillConfig, DEFAULT_ORCHESTRATOR_URL};
use crate::error::Result;
use crate::runner::{RunOutcome, RunSummary, run_backfill};
use chrono::NaiveDate;
use clap::Args as ClapArgs;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Args for the `run` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Start date (YYYY-MM-DD, from midnight UTC); overrides the saved cursor
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive of the whole day
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// Articles fetched and dispatched per batch
    #[arg(long, default_value_t = crate::config::default_batch_size())]
    pub batch_size: usize,

    /// Concurrent ingestion requests per batch
    #[arg(long, default_value_t = crate::config::default_concurrency())]
    pub concurrency: usize,

    /// Read and count articles without sending or checkpointing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Provision a dedicated embedding accelerator for this run
    #[arg(long)]
    pub hyper_boost: bool,

    /// Cursor checkpoint file
    #[arg(long, default_value_os_t = crate::config::default_cursor_file())]
    pub cursor_file: PathBuf,
}

impl Args {
    /// Combine CLI flags with environment settings into a run configuration.
    fn into_config(self) -> BackfillConfig {
        BackfillConfig {
            database_url: std::env::var("DATABASE_URL").unwrap_or_default(),
            orchestrator_url: std::env::var("ORCHESTRATOR_URL")
                .unwrap_or_else(|_| DEFAULT_ORCHESTRATOR_URL.to_string()),
            embedder_override_url: std::env::var("EMBEDDER_URL").ok(),
            cursor_file: self.cursor_file,
            concurrency: self.concurrency,
            batch_size: self.batch_size,
            dry_run: self.dry_run,
            from: self.from,
            to: self.to,
            hyper_boost: self.hyper_boost,
        }
    }
}

/// Execute one backfill run and print its summary.
pub async fn run(args: Args) -> Result<()> {
    let config = args.into_config();
    config.validate()?;

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        crate::wait_for_signal().await;
        signal_token.cancel();
    });

    match run_backfill(&config, cancel_token).await? {
        RunOutcome::Completed(summary) => print_summary("Backfill complete", &summary),
        RunOutcome::Interrupted(summary) => {
            print_summary("Backfill interrupted, progress saved", &summary);
        }
    }

    Ok(())
}

fn print_summary(heading: &str, summary: &RunSummary) {
    println!("{heading}");
    println!("  Total:   {}", summary.total);
    println!("  Success: {}", summary.success);
    println!("  Failed:  {}", summary.failed);
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM-DD, got '{raw}'"))
}
