//! # Backfill CLI (`backfill`)
//!
//! Command-line front end for re-indexing historical articles into the RAG
//! store. Progress lives in a durable cursor file, so a run can be stopped
//! at any time and picked up again later.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `backfill run` | Stream articles into the index, resuming from the cursor |
//! | `backfill status` | Show the saved cursor position |
//! | `backfill reset-cursor` | Clear progress so the next run starts over |
//!
//! ## Examples
//!
//! ```bash
//! # Resume (or start) a backfill against the local orchestrator
//! DATABASE_URL=postgres://user:pw@localhost/articles backfill run
//!
//! # Backfill one historical window, 8 requests in flight
//! backfill run --from 2024-01-01 --to 2024-06-30 --concurrency 8
//!
//! # Measure the remaining work without sending anything
//! backfill run --dry-run
//!
//! # Run against a dedicated throwaway embedding container
//! backfill run --hyper-boost
//! ```
//!
//! Interrupting a run with Ctrl+C is safe: in-flight submissions drain, the
//! cursor keeps its last checkpoint, and the process exits cleanly.

use rag_backfill::cli::Cli;
use rag_backfill::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = logging::init_tracing(cli.verbose) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match cli.dispatch().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
