//! # rag-backfill
//!
//! Resumable backfill of historical articles into a RAG store.
//!
//! The backfill walks the platform's article table in a stable order,
//! submits each article to the orchestrator's ingestion endpoint, and
//! checkpoints its position in a durable cursor file after every fully
//! resolved batch. Runs can be interrupted at any point and resumed later
//! without losing or double-counting work beyond the last batch.
//!
//! ## Design Philosophy
//!
//! - **Resumable by default** - The cursor file is the only state; kill the
//!   process whenever you like
//! - **Failures are data** - A rejected article is logged and tallied, never
//!   a reason to stop the run
//! - **Read-only against the platform** - Articles are only ever read;
//!   ingestion happens through the orchestrator's API
//! - **Library-first** - The `backfill` binary is a thin CLI over this crate
//!
//! ## Quick Start
//!
//! ```no_run
//! use rag_backfill::{BackfillConfig, run_backfill};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BackfillConfig {
//!         database_url: "postgres://user:pw@localhost/articles".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let outcome = run_backfill(&config, CancellationToken::new()).await?;
//!     println!("{:?}", outcome.summary());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Command-line interface
pub mod cli;
/// Configuration types
pub mod config;
/// Durable cursor checkpoint
pub mod cursor;
/// Database read layer
pub mod db;
/// Batch dispatch to the ingestion endpoint
pub mod dispatch;
/// Error types
pub mod error;
/// Embedding accelerator lifecycle
pub mod hyperboost;
/// Logging bootstrap
pub mod logging;
/// Run orchestration
pub mod runner;

// Re-export commonly used types
pub use config::{BackfillConfig, HyperBoostSettings};
pub use cursor::Cursor;
pub use db::{Article, ArticleSource, Database, SourceBounds};
pub use dispatch::{BatchOutcome, Dispatcher, IngestClient};
pub use error::{AcceleratorError, CursorError, DatabaseError, Error, Result};
pub use hyperboost::{AcceleratorDriver, AcceleratorState, DockerDriver, HyperBoost};
pub use runner::{RunOutcome, RunSummary, run_backfill};

/// Wait for a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The CLI pairs this with a [`CancellationToken`] so a signal turns into a
/// cooperative shutdown: in-flight submissions drain and the cursor keeps
/// its last checkpoint.
///
/// [`CancellationToken`]: tokio_util::sync::CancellationToken
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Wait for a termination signal.
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
