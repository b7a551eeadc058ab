//! Run orchestration for the backfill.
//!
//! A run moves through initialization (optional accelerator bring-up, cursor
//! load, database connect), then a streaming loop, then teardown. The loop is
//! a two-stage pipeline: a producer task pages articles out of Postgres in
//! cursor order while the consumer dispatches the previous batch and
//! checkpoints the cursor after each fully resolved batch. A cancelled run
//! drains its in-flight submissions, keeps the last checkpoint, and reports
//! itself interrupted rather than failed.

use crate::config::{BackfillConfig, HyperBoostSettings};
use crate::cursor::Cursor;
use crate::db::{Article, ArticleSource, Database, SourceBounds};
use crate::dispatch::{BatchOutcome, Dispatcher};
use crate::error::{Error, Result};
use crate::hyperboost::{DockerDriver, HyperBoost};
use chrono::Utc;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Batches buffered between the database reader and the dispatcher
const PIPELINE_DEPTH: usize = 2;

/// Tally of one run, printed as the final summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Articles submitted (or counted in dry-run mode)
    pub total: u64,
    /// Articles the ingestion endpoint accepted
    pub success: u64,
    /// Articles whose submission failed and was logged
    pub failed: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &BatchOutcome) {
        self.total += outcome.attempted();
        self.success += outcome.accepted;
        self.failed += outcome.failed;
    }
}

/// How a run ended
///
/// Per-article failures are tallied in the summary, not here; both variants
/// exit the process with status zero. Fatal errors surface as [`Error`]
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stream was exhausted
    Completed(RunSummary),
    /// Shutdown was requested and the cursor holds the last checkpoint
    Interrupted(RunSummary),
}

impl RunOutcome {
    /// Tally of the run regardless of how it ended
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(summary) | RunOutcome::Interrupted(summary) => summary,
        }
    }
}

/// Execute one backfill run to completion, interruption, or failure
///
/// With hyper-boost enabled this provisions the accelerator first; the
/// database and the cursor file are not touched until it is fully ready.
pub async fn run_backfill(
    config: &BackfillConfig,
    cancel_token: CancellationToken,
) -> Result<RunOutcome> {
    let accelerator = if config.hyper_boost {
        let settings = HyperBoostSettings::from_env()?;
        let driver = DockerDriver::from_path()?;
        Some(HyperBoost::new(Box::new(driver), settings)?)
    } else {
        None
    };

    run_with(config, accelerator, cancel_token).await
}

/// Run with an already constructed (but not started) accelerator
pub(crate) async fn run_with(
    config: &BackfillConfig,
    mut accelerator: Option<HyperBoost>,
    cancel_token: CancellationToken,
) -> Result<RunOutcome> {
    // The accelerator must be fully ready before any database or cursor
    // access; a failed bring-up leaves both untouched.
    let embedder_url = match accelerator.as_mut() {
        Some(boost) => {
            let brought_up = tokio::select! {
                result = bring_up(boost) => Some(result),
                _ = cancel_token.cancelled() => None,
            };
            match brought_up {
                Some(Ok(())) => Some(boost.embedder_url()),
                Some(Err(e)) => {
                    boost.stop().await;
                    return Err(e);
                }
                None => {
                    tracing::info!("Shutdown requested during accelerator startup");
                    boost.stop().await;
                    return Ok(RunOutcome::Interrupted(RunSummary::default()));
                }
            }
        }
        None => config.embedder_override_url.clone(),
    };

    let result = stream_articles(config, embedder_url, &cancel_token).await;

    if let Some(mut boost) = accelerator {
        boost.stop().await;
    }

    let (summary, interrupted) = result?;
    if interrupted {
        tracing::info!("backfill interrupted, cursor saved for resume");
        Ok(RunOutcome::Interrupted(summary))
    } else {
        tracing::info!(
            total = summary.total,
            success = summary.success,
            failed = summary.failed,
            "Backfill complete"
        );
        Ok(RunOutcome::Completed(summary))
    }
}

async fn bring_up(boost: &mut HyperBoost) -> Result<()> {
    boost.start().await?;
    boost.wait_ready().await?;
    boost.pull_model().await
}

/// Connect, position the stream, and drain it through the dispatcher
async fn stream_articles(
    config: &BackfillConfig,
    embedder_url: Option<String>,
    cancel_token: &CancellationToken,
) -> Result<(RunSummary, bool)> {
    let cursor = Cursor::load(&config.cursor_file).await?;
    if cursor.is_empty() {
        tracing::info!("No cursor found, starting from the beginning");
    } else {
        tracing::info!(
            last_created_at = %cursor.last_created_at.to_rfc3339(),
            processed = cursor.processed_count,
            "Resuming from saved cursor"
        );
    }

    let db = Database::connect(&config.database_url).await?;
    let bounds = SourceBounds::for_run(&cursor, config, Utc::now());
    let source = db.article_source(bounds);

    let remaining = source.count_remaining().await?;
    tracing::info!(remaining, dry_run = config.dry_run, "Starting backfill");

    let dispatcher = Dispatcher::new(config, embedder_url)?;
    let result = run_pipeline(
        source,
        &dispatcher,
        cursor,
        &config.cursor_file,
        config.dry_run,
        config.batch_size,
        cancel_token,
    )
    .await;

    db.close().await;
    result
}

/// Stream batches from `source` through `dispatcher`, checkpointing after
/// each complete batch
///
/// Returns the run tally and whether the stream stopped on a shutdown
/// request. The cursor advances past every resolved article of a complete
/// batch, failed submissions included; an incomplete batch leaves it alone so
/// a resumed run redoes that batch.
pub(crate) async fn run_pipeline<S>(
    mut source: S,
    dispatcher: &Dispatcher,
    mut cursor: Cursor,
    cursor_path: &Path,
    dry_run: bool,
    batch_size: usize,
    cancel_token: &CancellationToken,
) -> Result<(RunSummary, bool)>
where
    S: ArticleSource + 'static,
{
    let (batch_tx, mut batch_rx) = mpsc::channel::<Result<Vec<Article>>>(PIPELINE_DEPTH);
    let producer_cancel = cancel_token.clone();
    let producer = tokio::spawn(async move {
        loop {
            let page = tokio::select! {
                _ = producer_cancel.cancelled() => break,
                page = source.next_page(batch_size) => page,
            };
            let stop = match &page {
                Ok(batch) if batch.is_empty() => break,
                Ok(_) => false,
                Err(_) => true,
            };
            if batch_tx.send(page).await.is_err() || stop {
                break;
            }
        }
    });

    let mut summary = RunSummary::default();
    let mut interrupted = false;
    let mut run_error: Option<Error> = None;

    while let Some(page) = batch_rx.recv().await {
        let batch = match page {
            Ok(batch) => batch,
            Err(e) => {
                run_error = Some(e);
                break;
            }
        };

        if cancel_token.is_cancelled() {
            interrupted = true;
            break;
        }

        let outcome = dispatcher.dispatch_batch(&batch, cancel_token).await;
        summary.record(&outcome);

        if !outcome.is_complete() {
            interrupted = true;
            break;
        }

        if !dry_run {
            let now = Utc::now();
            cursor = batch
                .iter()
                .fold(cursor, |current, article| current.advance(article, now));
            if let Err(e) = cursor.save(cursor_path).await {
                run_error = Some(e);
                break;
            }
        }

        tracing::info!(
            processed = summary.total,
            failed = summary.failed,
            "Batch processed"
        );
    }

    // A cancellation can also surface as the producer closing the channel.
    if cancel_token.is_cancelled() {
        interrupted = true;
    }

    drop(batch_rx);
    let _ = producer.await;

    match run_error {
        Some(e) => Err(e),
        None => Ok((summary, interrupted)),
    }
}
