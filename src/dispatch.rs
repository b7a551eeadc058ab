//! Batch dispatch to the ingestion endpoint.
//!
//! Each batch fans its articles out through a bounded pool of concurrent
//! submissions. Individual failures are logged and tallied, never fatal; the
//! caller checkpoints only after a batch reports itself complete.

use crate::config::BackfillConfig;
use crate::db::Article;
use crate::error::Result;
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Path of the ingestion endpoint, relative to the orchestrator base URL
pub const INGEST_PATH: &str = "/internal/rag/backfill";

/// Per-request timeout; also bounds how long in-flight sends can delay
/// a cooperative shutdown
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Ingestion request payload, one POST per article
#[derive(Debug, Serialize)]
struct IngestRequest<'a> {
    article_id: &'a str,
    title: &'a str,
    body: &'a str,
    /// Local accelerator endpoint; absent unless hyper-boost is active
    #[serde(skip_serializing_if = "Option::is_none")]
    embedder_url: Option<&'a str>,
}

/// Why a single article's submission failed
///
/// Never fatal for the run: the dispatcher logs it, counts it, and moves on.
#[derive(Debug, Error)]
pub enum IngestFailure {
    /// Endpoint answered with something other than 202 Accepted
    #[error("endpoint returned {status}")]
    Rejected {
        /// The unexpected response status
        status: StatusCode,
    },

    /// Request never produced a response (connect, timeout, protocol)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP client for the ingestion endpoint
///
/// Submitting an `article_id` the endpoint has already indexed is assumed to
/// be deduplicated downstream; resuming a run may replay at most the last
/// unconfirmed batch.
pub struct IngestClient {
    http: reqwest::Client,
    endpoint: String,
    embedder_url: Option<String>,
}

impl IngestClient {
    /// Build the client from run configuration
    ///
    /// `embedder_url` is the resolved embedding endpoint for this run, the
    /// accelerator when hyper-boost is active, otherwise the configured
    /// override or nothing.
    pub fn new(config: &BackfillConfig, embedder_url: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let endpoint = format!(
            "{}{}",
            config.orchestrator_url.trim_end_matches('/'),
            INGEST_PATH
        );

        Ok(Self {
            http,
            endpoint,
            embedder_url,
        })
    }

    /// Submit one article; only 202 Accepted counts as success
    pub async fn send_article(&self, article: &Article) -> std::result::Result<(), IngestFailure> {
        let payload = IngestRequest {
            article_id: &article.id,
            title: &article.title,
            body: &article.body,
            embedder_url: self.embedder_url.as_deref(),
        };

        let response = self.http.post(&self.endpoint).json(&payload).send().await?;

        match response.status() {
            StatusCode::ACCEPTED => Ok(()),
            status => Err(IngestFailure::Rejected { status }),
        }
    }
}

/// Outcome of dispatching one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Articles the endpoint accepted
    pub accepted: u64,
    /// Articles that were submitted and failed (logged, non-fatal)
    pub failed: u64,
    /// Articles never submitted because shutdown began mid-batch
    pub skipped: u64,
}

impl BatchOutcome {
    /// Every article in the batch resolved to accepted or failed
    ///
    /// Only a complete batch may advance the cursor; a batch cut short by
    /// cancellation must be redone on resume.
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }

    /// Articles actually submitted (accepted + failed)
    pub fn attempted(&self) -> u64 {
        self.accepted + self.failed
    }
}

/// Fans batches out to the ingestion endpoint with bounded concurrency
pub struct Dispatcher {
    client: IngestClient,
    concurrency: usize,
    dry_run: bool,
}

impl Dispatcher {
    /// Build the dispatcher from run configuration and the resolved
    /// embedding endpoint
    pub fn new(config: &BackfillConfig, embedder_url: Option<String>) -> Result<Self> {
        Ok(Self {
            client: IngestClient::new(config, embedder_url)?,
            concurrency: config.concurrency,
            dry_run: config.dry_run,
        })
    }

    /// Submit every article of one batch, up to `concurrency` in flight
    ///
    /// Articles enter the pool in stream order; completions may interleave.
    /// Once `cancel_token` fires, no new submission starts, in-flight ones
    /// drain (bounded by the request timeout), and the skipped remainder
    /// marks the batch incomplete.
    pub async fn dispatch_batch(
        &self,
        batch: &[Article],
        cancel_token: &CancellationToken,
    ) -> BatchOutcome {
        if self.dry_run {
            tracing::info!(articles = batch.len(), "Dry run: batch read, not submitted");
            return BatchOutcome {
                accepted: batch.len() as u64,
                ..BatchOutcome::default()
            };
        }

        let results: Vec<SendResult> = stream::iter(batch)
            .map(|article| {
                let client = &self.client;
                async move {
                    if cancel_token.is_cancelled() {
                        return SendResult::Skipped;
                    }
                    match client.send_article(article).await {
                        Ok(()) => {
                            tracing::debug!(article_id = %article.id, "Article accepted");
                            SendResult::Accepted
                        }
                        Err(e) => {
                            tracing::warn!(
                                article_id = %article.id,
                                error = %e,
                                "Failed to submit article"
                            );
                            SendResult::Failed
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                SendResult::Accepted => outcome.accepted += 1,
                SendResult::Failed => outcome.failed += 1,
                SendResult::Skipped => outcome.skipped += 1,
            }
        }
        outcome
    }
}

enum SendResult {
    Accepted,
    Failed,
    Skipped,
}
