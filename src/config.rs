//! Configuration types for rag-backfill

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default ingestion endpoint base URL
pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://localhost:9010";

/// Main configuration for one backfill run
///
/// Assembled from CLI flags and environment variables before the run starts
/// and immutable from then on.
#[derive(Clone, Debug)]
pub struct BackfillConfig {
    /// Postgres connection string (from `DATABASE_URL`)
    pub database_url: String,

    /// Base URL of the ingestion service (from `ORCHESTRATOR_URL`,
    /// default: `http://localhost:9010`)
    pub orchestrator_url: String,

    /// Path of the durable cursor checkpoint file (default: "cursor.json")
    pub cursor_file: PathBuf,

    /// Number of concurrent ingestion requests per batch (default: 4)
    pub concurrency: usize,

    /// Maximum articles fetched and dispatched per batch (default: 40)
    pub batch_size: usize,

    /// Read and batch without sending or checkpointing (default: false)
    pub dry_run: bool,

    /// Lower date bound; overrides the cursor position when set
    pub from: Option<NaiveDate>,

    /// Upper date bound, inclusive of the whole day (default: now)
    pub to: Option<NaiveDate>,

    /// Launch a local accelerator for this run (default: false)
    pub hyper_boost: bool,

    /// Embedding endpoint forwarded with each ingestion request when set
    /// (from `EMBEDDER_URL`)
    ///
    /// Superseded by the accelerator endpoint during hyper-boost runs; None
    /// means the ingestion service uses its own configured embedder.
    pub embedder_override_url: Option<String>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            orchestrator_url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            cursor_file: default_cursor_file(),
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            dry_run: false,
            from: None,
            to: None,
            hyper_boost: false,
            embedder_override_url: None,
        }
    }
}

impl BackfillConfig {
    /// Check the configuration before any I/O happens
    ///
    /// Returns [`Error::Config`] naming the offending key so `main` can print
    /// an actionable message and exit non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(Error::Config {
                message: "DATABASE_URL is required".into(),
                key: Some("DATABASE_URL".into()),
            });
        }
        if Url::parse(&self.orchestrator_url).is_err() {
            return Err(Error::Config {
                message: format!("invalid orchestrator URL: {}", self.orchestrator_url),
                key: Some("ORCHESTRATOR_URL".into()),
            });
        }
        if self.concurrency == 0 {
            return Err(Error::Config {
                message: "concurrency must be at least 1".into(),
                key: Some("concurrency".into()),
            });
        }
        if self.batch_size == 0 {
            return Err(Error::Config {
                message: "batch size must be at least 1".into(),
                key: Some("batch_size".into()),
            });
        }
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(Error::Config {
                message: format!("--from {from} is after --to {to}"),
                key: Some("from".into()),
            });
        }
        Ok(())
    }

    /// Explicit start instant when `--from` was given
    ///
    /// The first instant of that day in UTC. When set, it takes precedence
    /// over the cursor position.
    pub fn start_override(&self) -> Option<DateTime<Utc>> {
        self.from.map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// Exclusive upper bound for article timestamps
    ///
    /// `--to` covers its whole day, so the bound is the first instant of the
    /// following day. Without `--to` the bound is `now`.
    pub fn end_bound_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.to.and_then(|d| d.succ_opt()) {
            Some(next_day) => next_day.and_time(NaiveTime::MIN).and_utc(),
            None => now,
        }
    }
}

/// Accelerator container settings, resolved from the environment
///
/// Overridable via `HYPER_BOOST_IMAGE`, `HYPER_BOOST_MODEL` and
/// `HYPER_BOOST_READY_TIMEOUT_SECS`.
#[derive(Clone, Debug)]
pub struct HyperBoostSettings {
    /// Container image to launch (default: "ollama/ollama")
    pub image: String,

    /// Embedding model pulled after the service is ready
    /// (default: "nomic-embed-text")
    pub model: String,

    /// How long to wait for the service to answer health probes
    /// (default: 120 seconds)
    pub ready_timeout: Duration,
}

impl Default for HyperBoostSettings {
    fn default() -> Self {
        Self {
            image: default_accelerator_image(),
            model: default_accelerator_model(),
            ready_timeout: default_ready_timeout(),
        }
    }
}

impl HyperBoostSettings {
    /// Resolve settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(image) = get("HYPER_BOOST_IMAGE") {
            settings.image = image;
        }
        if let Some(model) = get("HYPER_BOOST_MODEL") {
            settings.model = model;
        }
        if let Some(raw) = get("HYPER_BOOST_READY_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| Error::Config {
                message: format!("invalid HYPER_BOOST_READY_TIMEOUT_SECS: {raw}"),
                key: Some("HYPER_BOOST_READY_TIMEOUT_SECS".into()),
            })?;
            settings.ready_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

// Default value functions
pub(crate) fn default_cursor_file() -> PathBuf {
    PathBuf::from("cursor.json")
}

pub(crate) fn default_concurrency() -> usize {
    4
}

pub(crate) fn default_batch_size() -> usize {
    40
}

fn default_accelerator_image() -> String {
    "ollama/ollama".into()
}

fn default_accelerator_model() -> String {
    "nomic-embed-text".into()
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(120)
}
