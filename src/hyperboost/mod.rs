//! Throwaway embedding accelerator for hyper-boost runs.
//!
//! With `--hyper-boost` the run provisions its own embedding service in a
//! container, waits for it to come up, pre-pulls the embedding model, and
//! hands the resulting endpoint to the dispatcher so the orchestrator embeds
//! against dedicated capacity instead of the shared service. The container
//! is removed on every exit path; it never outlives the run.

use crate::config::HyperBoostSettings;
use crate::error::{AcceleratorError, Error, Result};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

pub use docker::{AcceleratorDriver, DockerDriver};

mod docker;

/// First readiness poll interval
const READY_POLL_INITIAL: Duration = Duration::from_millis(250);

/// Readiness poll interval cap
const READY_POLL_CAP: Duration = Duration::from_secs(5);

/// Per-probe HTTP timeout while polling for readiness
const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Model downloads run to several gigabytes on a cold cache
const MODEL_PULL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Lifecycle states of the managed accelerator container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorState {
    /// No container has been started
    Uninitialized,
    /// Container launched, service not yet answering
    Starting,
    /// Service answered the readiness probe and the model is available
    Ready,
    /// Teardown in progress
    Stopping,
    /// Container removed
    Stopped,
    /// Startup, readiness, or model pull failed
    Failed,
}

impl AcceleratorState {
    /// Short name for logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceleratorState::Uninitialized => "uninitialized",
            AcceleratorState::Starting => "starting",
            AcceleratorState::Ready => "ready",
            AcceleratorState::Stopping => "stopping",
            AcceleratorState::Stopped => "stopped",
            AcceleratorState::Failed => "failed",
        }
    }
}

#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
}

/// Manages one accelerator container from launch to removal.
///
/// The happy path is `start` then `wait_ready` then `pull_model`; each step
/// is fatal on failure and the runner refuses to touch the database or the
/// cursor until all three have succeeded. `stop` is safe to call in any
/// state and `Drop` force-removes the container as a last resort.
pub struct HyperBoost {
    driver: Box<dyn AcceleratorDriver>,
    settings: HyperBoostSettings,
    http: reqwest::Client,
    container_name: String,
    host_port: u16,
    state: AcceleratorState,
}

impl HyperBoost {
    /// Create a manager bound to a free local port
    pub fn new(driver: Box<dyn AcceleratorDriver>, settings: HyperBoostSettings) -> Result<Self> {
        let host_port = ephemeral_port()?;
        Self::with_port(driver, settings, host_port)
    }

    pub(crate) fn with_port(
        driver: Box<dyn AcceleratorDriver>,
        settings: HyperBoostSettings,
        host_port: u16,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            driver,
            settings,
            http,
            container_name: format!("hyperboost-{host_port}"),
            host_port,
            state: AcceleratorState::Uninitialized,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> AcceleratorState {
        self.state
    }

    /// Base URL of the accelerated embedding service
    pub fn embedder_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.host_port)
    }

    /// Launch the accelerator container
    pub async fn start(&mut self) -> Result<()> {
        if self.state != AcceleratorState::Uninitialized {
            return Err(self.invalid_state("start"));
        }

        tracing::info!(
            container = %self.container_name,
            image = %self.settings.image,
            port = self.host_port,
            driver = self.driver.name(),
            "Starting accelerator container"
        );

        self.state = AcceleratorState::Starting;
        if let Err(e) = self
            .driver
            .start(&self.container_name, &self.settings.image, self.host_port)
            .await
        {
            self.state = AcceleratorState::Failed;
            return Err(e);
        }

        Ok(())
    }

    /// Poll the service endpoint until it answers, with capped exponential
    /// backoff, failing once the configured readiness timeout is spent
    pub async fn wait_ready(&mut self) -> Result<()> {
        if self.state != AcceleratorState::Starting {
            return Err(self.invalid_state("wait_ready"));
        }

        let probe_url = format!("{}/", self.embedder_url());
        let started = tokio::time::Instant::now();
        let deadline = started + self.settings.ready_timeout;
        let mut delay = READY_POLL_INITIAL;

        loop {
            match self
                .http
                .get(&probe_url)
                .timeout(READY_PROBE_TIMEOUT)
                .send()
                .await
            {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {
                    self.state = AcceleratorState::Ready;
                    tracing::info!(
                        endpoint = %self.embedder_url(),
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Accelerator ready"
                    );
                    return Ok(());
                }
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "Accelerator not ready yet");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Accelerator readiness probe failed");
                }
            }

            let next_delay = add_jitter(delay);
            if tokio::time::Instant::now() + next_delay >= deadline {
                self.state = AcceleratorState::Failed;
                return Err(Error::Accelerator(AcceleratorError::NotReady {
                    endpoint: self.embedder_url(),
                    waited_secs: started.elapsed().as_secs(),
                }));
            }

            tokio::time::sleep(next_delay).await;
            delay = (delay * 2).min(READY_POLL_CAP);
        }
    }

    /// Pull the embedding model into the accelerator so the first dispatched
    /// article does not pay the download
    pub async fn pull_model(&mut self) -> Result<()> {
        if self.state != AcceleratorState::Ready {
            return Err(self.invalid_state("pull_model"));
        }

        let model = self.settings.model.clone();
        tracing::info!(model = %model, "Pulling embedding model, this may take a while on a cold cache");

        let url = format!("{}/api/pull", self.embedder_url());
        let response = self
            .http
            .post(&url)
            .timeout(MODEL_PULL_TIMEOUT)
            .json(&PullRequest { name: &model })
            .send()
            .await
            .map_err(|e| self.pull_failed(&model, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.pull_failed(&model, format!("server returned {status}")));
        }

        // The pull endpoint streams newline-delimited JSON progress records
        // and reports failures as an error field, still under HTTP 200.
        let body = response
            .text()
            .await
            .map_err(|e| self.pull_failed(&model, format!("reading response failed: {e}")))?;

        for line in body.lines() {
            if let Ok(record) = serde_json::from_str::<serde_json::Value>(line)
                && let Some(message) = record.get("error").and_then(|v| v.as_str())
            {
                return Err(self.pull_failed(&model, message.to_string()));
            }
        }

        tracing::info!(model = %model, "Embedding model available");
        Ok(())
    }

    /// Remove the accelerator container, tolerating teardown failures
    pub async fn stop(&mut self) {
        if matches!(
            self.state,
            AcceleratorState::Uninitialized | AcceleratorState::Stopped
        ) {
            return;
        }

        self.state = AcceleratorState::Stopping;
        tracing::info!(container = %self.container_name, "Removing accelerator container");

        if let Err(e) = self.driver.stop(&self.container_name).await {
            tracing::warn!(
                container = %self.container_name,
                error = %e,
                "Failed to remove accelerator container, remove it manually"
            );
        }

        self.state = AcceleratorState::Stopped;
    }

    fn invalid_state(&self, operation: &str) -> Error {
        Error::Accelerator(AcceleratorError::InvalidState {
            operation: operation.to_string(),
            state: self.state.as_str().to_string(),
        })
    }

    fn pull_failed(&mut self, model: &str, reason: String) -> Error {
        self.state = AcceleratorState::Failed;
        Error::Accelerator(AcceleratorError::ModelPullFailed {
            model: model.to_string(),
            reason,
        })
    }
}

impl Drop for HyperBoost {
    fn drop(&mut self) {
        if !matches!(
            self.state,
            AcceleratorState::Uninitialized | AcceleratorState::Stopped
        ) {
            tracing::warn!(
                container = %self.container_name,
                "Accelerator dropped without clean shutdown, force-removing container"
            );
            self.driver.stop_blocking(&self.container_name);
        }
    }
}

/// Ask the OS for a free port to publish the container on
fn ephemeral_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
