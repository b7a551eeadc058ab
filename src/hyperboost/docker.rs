//! Docker CLI accelerator driver.

use crate::error::{AcceleratorError, Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Port the accelerator service listens on inside the container
const SERVICE_PORT: u16 = 11434;

/// Launch mechanism for the throwaway accelerator container
///
/// The manager drives the lifecycle; implementations only start and remove
/// the container. Swappable so tests run without a container runtime.
#[async_trait]
pub trait AcceleratorDriver: Send + Sync {
    /// Launch the container, publishing the service on `host_port`
    async fn start(&self, name: &str, image: &str, host_port: u16) -> Result<()>;

    /// Force-remove the container
    async fn stop(&self, name: &str) -> Result<()>;

    /// Synchronous last-resort removal, used from `Drop`
    fn stop_blocking(&self, _name: &str) {}

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Driver that shells out to the `docker` binary
pub struct DockerDriver {
    binary_path: PathBuf,
}

impl DockerDriver {
    /// Create a driver with an explicit docker binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Locate docker in PATH
    pub fn from_path() -> Result<Self> {
        which::which("docker").map(Self::new).map_err(|e| {
            Error::Accelerator(AcceleratorError::RuntimeMissing(format!(
                "docker not found in PATH: {e}"
            )))
        })
    }
}

#[async_trait]
impl AcceleratorDriver for DockerDriver {
    async fn start(&self, name: &str, image: &str, host_port: u16) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .args(["run", "-d", "--rm", "--name", name, "-p"])
            .arg(format!("127.0.0.1:{host_port}:{SERVICE_PORT}"))
            .arg(image)
            .output()
            .await
            .map_err(|e| {
                Error::Accelerator(AcceleratorError::StartFailed {
                    name: name.to_string(),
                    reason: format!("failed to execute docker: {e}"),
                })
            })?;

        if !output.status.success() {
            return Err(Error::Accelerator(AcceleratorError::StartFailed {
                name: name.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }));
        }

        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .args(["rm", "-f", name])
            .output()
            .await
            .map_err(|e| {
                Error::Accelerator(AcceleratorError::StartFailed {
                    name: name.to_string(),
                    reason: format!("failed to execute docker: {e}"),
                })
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        // Already gone is the state we wanted.
        if !output.status.success() && !stderr.contains("No such container") {
            return Err(Error::Accelerator(AcceleratorError::StartFailed {
                name: name.to_string(),
                reason: stderr.trim().to_string(),
            }));
        }

        Ok(())
    }

    fn stop_blocking(&self, name: &str) {
        let _ = std::process::Command::new(&self.binary_path)
            .args(["rm", "-f", name])
            .output();
    }

    fn name(&self) -> &'static str {
        "docker-cli"
    }
}
