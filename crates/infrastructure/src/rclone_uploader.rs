use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use arkiva_application::{RemoteDestination, Uploader};
use arkiva_core::{AppError, AppResult};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::warn;

/// Uploader shelling out to an rclone-compatible sync binary.
///
/// The subprocess runs `<binary> copy <local> <remote:folder>`; exit
/// code 0 means success and stderr is surfaced on failure. Every
/// attempt is bounded by a timeout.
pub struct RcloneUploader {
    binary: String,
    timeout: Duration,
    max_attempts: u8,
}

impl RcloneUploader {
    /// Creates an uploader for the given sync binary.
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Duration, max_attempts: u8) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn copy_once(&self, local_path: &Path, target: &str) -> AppResult<()> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .arg("copy")
                .arg(local_path)
                .arg(target)
                .stdin(Stdio::null())
                .output(),
        )
        .await
        .map_err(|_| {
            AppError::Transfer(format!(
                "'{} copy' timed out after {}s",
                self.binary,
                self.timeout.as_secs()
            ))
        })?
        .map_err(|error| {
            AppError::Transfer(format!("failed to run '{} copy': {error}", self.binary))
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(AppError::Transfer(format!(
            "'{} copy' exited with {}: {}",
            self.binary,
            output.status,
            stderr.trim()
        )))
    }
}

#[async_trait]
impl Uploader for RcloneUploader {
    async fn upload(&self, local_path: &Path, destination: &RemoteDestination) -> AppResult<()> {
        let target = destination.target();
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=self.max_attempts {
            match self.copy_once(local_path, &target).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    warn!(
                        attempt,
                        target_remote = %target,
                        error = %error,
                        "upload attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Transfer("upload exhausted retries".to_owned())))
    }
}
