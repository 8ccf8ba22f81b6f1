use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use arkiva_core::{AppError, AppResult};
use tracing::warn;

const LOCK_FILE_NAME: &str = ".arkiva.lock";

/// Advisory per-root run lock.
///
/// Inventory-then-delete is a scan-then-act sequence, so two concurrent
/// runs against the same backup root could race each other. The lock is
/// a `create_new` file under the root; a second acquirer fails fast
/// instead of racing.
///
/// The holder's pid is recorded in the file and echoed in the
/// contention error. A crashed run leaves the file behind; once that
/// pid is confirmed dead, deleting the file recovers the lock.
#[derive(Debug, Clone)]
pub struct FsRunLock {
    path: PathBuf,
}

impl FsRunLock {
    /// Creates a lock handle for one backup root.
    #[must_use]
    pub fn new(backup_root: &Path) -> Self {
        Self {
            path: backup_root.join(LOCK_FILE_NAME),
        }
    }

    /// Acquires the lock, failing when another run already holds it.
    /// The returned guard releases the lock on drop.
    pub async fn acquire(&self) -> AppResult<RunLockGuard> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|error| {
                    AppError::Storage(format!(
                        "failed to create backup root '{}': {error}",
                        parent.display()
                    ))
                })?;
            }

            let lock_file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path);
            match lock_file {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    Ok(RunLockGuard { path })
                }
                Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                    let holder = std::fs::read_to_string(&path)
                        .ok()
                        .map(|contents| contents.trim().to_owned())
                        .filter(|contents| !contents.is_empty())
                        .unwrap_or_else(|| "unknown".to_owned());
                    Err(AppError::Storage(format!(
                        "lock file '{}' exists (held by pid {holder}); another run \
                         appears to be active. If that run crashed, delete the file \
                         to recover",
                        path.display()
                    )))
                }
                Err(error) => Err(AppError::Storage(format!(
                    "failed to create lock file '{}': {error}",
                    path.display()
                ))),
            }
        })
        .await
        .map_err(|error| AppError::Internal(format!("lock task failed: {error}")))?
    }
}

/// Held run lock; removing the lock file on drop releases it.
#[derive(Debug)]
pub struct RunLockGuard {
    path: PathBuf,
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            if error.kind() != ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    error = %error,
                    "failed to release run lock"
                );
            }
        }
    }
}
