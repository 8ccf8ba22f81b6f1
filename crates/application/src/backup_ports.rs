use std::path::{Path, PathBuf};

use arkiva_core::{AppResult, ProjectName};
use arkiva_domain::{BackupArchive, RetentionPolicy};
use async_trait::async_trait;

/// Upload destination in the sync tool's `remote:folder` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDestination {
    /// Configured remote name known to the sync tool.
    pub remote_name: String,
    /// Folder within the remote.
    pub folder: String,
}

impl RemoteDestination {
    /// Creates a remote destination.
    #[must_use]
    pub fn new(remote_name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            remote_name: remote_name.into(),
            folder: folder.into(),
        }
    }

    /// Renders the `remote:folder` target string passed to the sync
    /// tool.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}:{}", self.remote_name, self.folder)
    }
}

/// Input for one backup run.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Project being backed up.
    pub project: ProjectName,
    /// Source directory to archive.
    pub project_dir: PathBuf,
    /// Storage root holding all archives for all projects.
    pub backup_root: PathBuf,
    /// Remote upload destination.
    pub destination: RemoteDestination,
    /// Retention keep-counts applied after the upload step.
    pub policy: RetentionPolicy,
    /// Whether to deliver a webhook notification after a successful
    /// upload.
    pub notify: bool,
}

/// Payload delivered to the webhook after a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupNotice {
    /// Project name.
    pub project: String,
    /// Run timestamp in archive-filename form.
    pub date: String,
    /// Fixed success marker.
    pub test: String,
}

/// Port for producing a compressed archive of a directory tree.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archives everything under `source_dir` into `destination`,
    /// preserving relative paths.
    ///
    /// Implementations must never leave a partially written file at
    /// `destination`: write to a temporary name and rename on success,
    /// so an inventory scan cannot mistake a torn archive for a
    /// complete one.
    async fn create_archive(&self, source_dir: &Path, destination: &Path) -> AppResult<()>;
}

/// Port for shipping an archive to remote storage.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads a local file to the remote destination.
    async fn upload(&self, local_path: &Path, destination: &RemoteDestination) -> AppResult<()>;
}

/// Port for delivering run notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notice; success means the receiver acknowledged it.
    async fn notify(&self, notice: BackupNotice) -> AppResult<()>;
}

/// Port over the archive storage backend.
///
/// There is no persisted index: the inventory is reconstructed from the
/// filesystem on every call, which keeps the tool self-healing after
/// partial runs.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Lists all archives for a project under `root/<project>`, parsed
    /// from filenames and sorted newest-first (ties broken by path).
    /// Files whose names do not parse are skipped, not reported.
    async fn list_archives(
        &self,
        root: &Path,
        project: &ProjectName,
    ) -> AppResult<Vec<BackupArchive>>;

    /// Removes one archive file. Returns `Ok(false)` when the file was
    /// already gone, so a retry of a partial run never fails here.
    async fn remove_archive(&self, path: &Path) -> AppResult<bool>;
}
