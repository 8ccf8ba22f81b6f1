use std::path::PathBuf;
use std::sync::Arc;

use arkiva_core::{AppResult, ProjectName};
use arkiva_domain::{TIMESTAMP_FORMAT, archive_file_name, archive_relative_dir};
use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::backup_ports::{Archiver, BackupNotice, BackupRequest, Notifier, Uploader};
use crate::retention_service::{RetentionFailure, RetentionService};

/// Marker value the webhook receiver keys on.
const NOTICE_SUCCESS_MARKER: &str = "BackupSuccessful";

/// Summary of one completed backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Where the new archive was written.
    pub archive_path: PathBuf,
    /// Whether the remote upload succeeded.
    pub uploaded: bool,
    /// Archives removed by the retention pass.
    pub deleted: Vec<PathBuf>,
    /// Per-archive retention removal failures.
    pub retention_failures: Vec<RetentionFailure>,
    /// Whether the webhook notification was delivered.
    pub notified: bool,
}

/// Orchestrates one backup run: archive, upload, prune, report.
///
/// Only archive creation is fatal. Upload, retention, and notification
/// failures degrade the run but never abort it, so local disk usage
/// stays bounded even when the remote side is down.
#[derive(Clone)]
pub struct BackupService {
    archiver: Arc<dyn Archiver>,
    uploader: Arc<dyn Uploader>,
    notifier: Arc<dyn Notifier>,
    retention: RetentionService,
}

impl BackupService {
    /// Creates a backup service from port implementations.
    #[must_use]
    pub fn new(
        archiver: Arc<dyn Archiver>,
        uploader: Arc<dyn Uploader>,
        notifier: Arc<dyn Notifier>,
        retention: RetentionService,
    ) -> Self {
        Self {
            archiver,
            uploader,
            notifier,
            retention,
        }
    }

    /// Runs one backup stamped with the current wall-clock time.
    pub async fn run(&self, request: &BackupRequest) -> AppResult<RunReport> {
        self.run_at(request, chrono::Local::now().naive_local())
            .await
    }

    /// Runs one backup stamped with an explicit instant.
    pub async fn run_at(
        &self,
        request: &BackupRequest,
        timestamp: NaiveDateTime,
    ) -> AppResult<RunReport> {
        let archive_path = plan_archive_path(request, timestamp);

        info!(
            project = %request.project,
            source = %request.project_dir.display(),
            archive = %archive_path.display(),
            "creating archive"
        );
        self.archiver
            .create_archive(&request.project_dir, &archive_path)
            .await?;

        let uploaded = match self
            .uploader
            .upload(&archive_path, &request.destination)
            .await
        {
            Ok(()) => {
                info!(target_remote = %request.destination.target(), "upload succeeded");
                true
            }
            Err(error) => {
                warn!(
                    target_remote = %request.destination.target(),
                    error = %error,
                    "upload failed; continuing with retention"
                );
                false
            }
        };

        let outcome = match self
            .retention
            .enforce(&request.backup_root, &request.project, &request.policy)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(error = %error, "retention pass failed; keeping all archives");
                crate::retention_service::RetentionOutcome::default()
            }
        };

        let notified = if uploaded && request.notify {
            self.send_notice(&request.project, timestamp).await
        } else {
            false
        };

        info!(
            project = %request.project,
            uploaded,
            deleted = outcome.deleted.len(),
            notified,
            "backup run complete"
        );

        Ok(RunReport {
            archive_path,
            uploaded,
            deleted: outcome.deleted,
            retention_failures: outcome.failures,
            notified,
        })
    }

    async fn send_notice(&self, project: &ProjectName, timestamp: NaiveDateTime) -> bool {
        let notice = BackupNotice {
            project: project.as_str().to_owned(),
            date: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            test: NOTICE_SUCCESS_MARKER.to_owned(),
        };

        match self.notifier.notify(notice).await {
            Ok(()) => {
                info!("notification sent");
                true
            }
            Err(error) => {
                warn!(error = %error, "notification delivery failed");
                false
            }
        }
    }
}

/// Full archive path for one run:
/// `<backup_root>/<project>/<YYYY>/<MM>/<DD>/<project>_<stamp>.zip`.
fn plan_archive_path(request: &BackupRequest, timestamp: NaiveDateTime) -> PathBuf {
    request
        .backup_root
        .join(archive_relative_dir(&request.project, timestamp))
        .join(archive_file_name(&request.project, timestamp))
}
