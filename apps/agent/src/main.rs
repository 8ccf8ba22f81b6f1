//! Arkiva backup agent runtime.
//!
//! One invocation performs one run: archive the project directory,
//! upload the archive via the external sync tool, prune expired
//! archives per the retention policy, and report the outcome.

#![forbid(unsafe_code)]

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arkiva_application::{
    BackupRequest, BackupService, RemoteDestination, RetentionService,
};
use arkiva_core::{AppError, AppResult, ProjectName};
use arkiva_domain::RetentionPolicy;
use arkiva_infrastructure::{
    FsArchiveStore, FsRunLock, RcloneUploader, WebhookNotifier, ZipArchiver,
};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Debug, Deserialize)]
struct AgentConfig {
    project_name: String,
    project_dir: PathBuf,
    backup_root: PathBuf,
    remote_name: String,
    remote_folder: String,
    retention: RetentionPolicy,
    #[serde(default = "default_notify")]
    notify: bool,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default)]
    log_file: Option<PathBuf>,
    #[serde(default = "default_upload_timeout_secs")]
    upload_timeout_secs: u64,
    #[serde(default = "default_rclone_binary")]
    rclone_binary: String,
}

fn default_notify() -> bool {
    true
}

fn default_upload_timeout_secs() -> u64 {
    300
}

fn default_rclone_binary() -> String {
    "rclone".to_owned()
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let config = AgentConfig::load()?;
    init_tracing(config.log_file.as_deref())?;

    let project = ProjectName::new(config.project_name.as_str())?;
    let request = build_request(&config, project)?;

    // Fail fast when another run is active against the same root; the
    // scan-then-delete retention pass must not race a concurrent run.
    let lock = FsRunLock::new(&config.backup_root);
    let _lock_guard = lock.acquire().await?;

    let service = build_backup_service(&config)?;

    info!(
        project = %request.project,
        source = %request.project_dir.display(),
        backup_root = %request.backup_root.display(),
        target_remote = %request.destination.target(),
        "arkiva-agent run started"
    );

    // Only archive creation propagates here; upload, retention, and
    // notification failures are degraded outcomes inside the report.
    let report = service.run(&request).await?;

    for failure in &report.retention_failures {
        warn!(
            path = %failure.path.display(),
            error = %failure.error,
            "expired archive could not be removed"
        );
    }
    if !report.deleted.is_empty() {
        let deleted_archives = report
            .deleted
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!(deleted_archives = %deleted_archives, "deleted backups");
    }
    info!(
        archive = %report.archive_path.display(),
        uploaded = report.uploaded,
        deleted = report.deleted.len(),
        notified = report.notified,
        "arkiva-agent run finished"
    );

    Ok(())
}

impl AgentConfig {
    /// Loads the JSON configuration document.
    ///
    /// Path resolution: first CLI argument, then `ARKIVA_CONFIG`, then
    /// `config.json` in the working directory.
    fn load() -> AppResult<Self> {
        let path = env::args()
            .nth(1)
            .or_else(|| env::var("ARKIVA_CONFIG").ok())
            .unwrap_or_else(|| "config.json".to_owned());

        let raw = std::fs::read_to_string(&path)
            .map_err(|error| AppError::Config(format!("failed to read '{path}': {error}")))?;
        serde_json::from_str(&raw)
            .map_err(|error| AppError::Config(format!("failed to parse '{path}': {error}")))
    }
}

fn build_request(config: &AgentConfig, project: ProjectName) -> AppResult<BackupRequest> {
    let notify = match (config.notify, config.webhook_url.as_ref()) {
        (true, Some(_)) => true,
        (true, None) => {
            warn!("notifications enabled but no webhook_url configured; skipping them");
            false
        }
        (false, _) => false,
    };

    Ok(BackupRequest {
        project,
        project_dir: config.project_dir.clone(),
        backup_root: config.backup_root.clone(),
        destination: RemoteDestination::new(
            config.remote_name.clone(),
            config.remote_folder.clone(),
        ),
        policy: config.retention,
        notify,
    })
}

fn build_backup_service(config: &AgentConfig) -> AppResult<BackupService> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let archiver = Arc::new(ZipArchiver::new());
    let uploader = Arc::new(RcloneUploader::new(
        config.rclone_binary.clone(),
        Duration::from_secs(config.upload_timeout_secs),
        2,
    ));
    let notifier = Arc::new(WebhookNotifier::new(
        http_client,
        config.webhook_url.clone().unwrap_or_default(),
        2,
        500,
    ));
    let retention = RetentionService::new(Arc::new(FsArchiveStore::new()));

    Ok(BackupService::new(archiver, uploader, notifier, retention))
}

fn init_tracing(log_file: Option<&Path>) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| {
                    AppError::Config(format!(
                        "failed to open log file '{}': {error}",
                        path.display()
                    ))
                })?;
            builder
                .with_ansi(false)
                .with_writer(std::io::stdout.and(Arc::new(file)))
                .init();
        }
        None => builder.init(),
    }

    Ok(())
}
