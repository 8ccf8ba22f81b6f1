use std::io::ErrorKind;
use std::path::Path;

use arkiva_application::ArchiveStore;
use arkiva_core::{AppError, AppResult, ProjectName};
use arkiva_domain::{BackupArchive, parse_archive_timestamp, sort_newest_first};
use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

/// Archive store backed directly by the local filesystem.
///
/// No index is persisted: every listing re-walks `root/<project>` and
/// re-parses filenames, so state recovers on its own after a partial
/// run. Files that are not managed archives are skipped silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArchiveStore;

impl FsArchiveStore {
    /// Creates a filesystem archive store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveStore for FsArchiveStore {
    async fn list_archives(
        &self,
        root: &Path,
        project: &ProjectName,
    ) -> AppResult<Vec<BackupArchive>> {
        let project_root = root.join(project.as_str());
        let project = project.clone();

        tokio::task::spawn_blocking(move || scan_archives(&project_root, &project))
            .await
            .map_err(|error| AppError::Internal(format!("inventory scan task failed: {error}")))?
    }

    async fn remove_archive(&self, path: &Path) -> AppResult<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(AppError::Storage(format!(
                "failed to remove archive '{}': {error}",
                path.display()
            ))),
        }
    }
}

fn scan_archives(project_root: &Path, project: &ProjectName) -> AppResult<Vec<BackupArchive>> {
    if !project_root.is_dir() {
        // Nothing stored yet for this project.
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();
    for entry in WalkDir::new(project_root) {
        let entry = entry.map_err(|error| {
            AppError::Storage(format!(
                "failed to walk backup root '{}': {error}",
                project_root.display()
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !file_name.contains(project.as_str()) {
            continue;
        }
        let Some(timestamp) = parse_archive_timestamp(file_name, project) else {
            debug!(file = file_name, "skipping unmanaged file in backup root");
            continue;
        };

        archives.push(BackupArchive::new(
            timestamp,
            entry.into_path(),
            project.clone(),
        ));
    }

    sort_newest_first(&mut archives);
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use arkiva_application::ArchiveStore;
    use arkiva_core::ProjectName;
    use chrono::{NaiveDate, NaiveDateTime};

    use super::FsArchiveStore;

    fn project() -> ProjectName {
        ProjectName::new("website").unwrap_or_else(|_| unreachable!())
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            let created = std::fs::create_dir_all(parent);
            assert!(created.is_ok());
        }
        let written = std::fs::write(path, b"zip");
        assert!(written.is_ok());
    }

    fn stamp(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, 30, 0))
            .unwrap_or_else(|| unreachable!())
    }

    #[tokio::test]
    async fn lists_archives_newest_first_and_skips_unmanaged_files() {
        let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let project_dir = root.path().join("website");
        touch(&project_dir.join("2024/03/07/website_20240307_023000.zip"));
        touch(&project_dir.join("2024/03/08/website_20240308_023000.zip"));
        touch(&project_dir.join("2024/03/08/website_notes.txt"));
        touch(&project_dir.join("2024/03/08/website_garbage.zip"));
        touch(&project_dir.join("2024/03/08/other_20240308_023000.zip"));

        let store = FsArchiveStore::new();
        let archives = store.list_archives(root.path(), &project()).await;
        assert!(archives.is_ok());

        let archives = archives.unwrap_or_default();
        assert_eq!(archives.len(), 2);
        assert_eq!(archives[0].timestamp, stamp(2024, 3, 8, 2));
        assert_eq!(archives[1].timestamp, stamp(2024, 3, 7, 2));
        assert!(archives.iter().all(|archive| {
            archive.path.starts_with(&project_dir) && archive.project == project()
        }));
    }

    #[tokio::test]
    async fn identical_timestamps_are_ordered_by_path() {
        let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let project_dir = root.path().join("website");
        touch(&project_dir.join("b/website_20240308_023000.zip"));
        touch(&project_dir.join("a/website_20240308_023000.zip"));

        let store = FsArchiveStore::new();
        let archives = store
            .list_archives(root.path(), &project())
            .await
            .unwrap_or_default();

        assert_eq!(archives.len(), 2);
        assert!(archives[0].path < archives[1].path);
    }

    #[tokio::test]
    async fn missing_project_directory_yields_empty_inventory() {
        let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());

        let store = FsArchiveStore::new();
        let archives = store.list_archives(root.path(), &project()).await;

        assert!(archives.is_ok());
        assert!(archives.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = root.path().join("website/website_20240308_023000.zip");
        touch(&path);

        let store = FsArchiveStore::new();
        let first = store.remove_archive(&path).await;
        assert!(matches!(first, Ok(true)));
        assert!(!path.exists());

        let second = store.remove_archive(&path).await;
        assert!(matches!(second, Ok(false)));
    }
}
