use std::path::{Path, PathBuf};
use std::sync::Arc;

use arkiva_core::{AppResult, ProjectName};
use arkiva_domain::{RetentionPlan, RetentionPolicy};
use tracing::{debug, info, warn};

use crate::backup_ports::ArchiveStore;

/// One archive the enforcement pass failed to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionFailure {
    /// Path of the archive that could not be removed.
    pub path: PathBuf,
    /// Human-readable removal error.
    pub error: String,
}

/// Result of one retention enforcement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionOutcome {
    /// Paths actually removed from storage, newest-first.
    pub deleted: Vec<PathBuf>,
    /// Per-archive removal failures; the pass continues past them.
    pub failures: Vec<RetentionFailure>,
}

/// Application service enforcing the retention policy against storage.
#[derive(Clone)]
pub struct RetentionService {
    store: Arc<dyn ArchiveStore>,
}

impl RetentionService {
    /// Creates a retention service from a store implementation.
    #[must_use]
    pub fn new(store: Arc<dyn ArchiveStore>) -> Self {
        Self { store }
    }

    /// Scans the inventory, evaluates the retention plan, and removes
    /// every deletion candidate.
    ///
    /// Removal is idempotent: a candidate already gone from storage is
    /// skipped silently and not reported as deleted. A removal error
    /// for one archive is recorded and does not abort the pass.
    pub async fn enforce(
        &self,
        root: &Path,
        project: &ProjectName,
        policy: &RetentionPolicy,
    ) -> AppResult<RetentionOutcome> {
        let archives = self.store.list_archives(root, project).await?;
        let plan = RetentionPlan::evaluate(&archives, policy);

        let mut outcome = RetentionOutcome::default();
        for candidate in plan.delete {
            match self.store.remove_archive(&candidate.path).await {
                Ok(true) => {
                    info!(path = %candidate.path.display(), "expired archive removed");
                    outcome.deleted.push(candidate.path);
                }
                Ok(false) => {
                    debug!(
                        path = %candidate.path.display(),
                        "retention candidate already removed"
                    );
                }
                Err(error) => {
                    warn!(
                        path = %candidate.path.display(),
                        error = %error,
                        "failed to remove expired archive"
                    );
                    outcome.failures.push(RetentionFailure {
                        path: candidate.path,
                        error: error.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use arkiva_core::{AppError, AppResult, ProjectName};
    use arkiva_domain::{BackupArchive, RetentionPolicy, sort_newest_first};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::Mutex;

    use crate::backup_ports::ArchiveStore;

    use super::RetentionService;

    struct FakeArchiveStore {
        entries: Mutex<Vec<BackupArchive>>,
        missing: HashSet<PathBuf>,
        failing: HashSet<PathBuf>,
    }

    impl FakeArchiveStore {
        fn new(entries: Vec<BackupArchive>) -> Self {
            Self {
                entries: Mutex::new(entries),
                missing: HashSet::new(),
                failing: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl ArchiveStore for FakeArchiveStore {
        async fn list_archives(
            &self,
            _root: &Path,
            _project: &ProjectName,
        ) -> AppResult<Vec<BackupArchive>> {
            let mut entries = self.entries.lock().await.clone();
            sort_newest_first(&mut entries);
            Ok(entries)
        }

        async fn remove_archive(&self, path: &Path) -> AppResult<bool> {
            if self.failing.contains(path) {
                return Err(AppError::Storage(format!(
                    "permission denied removing '{}'",
                    path.display()
                )));
            }
            if self.missing.contains(path) {
                return Ok(false);
            }

            let mut entries = self.entries.lock().await;
            let before = entries.len();
            entries.retain(|entry| entry.path != path);
            Ok(entries.len() < before)
        }
    }

    fn archive(y: i32, m: u32, d: u32) -> BackupArchive {
        let timestamp = NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(2, 30, 0))
            .unwrap_or_else(|| unreachable!());
        let project = ProjectName::new("website").unwrap_or_else(|_| unreachable!());
        let path = format!("/backups/website/website_{y:04}{m:02}{d:02}_023000.zip");
        BackupArchive::new(timestamp, path, project)
    }

    fn project() -> ProjectName {
        ProjectName::new("website").unwrap_or_else(|_| unreachable!())
    }

    fn week_of_archives() -> Vec<BackupArchive> {
        // 2024-03-04 (Monday) through 2024-03-08, newest first.
        vec![
            archive(2024, 3, 8),
            archive(2024, 3, 7),
            archive(2024, 3, 6),
            archive(2024, 3, 5),
            archive(2024, 3, 4),
        ]
    }

    fn policy(daily: usize) -> RetentionPolicy {
        RetentionPolicy {
            daily,
            weekly: 0,
            monthly: 0,
        }
    }

    #[tokio::test]
    async fn enforce_removes_excess_and_reports_paths() {
        let store = Arc::new(FakeArchiveStore::new(week_of_archives()));
        let service = RetentionService::new(store.clone());

        let outcome = service
            .enforce(Path::new("/backups"), &project(), &policy(2))
            .await;
        assert!(outcome.is_ok());

        let outcome = outcome.unwrap_or_default();
        // Every removed path is surfaced for the run log, newest-first.
        assert_eq!(
            outcome.deleted,
            vec![
                archive(2024, 3, 6).path,
                archive(2024, 3, 5).path,
                archive(2024, 3, 4).path,
            ]
        );
        assert!(outcome.failures.is_empty());
        assert_eq!(store.entries.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn enforce_is_idempotent_across_runs() {
        let store = Arc::new(FakeArchiveStore::new(week_of_archives()));
        let service = RetentionService::new(store);

        let first = service
            .enforce(Path::new("/backups"), &project(), &policy(2))
            .await
            .unwrap_or_default();
        assert_eq!(first.deleted.len(), 3);

        let second = service
            .enforce(Path::new("/backups"), &project(), &policy(2))
            .await
            .unwrap_or_default();
        assert!(second.deleted.is_empty());
        assert!(second.failures.is_empty());
    }

    #[tokio::test]
    async fn enforce_skips_candidate_already_removed_externally() {
        let mut store = FakeArchiveStore::new(week_of_archives());
        store.missing.insert(archive(2024, 3, 4).path);
        let service = RetentionService::new(Arc::new(store));

        let outcome = service
            .enforce(Path::new("/backups"), &project(), &policy(2))
            .await
            .unwrap_or_default();

        // The raced-away candidate is neither deleted nor a failure.
        assert_eq!(outcome.deleted.len(), 2);
        assert!(outcome.failures.is_empty());
        assert!(!outcome.deleted.contains(&archive(2024, 3, 4).path));
    }

    #[tokio::test]
    async fn enforce_continues_past_individual_removal_failures() {
        let mut store = FakeArchiveStore::new(week_of_archives());
        store.failing.insert(archive(2024, 3, 6).path);
        let service = RetentionService::new(Arc::new(store));

        let outcome = service
            .enforce(Path::new("/backups"), &project(), &policy(2))
            .await
            .unwrap_or_default();

        assert_eq!(outcome.deleted.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, archive(2024, 3, 6).path);
    }

    #[tokio::test]
    async fn enforce_on_empty_inventory_is_a_no_op() {
        let store = Arc::new(FakeArchiveStore::new(Vec::new()));
        let service = RetentionService::new(store);

        let outcome = service
            .enforce(Path::new("/backups"), &project(), &policy(3))
            .await;

        assert!(outcome.is_ok());
        let outcome = outcome.unwrap_or_default();
        assert!(outcome.deleted.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
