use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use arkiva_core::ProjectName;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp pattern embedded in every archive filename.
///
/// Fixed-width and lexicographically sortable, so filename sort order
/// equals chronological order. This constant is the single source of
/// truth for both naming and inventory parsing; the two must never
/// drift apart.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// File extension of every managed archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// A materialized backup artifact discovered on the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupArchive {
    /// Point in time the backup was taken, parsed from the filename.
    pub timestamp: NaiveDateTime,
    /// Absolute location of the archive file on the storage backend.
    pub path: PathBuf,
    /// Project this archive belongs to.
    pub project: ProjectName,
}

impl BackupArchive {
    /// Creates an archive entry.
    #[must_use]
    pub fn new(timestamp: NaiveDateTime, path: impl Into<PathBuf>, project: ProjectName) -> Self {
        Self {
            timestamp,
            path: path.into(),
            project,
        }
    }
}

/// Returns the canonical archive filename for one backup run:
/// `<project>_<YYYYMMDD_HHMMSS>.zip`.
#[must_use]
pub fn archive_file_name(project: &ProjectName, timestamp: NaiveDateTime) -> String {
    format!(
        "{}_{}.{ARCHIVE_EXTENSION}",
        project.as_str(),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Returns the storage sub-path for one backup run, partitioned by
/// year, month, and day: `<project>/<YYYY>/<MM>/<DD>`.
#[must_use]
pub fn archive_relative_dir(project: &ProjectName, timestamp: NaiveDateTime) -> PathBuf {
    Path::new(project.as_str())
        .join(timestamp.format("%Y").to_string())
        .join(timestamp.format("%m").to_string())
        .join(timestamp.format("%d").to_string())
}

/// Parses the timestamp embedded in an archive filename.
///
/// Exact inverse of [`archive_file_name`]: the name must carry the
/// `<project>_` prefix, the `.zip` suffix, and a strictly valid
/// timestamp in between. Returns `None` on any mismatch so inventory
/// scans can skip unmanaged files without failing.
#[must_use]
pub fn parse_archive_timestamp(file_name: &str, project: &ProjectName) -> Option<NaiveDateTime> {
    let rest = file_name.strip_prefix(project.as_str())?;
    let rest = rest.strip_prefix('_')?;
    let stamp = rest.strip_suffix(&format!(".{ARCHIVE_EXTENSION}"))?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// Sorts archives newest-first; identical timestamps are ordered by
/// path ascending for determinism.
pub fn sort_newest_first(archives: &mut [BackupArchive]) {
    archives.sort_by(|a, b| match b.timestamp.cmp(&a.timestamp) {
        Ordering::Equal => a.path.cmp(&b.path),
        ordering => ordering,
    });
}
