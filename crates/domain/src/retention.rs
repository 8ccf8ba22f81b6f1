use std::collections::HashSet;
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::archive::BackupArchive;

/// Grandfather-father-son keep-counts, one per retention tier.
///
/// A value of 0 keeps nothing in that tier; the archive may still be
/// retained by another tier it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Most-recent archives to always keep, regardless of calendar
    /// alignment.
    pub daily: usize,
    /// Most-recent Sunday-dated archives to keep.
    pub weekly: usize,
    /// Most-recent first-of-month archives to keep.
    pub monthly: usize,
}

/// Inventory partitioned into retention tiers.
///
/// Each tier preserves the inventory's newest-first order. Membership
/// is calendar-derived rather than computed from gaps between backups,
/// so missed runs never shift which archives anchor a tier. One archive
/// can belong to all three tiers at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionTiers {
    /// Every archive is a daily candidate.
    pub daily: Vec<BackupArchive>,
    /// Archives taken on the weekly anchor day (Sunday).
    pub weekly: Vec<BackupArchive>,
    /// Archives taken on the first day of a month.
    pub monthly: Vec<BackupArchive>,
}

impl RetentionTiers {
    /// Partitions a newest-first inventory into tiers.
    #[must_use]
    pub fn classify(archives: &[BackupArchive]) -> Self {
        let mut daily = Vec::with_capacity(archives.len());
        let mut weekly = Vec::new();
        let mut monthly = Vec::new();

        for archive in archives {
            if is_weekly_anchor(archive.timestamp) {
                weekly.push(archive.clone());
            }
            if is_monthly_anchor(archive.timestamp) {
                monthly.push(archive.clone());
            }
            daily.push(archive.clone());
        }

        Self {
            daily,
            weekly,
            monthly,
        }
    }
}

/// Keep/delete decision for one inventory under one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Archives retained by at least one tier, newest-first.
    pub keep: Vec<BackupArchive>,
    /// Archives to delete, newest-first.
    pub delete: Vec<BackupArchive>,
}

impl RetentionPlan {
    /// Evaluates the retention rule over a newest-first inventory.
    ///
    /// An archive is deleted only when it sits past the keep-count of
    /// every tier it belongs to; surviving any one tier's cutoff is
    /// enough to be kept. Since the daily tier contains all archives,
    /// the `daily` keep-count is a floor on the number of survivors.
    #[must_use]
    pub fn evaluate(archives: &[BackupArchive], policy: &RetentionPolicy) -> Self {
        let tiers = RetentionTiers::classify(archives);

        let mut kept_paths: HashSet<&Path> = HashSet::new();
        for archive in tiers.daily.iter().take(policy.daily) {
            kept_paths.insert(archive.path.as_path());
        }
        for archive in tiers.weekly.iter().take(policy.weekly) {
            kept_paths.insert(archive.path.as_path());
        }
        for archive in tiers.monthly.iter().take(policy.monthly) {
            kept_paths.insert(archive.path.as_path());
        }

        let (keep, delete): (Vec<_>, Vec<_>) = archives
            .iter()
            .cloned()
            .partition(|archive| kept_paths.contains(archive.path.as_path()));

        Self { keep, delete }
    }
}

fn is_weekly_anchor(timestamp: NaiveDateTime) -> bool {
    timestamp.weekday() == Weekday::Sun
}

fn is_monthly_anchor(timestamp: NaiveDateTime) -> bool {
    timestamp.day() == 1
}
