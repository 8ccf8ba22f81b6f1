//! Application services and ports.

#![forbid(unsafe_code)]

mod backup_ports;
mod backup_service;
mod retention_service;

pub use backup_ports::{
    ArchiveStore, Archiver, BackupNotice, BackupRequest, Notifier, RemoteDestination, Uploader,
};
pub use backup_service::{BackupService, RunReport};
pub use retention_service::{RetentionFailure, RetentionOutcome, RetentionService};
