//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod fs_archive_store;
mod fs_run_lock;
mod rclone_uploader;
mod webhook_notifier;
mod zip_archiver;

pub use fs_archive_store::FsArchiveStore;
pub use fs_run_lock::{FsRunLock, RunLockGuard};
pub use rclone_uploader::RcloneUploader;
pub use webhook_notifier::WebhookNotifier;
pub use zip_archiver::ZipArchiver;
