//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod archive;
mod retention;

pub use archive::{
    ARCHIVE_EXTENSION, BackupArchive, TIMESTAMP_FORMAT, archive_file_name, archive_relative_dir,
    parse_archive_timestamp, sort_newest_first,
};
pub use retention::{RetentionPlan, RetentionPolicy, RetentionTiers};
