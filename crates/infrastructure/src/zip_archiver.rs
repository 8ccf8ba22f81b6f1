use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use arkiva_application::Archiver;
use arkiva_core::{AppError, AppResult};
use async_trait::async_trait;
use tracing::info;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Archiver producing a deflate-compressed zip of a directory tree.
///
/// The archive is written under a `.partial` name and renamed into
/// place on success, so an inventory scan never sees a torn archive
/// under the managed `.zip` name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    /// Creates a zip archiver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn create_archive(&self, source_dir: &Path, destination: &Path) -> AppResult<()> {
        let source_dir = source_dir.to_path_buf();
        let destination = destination.to_path_buf();

        tokio::task::spawn_blocking(move || write_archive(&source_dir, &destination))
            .await
            .map_err(|error| AppError::Internal(format!("archive task failed: {error}")))?
    }
}

fn write_archive(source_dir: &Path, destination: &Path) -> AppResult<()> {
    if !source_dir.is_dir() {
        return Err(AppError::Archive(format!(
            "source directory '{}' does not exist",
            source_dir.display()
        )));
    }

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|error| {
            AppError::Archive(format!(
                "failed to create archive directory '{}': {error}",
                parent.display()
            ))
        })?;
    }

    let partial = partial_path(destination);
    let result = write_entries(source_dir, &partial);
    if result.is_err() {
        // Leave no stray temp file behind; the rename never happened.
        let _ = std::fs::remove_file(&partial);
        return result;
    }

    std::fs::rename(&partial, destination).map_err(|error| {
        AppError::Archive(format!(
            "failed to move archive into place at '{}': {error}",
            destination.display()
        ))
    })?;

    info!(archive = %destination.display(), "archive created");
    Ok(())
}

fn write_entries(source_dir: &Path, partial: &Path) -> AppResult<()> {
    let file = File::create(partial).map_err(|error| {
        AppError::Archive(format!(
            "failed to create archive file '{}': {error}",
            partial.display()
        ))
    })?;
    let mut writer = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut buffer = Vec::new();
    for entry in WalkDir::new(source_dir) {
        let entry = entry.map_err(|error| {
            AppError::Archive(format!(
                "failed to walk source '{}': {error}",
                source_dir.display()
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(source_dir).map_err(|error| {
            AppError::Internal(format!(
                "walked path '{}' escapes the source root: {error}",
                entry.path().display()
            ))
        })?;
        let entry_name = relative.to_string_lossy().replace('\\', "/");

        writer.start_file(entry_name, options).map_err(|error| {
            AppError::Archive(format!(
                "failed to add '{}' to archive: {error}",
                relative.display()
            ))
        })?;

        let mut source = File::open(entry.path()).map_err(|error| {
            AppError::Archive(format!(
                "failed to read source file '{}': {error}",
                entry.path().display()
            ))
        })?;
        buffer.clear();
        source.read_to_end(&mut buffer).map_err(|error| {
            AppError::Archive(format!(
                "failed to read source file '{}': {error}",
                entry.path().display()
            ))
        })?;
        writer.write_all(&buffer).map_err(|error| {
            AppError::Archive(format!(
                "failed to write '{}' into archive: {error}",
                relative.display()
            ))
        })?;
    }

    writer.finish().map_err(|error| {
        AppError::Archive(format!(
            "failed to finalize archive '{}': {error}",
            partial.display()
        ))
    })?;
    Ok(())
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().map_or_else(
        || std::ffi::OsString::from("archive"),
        std::ffi::OsStr::to_os_string,
    );
    name.push(".partial");
    destination.with_file_name(name)
}
