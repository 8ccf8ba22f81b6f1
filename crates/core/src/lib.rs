//! Shared primitives for all Rust crates in Arkiva.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Arkiva crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated project identifier.
///
/// Project names are embedded verbatim in archive filenames and storage
/// paths, so they must be non-empty and free of path separators and
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectName(String);

impl ProjectName {
    /// Creates a validated project name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "project name must not be empty or whitespace".to_owned(),
            ));
        }

        if value.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace()) {
            return Err(AppError::Validation(format!(
                "project name '{value}' must not contain path separators or whitespace"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

impl Display for ProjectName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration document missing, unreadable, or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Archive creation failed; the run cannot proceed.
    #[error("archive error: {0}")]
    Archive(String),

    /// Remote transfer failed.
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Notification delivery failed.
    #[error("notification error: {0}")]
    Notify(String),

    /// Local storage scan or removal failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::ProjectName;

    #[test]
    fn project_name_rejects_whitespace() {
        let result = ProjectName::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn project_name_rejects_path_separators() {
        assert!(ProjectName::new("my/project").is_err());
        assert!(ProjectName::new("my\\project").is_err());
        assert!(ProjectName::new("my project").is_err());
    }

    #[test]
    fn project_name_accepts_plain_identifier() {
        let name = ProjectName::new("website_v2");
        assert!(name.is_ok());
        assert_eq!(
            name.unwrap_or_else(|_| unreachable!()).as_str(),
            "website_v2"
        );
    }
}
