//! Error types for project-access
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API;
//! the binary wraps them in `anyhow` at the top level.

use crate::access_control::types::{ProjectId, SubjectId};
use std::fmt;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid access rule: {0}")]
    InvalidRule(#[from] InvalidAccessRule),

    #[error(transparent)]
    Resolution(#[from] ResolutionUnavailable),

    #[error("Edit rejected: {0}")]
    Edit(#[from] EditError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Construction-time violation of the access rule invariants
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidAccessRule {
    #[error("SPECIFIC_ROLE requires a role id")]
    MissingRoleId,

    #[error("a project default cannot be PROJECT_DEFAULT")]
    DefaultCannotDefer,
}

/// The stored record that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InconsistentRecord {
    /// An override row keyed by (subject, project)
    Override(SubjectId),
    /// The project's default rule
    ProjectDefault,
}

impl fmt::Display for InconsistentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InconsistentRecord::Override(subject) => write!(f, "override for {}", subject),
            InconsistentRecord::ProjectDefault => f.write_str("project default"),
        }
    }
}

/// A stored rule already violates the invariants
///
/// Never returned as an `Err`: resolution degrades to project-default semantics
/// and hands this diagnostic back so callers can clean up the record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Data inconsistency in {record} on project {project_id}: {reason}")]
pub struct DataInconsistency {
    pub project_id: ProjectId,
    pub record: InconsistentRecord,
    pub reason: InvalidAccessRule,
}

impl DataInconsistency {
    pub fn in_override(project_id: ProjectId, subject: SubjectId, reason: InvalidAccessRule) -> Self {
        Self {
            project_id,
            record: InconsistentRecord::Override(subject),
            reason,
        }
    }

    pub fn in_default(project_id: ProjectId, reason: InvalidAccessRule) -> Self {
        Self {
            project_id,
            record: InconsistentRecord::ProjectDefault,
            reason,
        }
    }

    /// The subject whose override row is bad, if any
    pub fn subject(&self) -> Option<&SubjectId> {
        match &self.record {
            InconsistentRecord::Override(subject) => Some(subject),
            InconsistentRecord::ProjectDefault => None,
        }
    }
}

/// Persistence layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// The batch queries behind a resolution failed
#[derive(Error, Debug)]
#[error("Unable to load effective access for project {project_id}: {source}")]
pub struct ResolutionUnavailable {
    pub project_id: ProjectId,
    #[source]
    pub source: StoreError,
}

impl ResolutionUnavailable {
    pub fn new(project_id: ProjectId, source: StoreError) -> Self {
        Self { project_id, source }
    }
}

/// Admin edit errors
#[derive(Error, Debug)]
pub enum EditError {
    #[error("invalid rule for {subject}: {source}")]
    InvalidRule {
        subject: SubjectId,
        #[source]
        source: InvalidAccessRule,
    },

    #[error("invalid default for project {project_id}: {source}")]
    InvalidDefault {
        project_id: ProjectId,
        #[source]
        source: InvalidAccessRule,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_inconsistency_display() {
        let diag = DataInconsistency::in_override(
            7,
            SubjectId::user("alice"),
            InvalidAccessRule::MissingRoleId,
        );
        assert_eq!(
            diag.to_string(),
            "Data inconsistency in override for user:alice on project 7: SPECIFIC_ROLE requires a role id"
        );
        assert_eq!(diag.subject(), Some(&SubjectId::user("alice")));

        let diag = DataInconsistency::in_default(7, InvalidAccessRule::DefaultCannotDefer);
        assert!(diag.to_string().contains("project default"));
        assert_eq!(diag.subject(), None);
    }

    #[test]
    fn test_resolution_unavailable_message() {
        let err = ResolutionUnavailable::new(3, StoreError::Unavailable("connection reset".into()));
        assert!(err.to_string().starts_with("Unable to load effective access"));
        assert!(err.to_string().contains("connection reset"));

        let app: AppError = err.into();
        assert!(matches!(app, AppError::Resolution(_)));
    }

    #[test]
    fn test_edit_error_names_subject() {
        let err = EditError::InvalidRule {
            subject: SubjectId::group(2),
            source: InvalidAccessRule::MissingRoleId,
        };
        assert!(err.to_string().contains("group:2"));
    }
}
