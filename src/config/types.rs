//! Configuration types for project-access
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::access_control::types::{GroupId, ProjectId, RawAccessType, RoleId, SubjectId, UserId};
use crate::error::ConfigError;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Batch resolver settings
    pub resolver: ResolverConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Projects, subjects, roles and overrides loaded into the in-memory store
    pub directory: DirectoryConfig,
}

/// Batch resolver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Issue the override and subject existence queries concurrently
    pub concurrent_loads: bool,

    /// Delete inconsistent override rows found while resolving
    pub heal_inconsistencies: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            concurrent_loads: true,
            heal_inconsistencies: false,
        }
    }
}

/// Directory of access data
///
/// Rows are loaded as-is. Rules that break the `SPECIFIC_ROLE` invariant are
/// accepted here so that legacy data can be inspected and healed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub roles: Vec<RoleEntry>,
    pub users: Vec<UserEntry>,
    pub groups: Vec<GroupEntry>,
    pub projects: Vec<ProjectEntry>,
    pub overrides: Vec<OverrideEntry>,
}

/// A named role
#[derive(Debug, Clone, Deserialize)]
pub struct RoleEntry {
    pub id: RoleId,
    pub name: String,
}

/// A user and their optional global role
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub id: UserId,
    #[serde(default)]
    pub global_role_id: Option<RoleId>,
}

/// A group and its members
#[derive(Debug, Clone, Deserialize)]
pub struct GroupEntry {
    pub id: GroupId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<UserId>,
}

/// A project and its default rule
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEntry {
    pub id: ProjectId,
    #[serde(default)]
    pub name: Option<String>,
    pub default_access_type: RawAccessType,
    #[serde(default)]
    pub default_role_id: Option<RoleId>,
}

/// An override row; exactly one of `user` and `group` must be set
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideEntry {
    pub project: ProjectId,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub group: Option<GroupId>,
    pub access_type: RawAccessType,
    #[serde(default)]
    pub role_id: Option<RoleId>,
}

impl OverrideEntry {
    pub fn subject(&self) -> Result<SubjectId, ConfigError> {
        match (&self.user, self.group) {
            (Some(user), None) => Ok(SubjectId::User(user.clone())),
            (None, Some(group)) => Ok(SubjectId::Group(group)),
            (Some(_), Some(_)) => Err(ConfigError::Invalid {
                message: format!(
                    "override on project {} sets both user and group",
                    self.project
                ),
            }),
            (None, None) => Err(ConfigError::Invalid {
                message: format!(
                    "override on project {} sets neither user nor group",
                    self.project
                ),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
