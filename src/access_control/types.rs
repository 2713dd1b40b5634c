//! Access control types
//!
//! Core types shared by the rule model, the resolver and the batch resolver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque user identifier
pub type UserId = String;

/// Group identifier
pub type GroupId = i64;

/// Project identifier
pub type ProjectId = i64;

/// Role identifier
pub type RoleId = i64;

/// A principal that can be granted access to a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectId {
    User(UserId),
    Group(GroupId),
}

impl SubjectId {
    pub fn user(id: impl Into<UserId>) -> Self {
        SubjectId::User(id.into())
    }

    pub fn group(id: GroupId) -> Self {
        SubjectId::Group(id)
    }

    pub fn is_group(&self) -> bool {
        matches!(self, SubjectId::Group(_))
    }

    /// The user id, if this subject is a user
    pub fn as_user(&self) -> Option<&str> {
        match self {
            SubjectId::User(id) => Some(id),
            SubjectId::Group(_) => None,
        }
    }

    /// Get the subject kind as a string
    pub const fn kind(&self) -> &'static str {
        match self {
            SubjectId::User(_) => "user",
            SubjectId::Group(_) => "group",
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::User(id) => write!(f, "user:{}", id),
            SubjectId::Group(id) => write!(f, "group:{}", id),
        }
    }
}

impl FromStr for SubjectId {
    type Err = String;

    /// Parse `user:<id>` or `group:<id>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("user", id)) if !id.is_empty() => Ok(SubjectId::User(id.to_string())),
            Some(("group", id)) => id
                .parse()
                .map(SubjectId::Group)
                .map_err(|_| format!("invalid group id '{}'", id)),
            _ => Err(format!(
                "expected 'user:<id>' or 'group:<id>', got '{}'",
                s
            )),
        }
    }
}

/// Access type as stored on override rows and project defaults
///
/// This is the unvalidated wire form. `PROJECT_DEFAULT` is only meaningful on
/// overrides; use [`crate::access_control::AccessRule`] for validated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawAccessType {
    ProjectDefault,
    NoAccess,
    GlobalRole,
    SpecificRole,
}

impl RawAccessType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RawAccessType::ProjectDefault => "PROJECT_DEFAULT",
            RawAccessType::NoAccess => "NO_ACCESS",
            RawAccessType::GlobalRole => "GLOBAL_ROLE",
            RawAccessType::SpecificRole => "SPECIFIC_ROLE",
        }
    }

    /// Try to parse an access type from its stored string
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "PROJECT_DEFAULT" => Some(RawAccessType::ProjectDefault),
            "NO_ACCESS" => Some(RawAccessType::NoAccess),
            "GLOBAL_ROLE" => Some(RawAccessType::GlobalRole),
            "SPECIFIC_ROLE" => Some(RawAccessType::SpecificRole),
            _ => None,
        }
    }

    pub fn all() -> &'static [RawAccessType] {
        &[
            RawAccessType::ProjectDefault,
            RawAccessType::NoAccess,
            RawAccessType::GlobalRole,
            RawAccessType::SpecificRole,
        ]
    }
}

impl fmt::Display for RawAccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved access type (never `PROJECT_DEFAULT`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    NoAccess,
    GlobalRole,
    SpecificRole,
}

impl AccessType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessType::NoAccess => "NO_ACCESS",
            AccessType::GlobalRole => "GLOBAL_ROLE",
            AccessType::SpecificRole => "SPECIFIC_ROLE",
        }
    }

    /// Check if this access type grants any access at all
    pub const fn grants_access(&self) -> bool {
        !matches!(self, AccessType::NoAccess)
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which layer produced an effective access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessSource {
    /// Project-wide default rule
    Default,
    /// Per-user or per-group override
    Override,
}

impl AccessSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessSource::Default => "DEFAULT",
            AccessSource::Override => "OVERRIDE",
        }
    }
}

impl fmt::Display for AccessSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role carried by an effective access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "role_id", rename_all = "snake_case")]
pub enum EffectiveRole {
    /// No role (no access, or a user without a global role)
    None,
    /// A single concrete role
    Role(RoleId),
    /// Group under `GLOBAL_ROLE`: each member uses their own global role
    PerMember,
}

impl EffectiveRole {
    pub fn from_option(role_id: Option<RoleId>) -> Self {
        role_id.map_or(EffectiveRole::None, EffectiveRole::Role)
    }

    pub fn role_id(&self) -> Option<RoleId> {
        match self {
            EffectiveRole::Role(id) => Some(*id),
            EffectiveRole::None | EffectiveRole::PerMember => None,
        }
    }
}

/// Effective access of one subject on one project
///
/// Derived on every read and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectiveAccess {
    pub source: AccessSource,
    pub access_type: AccessType,
    pub role: EffectiveRole,
}

impl EffectiveAccess {
    pub const fn new(source: AccessSource, access_type: AccessType, role: EffectiveRole) -> Self {
        Self {
            source,
            access_type,
            role,
        }
    }

    /// The decision used for missing projects and missing subjects
    pub const fn no_access_default() -> Self {
        Self::new(
            AccessSource::Default,
            AccessType::NoAccess,
            EffectiveRole::None,
        )
    }

    pub fn effective_role_id(&self) -> Option<RoleId> {
        self.role.role_id()
    }

    /// Check if resolution must continue per group member
    pub fn requires_member_expansion(&self) -> bool {
        matches!(self.role, EffectiveRole::PerMember)
    }
}
