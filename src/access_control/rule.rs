//! Access rule model
//!
//! Validated rule values plus the raw records they are built from. The raw
//! records mirror what persistence hands back and may violate the invariants
//! (legacy or corrupted rows); the validated types cannot.

use crate::access_control::types::{AccessType, ProjectId, RawAccessType, RoleId, SubjectId};
use crate::error::InvalidAccessRule;
use serde::{Deserialize, Serialize};

/// Override rule for one subject on one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRule {
    /// Defer to the project's default rule
    ProjectDefault,
    NoAccess,
    GlobalRole,
    SpecificRole { role_id: RoleId },
}

impl AccessRule {
    /// Build a rule from a stored `(access_type, role_id)` pair
    ///
    /// `role_id` is dropped for every type except `SPECIFIC_ROLE`, which
    /// requires it.
    pub fn from_raw(
        access_type: RawAccessType,
        role_id: Option<RoleId>,
    ) -> Result<Self, InvalidAccessRule> {
        match (access_type, role_id) {
            (RawAccessType::ProjectDefault, _) => Ok(AccessRule::ProjectDefault),
            (RawAccessType::NoAccess, _) => Ok(AccessRule::NoAccess),
            (RawAccessType::GlobalRole, _) => Ok(AccessRule::GlobalRole),
            (RawAccessType::SpecificRole, Some(role_id)) => Ok(AccessRule::SpecificRole { role_id }),
            (RawAccessType::SpecificRole, None) => Err(InvalidAccessRule::MissingRoleId),
        }
    }

    pub const fn raw_type(&self) -> RawAccessType {
        match self {
            AccessRule::ProjectDefault => RawAccessType::ProjectDefault,
            AccessRule::NoAccess => RawAccessType::NoAccess,
            AccessRule::GlobalRole => RawAccessType::GlobalRole,
            AccessRule::SpecificRole { .. } => RawAccessType::SpecificRole,
        }
    }

    pub const fn role_id(&self) -> Option<RoleId> {
        match self {
            AccessRule::SpecificRole { role_id } => Some(*role_id),
            _ => None,
        }
    }

    pub const fn is_project_default(&self) -> bool {
        matches!(self, AccessRule::ProjectDefault)
    }

    /// The concrete rule this override imposes, or `None` if it defers
    pub const fn as_concrete(&self) -> Option<DefaultRule> {
        match self {
            AccessRule::ProjectDefault => None,
            AccessRule::NoAccess => Some(DefaultRule::NoAccess),
            AccessRule::GlobalRole => Some(DefaultRule::GlobalRole),
            AccessRule::SpecificRole { role_id } => Some(DefaultRule::SpecificRole {
                role_id: *role_id,
            }),
        }
    }
}

/// A project's default rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultRule {
    NoAccess,
    GlobalRole,
    SpecificRole { role_id: RoleId },
}

impl DefaultRule {
    pub fn from_raw(
        access_type: RawAccessType,
        role_id: Option<RoleId>,
    ) -> Result<Self, InvalidAccessRule> {
        AccessRule::from_raw(access_type, role_id)?
            .as_concrete()
            .ok_or(InvalidAccessRule::DefaultCannotDefer)
    }

    pub const fn access_type(&self) -> AccessType {
        match self {
            DefaultRule::NoAccess => AccessType::NoAccess,
            DefaultRule::GlobalRole => AccessType::GlobalRole,
            DefaultRule::SpecificRole { .. } => AccessType::SpecificRole,
        }
    }

    pub const fn raw_type(&self) -> RawAccessType {
        match self {
            DefaultRule::NoAccess => RawAccessType::NoAccess,
            DefaultRule::GlobalRole => RawAccessType::GlobalRole,
            DefaultRule::SpecificRole { .. } => RawAccessType::SpecificRole,
        }
    }

    pub const fn role_id(&self) -> Option<RoleId> {
        match self {
            DefaultRule::SpecificRole { role_id } => Some(*role_id),
            _ => None,
        }
    }
}

/// Override row as stored, not yet validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOverride {
    pub subject: SubjectId,
    pub project_id: ProjectId,
    pub access_type: RawAccessType,
    pub role_id: Option<RoleId>,
}

impl StoredOverride {
    pub fn new(subject: SubjectId, project_id: ProjectId, rule: AccessRule) -> Self {
        Self {
            subject,
            project_id,
            access_type: rule.raw_type(),
            role_id: rule.role_id(),
        }
    }

    pub fn rule(&self) -> Result<AccessRule, InvalidAccessRule> {
        AccessRule::from_raw(self.access_type, self.role_id)
    }
}

/// Project default as stored, not yet validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDefault {
    pub project_id: ProjectId,
    pub access_type: RawAccessType,
    pub role_id: Option<RoleId>,
}

impl StoredDefault {
    pub fn new(project_id: ProjectId, rule: DefaultRule) -> Self {
        Self {
            project_id,
            access_type: rule.raw_type(),
            role_id: rule.role_id(),
        }
    }

    pub fn rule(&self) -> Result<DefaultRule, InvalidAccessRule> {
        DefaultRule::from_raw(self.access_type, self.role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_role_requires_role_id() {
        assert_eq!(
            AccessRule::from_raw(RawAccessType::SpecificRole, None),
            Err(InvalidAccessRule::MissingRoleId)
        );
        assert_eq!(
            AccessRule::from_raw(RawAccessType::SpecificRole, Some(4)),
            Ok(AccessRule::SpecificRole { role_id: 4 })
        );
    }

    #[test]
    fn test_role_id_normalized_away() {
        let rule = AccessRule::from_raw(RawAccessType::NoAccess, Some(9)).unwrap();
        assert_eq!(rule, AccessRule::NoAccess);
        assert_eq!(rule.role_id(), None);

        let rule = AccessRule::from_raw(RawAccessType::GlobalRole, Some(9)).unwrap();
        assert_eq!(rule.role_id(), None);

        let rule = AccessRule::from_raw(RawAccessType::ProjectDefault, Some(9)).unwrap();
        assert!(rule.is_project_default());
        assert_eq!(rule.as_concrete(), None);
    }

    #[test]
    fn test_default_rule_cannot_defer() {
        assert_eq!(
            DefaultRule::from_raw(RawAccessType::ProjectDefault, None),
            Err(InvalidAccessRule::DefaultCannotDefer)
        );
        assert_eq!(
            DefaultRule::from_raw(RawAccessType::SpecificRole, None),
            Err(InvalidAccessRule::MissingRoleId)
        );
        assert_eq!(
            DefaultRule::from_raw(RawAccessType::GlobalRole, None),
            Ok(DefaultRule::GlobalRole)
        );
    }

    #[test]
    fn test_stored_override_from_rule() {
        let row = StoredOverride::new(
            SubjectId::user("bob"),
            1,
            AccessRule::SpecificRole { role_id: 5 },
        );
        assert_eq!(row.access_type, RawAccessType::SpecificRole);
        assert_eq!(row.role_id, Some(5));
        assert_eq!(row.rule(), Ok(AccessRule::SpecificRole { role_id: 5 }));
    }

    #[test]
    fn test_corrupted_stored_override() {
        let row = StoredOverride {
            subject: SubjectId::group(3),
            project_id: 1,
            access_type: RawAccessType::SpecificRole,
            role_id: None,
        };
        assert_eq!(row.rule(), Err(InvalidAccessRule::MissingRoleId));
    }
}
