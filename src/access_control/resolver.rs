//! Access resolution
//!
//! Implements effective access resolution with the following precedence
//! (highest to lowest):
//! 1. Subject override (anything other than `PROJECT_DEFAULT`)
//! 2. Project default rule
//!
//! `GLOBAL_ROLE` resolves to the user's own global role. Groups have no
//! global role, so they resolve to [`EffectiveRole::PerMember`] instead.

use crate::access_control::rule::{AccessRule, DefaultRule, StoredDefault, StoredOverride};
use crate::access_control::types::{
    AccessSource, AccessType, EffectiveAccess, EffectiveRole, ProjectId, RoleId, SubjectId,
};
use crate::error::{DataInconsistency, InvalidAccessRule};
use tracing::{trace, warn};

/// Output of resolving one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub access: EffectiveAccess,
    /// Set when the subject's override row was unusable
    pub diagnostic: Option<DataInconsistency>,
}

/// Default rule of one project, ready to resolve subjects against
///
/// Holds no mutable state; resolving the same inputs twice yields the same
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectPolicy {
    project_id: ProjectId,
    default: DefaultRule,
}

impl ProjectPolicy {
    pub fn new(project_id: ProjectId, default: DefaultRule) -> Self {
        Self {
            project_id,
            default,
        }
    }

    /// Build a policy from a stored default
    ///
    /// A missing project resolves everyone to `NO_ACCESS`. An invalid stored
    /// default does too, and is reported as a diagnostic.
    pub fn from_stored(
        project_id: ProjectId,
        stored: Option<&StoredDefault>,
    ) -> (Self, Option<DataInconsistency>) {
        let Some(stored) = stored else {
            trace!(project_id, "Project not found, defaulting to no access");
            return (Self::new(project_id, DefaultRule::NoAccess), None);
        };

        match stored.rule() {
            Ok(rule) => (Self::new(project_id, rule), None),
            Err(reason) => {
                let diagnostic = DataInconsistency::in_default(project_id, reason);
                warn!(
                    project_id,
                    access_type = %stored.access_type,
                    error = %diagnostic,
                    "Invalid project default, treating as no access"
                );
                (Self::new(project_id, DefaultRule::NoAccess), Some(diagnostic))
            }
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn default_rule(&self) -> DefaultRule {
        self.default
    }

    /// Resolve one subject
    ///
    /// `global_role` is the user's global role id; it is ignored for groups.
    pub fn resolve(
        &self,
        subject: &SubjectId,
        stored_override: Option<&StoredOverride>,
        global_role: Option<RoleId>,
    ) -> Resolution {
        let (rule, diagnostic) = self.validate_override(subject, stored_override);

        let access = match rule.and_then(|r| r.as_concrete()) {
            Some(concrete) => {
                trace!(subject = %subject, "Matched subject override");
                Self::apply(AccessSource::Override, concrete, subject, global_role)
            }
            None => {
                trace!(subject = %subject, "Using project default");
                Self::apply(AccessSource::Default, self.default, subject, global_role)
            }
        };

        Resolution { access, diagnostic }
    }

    /// Check if resolving this subject needs its global role
    ///
    /// Used by the batch resolver to skip the global role query when no
    /// subject can reach the `GLOBAL_ROLE` branch.
    pub fn needs_global_role(
        &self,
        subject: &SubjectId,
        stored_override: Option<&StoredOverride>,
    ) -> bool {
        if subject.is_group() {
            return false;
        }
        let concrete = stored_override
            .and_then(|row| row.rule().ok())
            .and_then(|rule| rule.as_concrete())
            .unwrap_or(self.default);
        matches!(concrete, DefaultRule::GlobalRole)
    }

    fn validate_override(
        &self,
        subject: &SubjectId,
        stored_override: Option<&StoredOverride>,
    ) -> (Option<AccessRule>, Option<DataInconsistency>) {
        let Some(row) = stored_override else {
            return (None, None);
        };

        match row.rule() {
            Ok(rule) => (Some(rule), None),
            Err(reason) => {
                let diagnostic = self.inconsistency(subject, reason);
                warn!(
                    subject = %subject,
                    project_id = self.project_id,
                    error = %diagnostic,
                    "Ignoring invalid override, falling back to project default"
                );
                (None, Some(diagnostic))
            }
        }
    }

    fn inconsistency(&self, subject: &SubjectId, reason: InvalidAccessRule) -> DataInconsistency {
        DataInconsistency::in_override(self.project_id, subject.clone(), reason)
    }

    fn apply(
        source: AccessSource,
        rule: DefaultRule,
        subject: &SubjectId,
        global_role: Option<RoleId>,
    ) -> EffectiveAccess {
        match rule {
            DefaultRule::NoAccess => {
                EffectiveAccess::new(source, AccessType::NoAccess, EffectiveRole::None)
            }
            DefaultRule::GlobalRole => {
                let role = if subject.is_group() {
                    EffectiveRole::PerMember
                } else {
                    EffectiveRole::from_option(global_role)
                };
                EffectiveAccess::new(source, AccessType::GlobalRole, role)
            }
            DefaultRule::SpecificRole { role_id } => EffectiveAccess::new(
                source,
                AccessType::SpecificRole,
                EffectiveRole::Role(role_id),
            ),
        }
    }
}
