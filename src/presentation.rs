//! Display labels for effective access
//!
//! Turns an [`EffectiveAccess`] into the string shown next to a subject in
//! project access tables.

use crate::access_control::types::{
    AccessSource, AccessType, EffectiveAccess, EffectiveRole, RoleId,
};
use std::collections::HashMap;

/// Role name lookup used while formatting
pub trait RoleNameLookup {
    fn role_name(&self, role_id: RoleId) -> Option<&str>;
}

impl RoleNameLookup for HashMap<RoleId, String> {
    fn role_name(&self, role_id: RoleId) -> Option<&str> {
        self.get(&role_id).map(String::as_str)
    }
}

/// Lookup that knows no roles; every role renders as `Role #<id>`
pub struct NoRoleNames;

impl RoleNameLookup for NoRoleNames {
    fn role_name(&self, _role_id: RoleId) -> Option<&str> {
        None
    }
}

fn role_label(role_id: RoleId, roles: &impl RoleNameLookup) -> String {
    match roles.role_name(role_id) {
        Some(name) => name.to_string(),
        None => format!("Role #{}", role_id),
    }
}

/// Format an effective access decision for display
pub fn format(access: &EffectiveAccess, roles: &impl RoleNameLookup) -> String {
    match access.source {
        AccessSource::Default => {
            let inner = match (access.access_type, access.role) {
                (AccessType::NoAccess, _) => "No Access".to_string(),
                (_, EffectiveRole::PerMember) => "Each member's global role".to_string(),
                (_, EffectiveRole::Role(id)) => match roles.role_name(id) {
                    Some(name) => format!("{} role", name),
                    None => format!("Role #{}", id),
                },
                (AccessType::GlobalRole, EffectiveRole::None) => "Global Role".to_string(),
                (AccessType::SpecificRole, EffectiveRole::None) => "Specific Role".to_string(),
            };
            format!("Project Default ({})", inner)
        }
        AccessSource::Override => match (access.access_type, access.role) {
            (AccessType::NoAccess, _) => "No Access".to_string(),
            (AccessType::GlobalRole, EffectiveRole::PerMember) => {
                "Global Role (Each member's own)".to_string()
            }
            (AccessType::GlobalRole, EffectiveRole::Role(id)) => {
                format!("Global Role ({})", role_label(id, roles))
            }
            (AccessType::GlobalRole, EffectiveRole::None) => "Global Role".to_string(),
            (AccessType::SpecificRole, EffectiveRole::Role(id)) => {
                format!("Specific Role ({})", role_label(id, roles))
            }
            (AccessType::SpecificRole, _) => "Specific Role".to_string(),
        },
    }
}
