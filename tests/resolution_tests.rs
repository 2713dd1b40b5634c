//! Resolution function tests
//!
//! Exercises `ProjectPolicy::resolve` directly, without a store.

use project_access::access_control::{
    AccessRule, AccessSource, AccessType, DefaultRule, EffectiveAccess, EffectiveRole,
    ProjectPolicy, RawAccessType, StoredOverride, SubjectId,
};
use project_access::error::{InconsistentRecord, InvalidAccessRule};

const PROJECT: i64 = 1;

fn override_row(subject: &SubjectId, rule: AccessRule) -> StoredOverride {
    StoredOverride::new(subject.clone(), PROJECT, rule)
}

fn all_defaults() -> Vec<DefaultRule> {
    vec![
        DefaultRule::NoAccess,
        DefaultRule::GlobalRole,
        DefaultRule::SpecificRole { role_id: 3 },
    ]
}

// =============================================================================
// Example scenarios
// =============================================================================

#[test]
fn test_global_role_default_uses_user_role() {
    let policy = ProjectPolicy::new(PROJECT, DefaultRule::GlobalRole);
    let user = SubjectId::user("u");

    let resolution = policy.resolve(&user, None, Some(7));
    assert_eq!(
        resolution.access,
        EffectiveAccess::new(
            AccessSource::Default,
            AccessType::GlobalRole,
            EffectiveRole::Role(7)
        )
    );
}

#[test]
fn test_no_access_override_beats_specific_default() {
    let policy = ProjectPolicy::new(PROJECT, DefaultRule::SpecificRole { role_id: 3 });
    let user = SubjectId::user("u");
    let row = override_row(&user, AccessRule::NoAccess);

    let resolution = policy.resolve(&user, Some(&row), None);
    assert_eq!(
        resolution.access,
        EffectiveAccess::new(
            AccessSource::Override,
            AccessType::NoAccess,
            EffectiveRole::None
        )
    );
}

#[test]
fn test_group_project_default_override_falls_through() {
    let policy = ProjectPolicy::new(PROJECT, DefaultRule::SpecificRole { role_id: 3 });
    let group = SubjectId::group(9);
    let row = override_row(&group, AccessRule::ProjectDefault);

    let resolution = policy.resolve(&group, Some(&row), None);
    assert_eq!(
        resolution.access,
        EffectiveAccess::new(
            AccessSource::Default,
            AccessType::SpecificRole,
            EffectiveRole::Role(3)
        )
    );
    assert!(resolution.diagnostic.is_none());
}

#[test]
fn test_corrupted_override_reports_inconsistency() {
    let policy = ProjectPolicy::new(PROJECT, DefaultRule::NoAccess);
    let user = SubjectId::user("u");
    let row = StoredOverride {
        subject: user.clone(),
        project_id: PROJECT,
        access_type: RawAccessType::SpecificRole,
        role_id: None,
    };

    let resolution = policy.resolve(&user, Some(&row), Some(5));
    assert_eq!(resolution.access, EffectiveAccess::no_access_default());

    let diagnostic = resolution.diagnostic.expect("diagnostic should be reported");
    assert_eq!(diagnostic.project_id, PROJECT);
    assert_eq!(diagnostic.record, InconsistentRecord::Override(user));
    assert_eq!(diagnostic.reason, InvalidAccessRule::MissingRoleId);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_no_override_with_no_access_default() {
    let policy = ProjectPolicy::new(PROJECT, DefaultRule::NoAccess);
    for subject in [SubjectId::user("a"), SubjectId::user("b"), SubjectId::group(1)] {
        let deferring = override_row(&subject, AccessRule::ProjectDefault);
        for row in [None, Some(&deferring)] {
            let access = policy.resolve(&subject, row, Some(2)).access;
            assert_eq!(access, EffectiveAccess::no_access_default());
        }
    }
}

#[test]
fn test_specific_role_override_ignores_default() {
    for default in all_defaults() {
        let policy = ProjectPolicy::new(PROJECT, default);
        for subject in [SubjectId::user("a"), SubjectId::group(1)] {
            let row = override_row(&subject, AccessRule::SpecificRole { role_id: 42 });
            let access = policy.resolve(&subject, Some(&row), Some(2)).access;
            assert_eq!(
                access,
                EffectiveAccess::new(
                    AccessSource::Override,
                    AccessType::SpecificRole,
                    EffectiveRole::Role(42)
                )
            );
        }
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let user = SubjectId::user("a");
    let rows = [
        None,
        Some(override_row(&user, AccessRule::GlobalRole)),
        Some(override_row(&user, AccessRule::ProjectDefault)),
    ];

    for default in all_defaults() {
        let policy = ProjectPolicy::new(PROJECT, default);
        for row in &rows {
            let first = policy.resolve(&user, row.as_ref(), Some(8));
            let second = policy.resolve(&user, row.as_ref(), Some(8));
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_user_without_global_role() {
    let policy = ProjectPolicy::new(PROJECT, DefaultRule::GlobalRole);
    let access = policy.resolve(&SubjectId::user("a"), None, None).access;
    assert_eq!(access.access_type, AccessType::GlobalRole);
    assert_eq!(access.role, EffectiveRole::None);
    assert_eq!(access.effective_role_id(), None);
}

#[test]
fn test_group_never_gets_representative_role() {
    let group = SubjectId::group(4);
    let global_override = override_row(&group, AccessRule::GlobalRole);

    let policy = ProjectPolicy::new(PROJECT, DefaultRule::GlobalRole);
    let by_default = policy.resolve(&group, None, Some(7)).access;
    assert_eq!(by_default.source, AccessSource::Default);
    assert_eq!(by_default.role, EffectiveRole::PerMember);

    let policy = ProjectPolicy::new(PROJECT, DefaultRule::NoAccess);
    let by_override = policy.resolve(&group, Some(&global_override), Some(7)).access;
    assert_eq!(by_override.source, AccessSource::Override);
    assert_eq!(by_override.role, EffectiveRole::PerMember);
}
