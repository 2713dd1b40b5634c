//! Access rule construction tests
//!
//! Covers every (access type, role id) combination for override rules and
//! project default rules.

use project_access::access_control::{AccessRule, DefaultRule, RawAccessType};
use project_access::error::InvalidAccessRule;
use rstest::rstest;

#[rstest]
#[case(RawAccessType::ProjectDefault, None, Ok(AccessRule::ProjectDefault))]
#[case(RawAccessType::ProjectDefault, Some(4), Ok(AccessRule::ProjectDefault))]
#[case(RawAccessType::NoAccess, None, Ok(AccessRule::NoAccess))]
#[case(RawAccessType::NoAccess, Some(4), Ok(AccessRule::NoAccess))]
#[case(RawAccessType::GlobalRole, None, Ok(AccessRule::GlobalRole))]
#[case(RawAccessType::GlobalRole, Some(4), Ok(AccessRule::GlobalRole))]
#[case(RawAccessType::SpecificRole, Some(4), Ok(AccessRule::SpecificRole { role_id: 4 }))]
#[case(RawAccessType::SpecificRole, None, Err(InvalidAccessRule::MissingRoleId))]
fn test_override_rule_from_raw(
    #[case] access_type: RawAccessType,
    #[case] role_id: Option<i64>,
    #[case] expected: Result<AccessRule, InvalidAccessRule>,
) {
    assert_eq!(AccessRule::from_raw(access_type, role_id), expected);
}

#[rstest]
#[case(RawAccessType::ProjectDefault, None, Err(InvalidAccessRule::DefaultCannotDefer))]
#[case(RawAccessType::NoAccess, Some(1), Ok(DefaultRule::NoAccess))]
#[case(RawAccessType::GlobalRole, None, Ok(DefaultRule::GlobalRole))]
#[case(RawAccessType::SpecificRole, Some(3), Ok(DefaultRule::SpecificRole { role_id: 3 }))]
#[case(RawAccessType::SpecificRole, None, Err(InvalidAccessRule::MissingRoleId))]
fn test_default_rule_from_raw(
    #[case] access_type: RawAccessType,
    #[case] role_id: Option<i64>,
    #[case] expected: Result<DefaultRule, InvalidAccessRule>,
) {
    assert_eq!(DefaultRule::from_raw(access_type, role_id), expected);
}

#[test]
fn test_valid_rules_keep_their_raw_form() {
    for access_type in RawAccessType::all() {
        let rule = AccessRule::from_raw(*access_type, Some(11)).unwrap();
        assert_eq!(rule.raw_type(), *access_type);

        let expected_role = match access_type {
            RawAccessType::SpecificRole => Some(11),
            _ => None,
        };
        assert_eq!(rule.role_id(), expected_role);
    }
}

#[test]
fn test_specific_role_without_role_always_fails() {
    for _ in 0..3 {
        assert_eq!(
            AccessRule::from_raw(RawAccessType::SpecificRole, None),
            Err(InvalidAccessRule::MissingRoleId)
        );
    }
}
