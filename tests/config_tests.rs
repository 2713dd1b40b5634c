//! Configuration loading tests

use project_access::access_control::{
    AccessSource, AccessType, BatchResolver, EffectiveRole, RawAccessType, SubjectId,
};
use project_access::config::{LogFormat, load_config_from_str};
use project_access::error::ConfigError;
use project_access::store::InMemoryStore;
use std::sync::Arc;

const FULL_CONFIG: &str = r#"
[resolver]
concurrent_loads = false
heal_inconsistencies = true

[logging]
level = "warn"
format = "json"

[[directory.roles]]
id = 1
name = "Admin"

[[directory.roles]]
id = 2
name = "Tester"

[[directory.users]]
id = "alice"
global_role_id = 2

[[directory.users]]
id = "bob"

[[directory.groups]]
id = 7
name = "qa"
members = ["alice", "bob"]

[[directory.projects]]
id = 100
name = "Apollo"
default_access_type = "GLOBAL_ROLE"

[[directory.overrides]]
project = 100
user = "bob"
access_type = "SPECIFIC_ROLE"
role_id = 1

[[directory.overrides]]
project = 100
group = 7
access_type = "NO_ACCESS"
"#;

#[test]
fn test_load_full_config() {
    let config = load_config_from_str(FULL_CONFIG).unwrap();

    assert!(!config.resolver.concurrent_loads);
    assert!(config.resolver.heal_inconsistencies);
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Json);

    let directory = &config.directory;
    assert_eq!(directory.roles.len(), 2);
    assert_eq!(directory.users[1].global_role_id, None);
    assert_eq!(directory.groups[0].members, vec!["alice", "bob"]);
    assert_eq!(directory.projects[0].name.as_deref(), Some("Apollo"));
    assert_eq!(
        directory.projects[0].default_access_type,
        RawAccessType::GlobalRole
    );
    assert_eq!(
        directory.overrides[1].subject().unwrap(),
        SubjectId::group(7)
    );
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = load_config_from_str("").unwrap();
    assert!(config.resolver.concurrent_loads);
    assert_eq!(config.logging.level, "info");
    assert!(config.directory.users.is_empty());
}

#[test]
fn test_invalid_access_type_is_rejected() {
    let config_str = r#"
[[directory.projects]]
id = 1
default_access_type = "EVERYONE"
"#;
    assert!(matches!(
        load_config_from_str(config_str),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_override_with_both_subjects_is_rejected() {
    let config_str = r#"
[[directory.users]]
id = "alice"

[[directory.groups]]
id = 1

[[directory.projects]]
id = 1
default_access_type = "NO_ACCESS"

[[directory.overrides]]
project = 1
user = "alice"
group = 1
access_type = "NO_ACCESS"
"#;
    let err = load_config_from_str(config_str).unwrap_err();
    assert!(err.to_string().contains("both user and group"));
}

#[test]
fn test_group_member_must_exist() {
    let config_str = r#"
[[directory.groups]]
id = 3
members = ["ghost"]
"#;
    let err = load_config_from_str(config_str).unwrap_err();
    assert!(err.to_string().contains("unknown user ghost"));
}

#[tokio::test]
async fn test_store_from_config_resolves() {
    let config = load_config_from_str(FULL_CONFIG).unwrap();
    let store = Arc::new(InMemoryStore::from_config(&config.directory).unwrap());
    let resolver = BatchResolver::from_config(store.clone(), &config.resolver);

    let resolution = resolver
        .resolve_many(
            100,
            vec![
                SubjectId::user("alice"),
                SubjectId::user("bob"),
                SubjectId::group(7),
            ],
        )
        .await
        .unwrap();

    let alice = resolution.get(&SubjectId::user("alice")).unwrap();
    assert_eq!(alice.source, AccessSource::Default);
    assert_eq!(alice.role, EffectiveRole::Role(2));

    let bob = resolution.get(&SubjectId::user("bob")).unwrap();
    assert_eq!(bob.source, AccessSource::Override);
    assert_eq!(bob.role, EffectiveRole::Role(1));

    let group = resolution.get(&SubjectId::group(7)).unwrap();
    assert_eq!(group.access_type, AccessType::NoAccess);

    assert_eq!(store.role_names().await[&1], "Admin");
}

#[test]
fn test_missing_config_file() {
    use project_access::config::load_config;

    let err = load_config(Some("/nonexistent/project-access.toml")).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
#[serial_test::serial]
fn test_env_overrides_file() {
    use project_access::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("project-access.toml");
    let config_content = r#"
[resolver]
concurrent_loads = true

[logging]
level = "info"
"#;
    fs::write(&config_path, config_content).unwrap();

    unsafe {
        env::set_var("PROJECT_ACCESS__RESOLVER__CONCURRENT_LOADS", "false");
        env::set_var("PROJECT_ACCESS__LOGGING__LEVEL", "debug");
    }

    let config = load_config(Some(config_path.to_str().unwrap()));

    // Cleanup
    unsafe {
        env::remove_var("PROJECT_ACCESS__RESOLVER__CONCURRENT_LOADS");
        env::remove_var("PROJECT_ACCESS__LOGGING__LEVEL");
    }

    let config = config.unwrap();
    assert!(!config.resolver.concurrent_loads);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial_test::serial]
fn test_env_invalid_log_level() {
    use project_access::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("project-access.toml");
    fs::write(&config_path, "").unwrap();

    unsafe {
        env::set_var("PROJECT_ACCESS__LOGGING__LEVEL", "chatty");
    }
    let result = load_config(Some(config_path.to_str().unwrap()));
    unsafe {
        env::remove_var("PROJECT_ACCESS__LOGGING__LEVEL");
    }

    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}
