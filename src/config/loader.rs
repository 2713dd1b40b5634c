//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (PROJECT_ACCESS__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::{AppConfig, DirectoryConfig};
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "project-access.toml",
    ".project-access.toml",
    "~/.config/project-access/config.toml",
    "/etc/project-access/config.toml",
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with PROJECT_ACCESS prefix
    // e.g., PROJECT_ACCESS__RESOLVER__CONCURRENT_LOADS, PROJECT_ACCESS__LOGGING__FORMAT
    // Double underscore (__) maps to nested keys (resolver.concurrent_loads)
    builder = builder.add_source(
        Environment::with_prefix("PROJECT_ACCESS")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.logging.level.is_empty() {
        return Err(ConfigError::Missing {
            field: "logging.level".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        return Err(ConfigError::Invalid {
            message: format!(
                "logging.level must be one of {}, got: {}",
                LOG_LEVELS.join(", "),
                config.logging.level
            ),
        });
    }

    validate_directory(&config.directory)
}

/// Validate ids and references in the directory
///
/// Rule invariants are not checked here; stored rules are allowed to be
/// inconsistent and are reported at resolution time instead.
fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    let roles = unique_ids(directory.roles.iter().map(|r| r.id), "directory.roles")?;
    let users = unique_ids(directory.users.iter().map(|u| u.id.clone()), "directory.users")?;
    unique_ids(directory.groups.iter().map(|g| g.id), "directory.groups")?;
    let projects = unique_ids(directory.projects.iter().map(|p| p.id), "directory.projects")?;

    for user in &directory.users {
        if let Some(role) = user.global_role_id {
            require_known(&roles, &role, "role", &format!("user '{}'", user.id))?;
        }
    }

    for group in &directory.groups {
        for member in &group.members {
            require_known(&users, member, "user", &format!("group {}", group.id))?;
        }
    }

    for project in &directory.projects {
        if let Some(role) = project.default_role_id {
            require_known(&roles, &role, "role", &format!("project {}", project.id))?;
        }
    }

    let mut keys = HashSet::new();
    for entry in &directory.overrides {
        let subject = entry.subject()?;
        require_known(&projects, &entry.project, "project", "directory.overrides")?;
        if let Some(role) = entry.role_id {
            require_known(&roles, &role, "role", &format!("override for {}", subject))?;
        }
        if !keys.insert((entry.project, subject.clone())) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "duplicate override for {} on project {}",
                    subject, entry.project
                ),
            });
        }
    }

    Ok(())
}

fn unique_ids<T>(ids: impl Iterator<Item = T>, field: &str) -> Result<HashSet<T>, ConfigError>
where
    T: std::hash::Hash + Eq + std::fmt::Display,
{
    let mut seen = HashSet::new();
    for id in ids {
        if seen.contains(&id) {
            return Err(ConfigError::Invalid {
                message: format!("duplicate id {} in {}", id, field),
            });
        }
        seen.insert(id);
    }
    Ok(seen)
}

fn require_known<T>(
    known: &HashSet<T>,
    id: &T,
    kind: &str,
    referenced_by: &str,
) -> Result<(), ConfigError>
where
    T: std::hash::Hash + Eq + std::fmt::Display,
{
    if known.contains(id) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            message: format!("{} references unknown {} {}", referenced_by, kind, id),
        })
    }
}
