//! Configuration module
//!
//! Loads resolver, logging and directory settings from a TOML file layered
//! under `PROJECT_ACCESS__*` environment variables, then validates the
//! directory's references.

pub mod loader;
pub mod types;

pub use loader::{load_config, load_config_from_str};
pub use types::{
    AppConfig, DirectoryConfig, GroupEntry, LogFormat, LoggingConfig, OverrideEntry, ProjectEntry,
    ResolverConfig, RoleEntry, UserEntry,
};
