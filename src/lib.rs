//! Project Access
//!
//! Effective project access resolution for a multi-tenant test-management
//! application.
//!
//! ## Features
//!
//! - **Typed rules**: `PROJECT_DEFAULT`, `NO_ACCESS`, `GLOBAL_ROLE`, `SPECIFIC_ROLE`
//!   as sum types; `SPECIFIC_ROLE` without a role cannot be constructed
//! - **Pure resolution**: override over project default, recomputed on every read
//! - **Batch resolution**: a fixed number of set-based store queries per batch
//! - **Self-healing**: inconsistent stored rows surface as diagnostics that the
//!   admin edit flow can delete
//!
//! ## Resolution Model
//!
//! ```text
//! subject override (unless PROJECT_DEFAULT) → project default
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [resolver]
//! concurrent_loads = true
//!
//! [[directory.roles]]
//! id = 3
//! name = "Tester"
//!
//! [[directory.users]]
//! id = "alice"
//! global_role_id = 3
//!
//! [[directory.projects]]
//! id = 1
//! default_access_type = "GLOBAL_ROLE"
//!
//! [[directory.overrides]]
//! project = 1
//! user = "alice"
//! access_type = "NO_ACCESS"
//! ```

pub mod access_control;
pub mod admin;
pub mod config;
pub mod error;
pub mod metrics;
pub mod presentation;
pub mod store;

// Re-export main types
pub use access_control::{BatchResolution, BatchResolver, EffectiveAccess, SubjectId};
pub use admin::{OverrideEdit, OverrideEditor};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use metrics::ResolutionMetrics;
pub use store::{AccessStore, AccessStoreWriter, InMemoryStore};
