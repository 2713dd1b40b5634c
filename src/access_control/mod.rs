//! Access control module
//!
//! Resolves the effective access of users and groups on a project.
//!
//! ## Access Model
//!
//! Each project carries a default rule; each subject may carry an override
//! on that project. Resolution uses the following precedence (highest to
//! lowest):
//!
//! 1. **Subject override** - any override other than `PROJECT_DEFAULT`
//! 2. **Project default** - `NO_ACCESS`, `GLOBAL_ROLE` or `SPECIFIC_ROLE`
//!
//! `GLOBAL_ROLE` means "use the user's own global role". For a group this
//! has no single answer, so groups resolve to a per-member marker that
//! [`BatchResolver::expand_group`] turns into one decision per member.
//!
//! ## Example
//!
//! ```text
//! project 1: default = SPECIFIC_ROLE (role 3)
//!   alice  no override            -> SPECIFIC_ROLE 3  (DEFAULT)
//!   bob    override NO_ACCESS     -> NO_ACCESS        (OVERRIDE)
//!   group 5 override PROJECT_DEFAULT -> SPECIFIC_ROLE 3 (DEFAULT)
//! ```

pub mod batch;
pub mod resolver;
pub mod rule;
pub mod types;

pub use batch::{BatchResolution, BatchResolver, GroupExpansion};
pub use resolver::{ProjectPolicy, Resolution};
pub use rule::{AccessRule, DefaultRule, StoredDefault, StoredOverride};
pub use types::{
    AccessSource, AccessType, EffectiveAccess, EffectiveRole, GroupId, ProjectId, RawAccessType,
    RoleId, SubjectId, UserId,
};
