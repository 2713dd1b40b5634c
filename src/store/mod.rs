//! Persistence contract
//!
//! The engine reads through [`AccessStore`]; every lookup is set-based so a
//! batch resolution costs a fixed number of round trips regardless of how
//! many subjects it covers. Writes go through [`AccessStoreWriter`], which
//! only the admin edit flow uses.

use crate::access_control::rule::{StoredDefault, StoredOverride};
use crate::access_control::types::{GroupId, ProjectId, RoleId, SubjectId, UserId};
use crate::error::StoreResult;
// async_trait required for dyn-compatibility with Arc<dyn AccessStore>
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

pub mod memory;

pub use memory::InMemoryStore;

/// Read side of the persistence layer
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Fetch the project's default rule, `None` if the project does not exist
    async fn project_default(&self, project_id: ProjectId) -> StoreResult<Option<StoredDefault>>;

    /// Fetch override rows of `project_id` for the given subjects
    async fn overrides(
        &self,
        project_id: ProjectId,
        subjects: &[SubjectId],
    ) -> StoreResult<Vec<StoredOverride>>;

    /// Return the subset of `subjects` that exist
    async fn existing_subjects(&self, subjects: &[SubjectId]) -> StoreResult<HashSet<SubjectId>>;

    /// Fetch global role ids for the given users
    ///
    /// Unknown users are absent from the map; known users without a global
    /// role map to `None`.
    async fn global_roles(&self, users: &[UserId]) -> StoreResult<HashMap<UserId, Option<RoleId>>>;

    /// Fetch the member user ids of a group
    async fn group_members(&self, group_id: GroupId) -> StoreResult<Vec<UserId>>;

    /// Get a description of the backend (for logging)
    fn backend_name(&self) -> &'static str;
}

/// Override writes for one project, applied as a unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideChanges {
    /// Rows to insert or replace, keyed by (subject, project)
    pub upserts: Vec<StoredOverride>,
    /// Subjects whose override row is removed
    pub deletes: Vec<SubjectId>,
}

impl OverrideChanges {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Write side of the persistence layer
///
/// Overrides are keyed by (subject, project): upserting twice replaces the
/// row rather than adding a second one.
#[async_trait]
pub trait AccessStoreWriter: Send + Sync {
    /// Apply every change or none of them
    ///
    /// Returns the number of rows actually deleted.
    async fn apply_overrides(
        &self,
        project_id: ProjectId,
        changes: OverrideChanges,
    ) -> StoreResult<usize>;

    /// Delete an override row only if it still fails validation
    ///
    /// The check and the delete happen under one write, so a valid row saved
    /// after the inconsistency was reported is kept.
    async fn delete_invalid_override(
        &self,
        project_id: ProjectId,
        subject: &SubjectId,
    ) -> StoreResult<bool>;

    async fn set_project_default(&self, default: StoredDefault) -> StoreResult<()>;
}
