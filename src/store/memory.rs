//! In-memory implementation of the access store.
//!
//! Backs the CLI and the tests. All tables live in `HashMap`s guarded by
//! `tokio::sync::RwLock`; reads run concurrently and writes are serialized
//! per table. Nothing is durable.
//!
//! Rows are stored exactly as given, including rows that violate the rule
//! invariants, so legacy data can be reproduced. Validation happens in the
//! admin edit flow and at resolution time.

use super::{AccessStore, AccessStoreWriter, OverrideChanges};
use crate::access_control::rule::{StoredDefault, StoredOverride};
use crate::access_control::types::{GroupId, ProjectId, RoleId, SubjectId, UserId};
use crate::config::DirectoryConfig;
use crate::error::{ConfigError, StoreResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

type OverrideKey = (ProjectId, SubjectId);

/// Number of queries served, per query kind
#[derive(Debug, Default)]
struct QueryCounters {
    project_default: AtomicU64,
    overrides: AtomicU64,
    existing_subjects: AtomicU64,
    global_roles: AtomicU64,
    group_members: AtomicU64,
}

/// Snapshot of [`InMemoryStore`] query counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryCounts {
    pub project_default: u64,
    pub overrides: u64,
    pub existing_subjects: u64,
    pub global_roles: u64,
    pub group_members: u64,
}

/// In-memory access store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Project default rules keyed by project id
    projects: RwLock<HashMap<ProjectId, StoredDefault>>,
    /// Users and their optional global role
    users: RwLock<HashMap<UserId, Option<RoleId>>>,
    /// Groups and their member users
    groups: RwLock<HashMap<GroupId, Vec<UserId>>>,
    /// Override rows keyed by (project, subject)
    overrides: RwLock<HashMap<OverrideKey, StoredOverride>>,
    /// Role display names
    roles: RwLock<HashMap<RoleId, String>>,
    counters: QueryCounters,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from the `[directory]` configuration section
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, ConfigError> {
        let mut store = Self::new();

        for role in &config.roles {
            store = store.with_role(role.id, &role.name);
        }
        for user in &config.users {
            store = store.with_user(&user.id, user.global_role_id);
        }
        for group in &config.groups {
            store = store.with_group(group.id, group.members.iter().cloned());
        }
        for project in &config.projects {
            store = store.with_project(StoredDefault {
                project_id: project.id,
                access_type: project.default_access_type,
                role_id: project.default_role_id,
            });
        }
        for entry in &config.overrides {
            let subject = entry.subject()?;
            store = store.with_override(StoredOverride {
                subject,
                project_id: entry.project,
                access_type: entry.access_type,
                role_id: entry.role_id,
            });
        }

        Ok(store)
    }

    pub fn with_project(mut self, default: StoredDefault) -> Self {
        self.projects.get_mut().insert(default.project_id, default);
        self
    }

    pub fn with_user(mut self, id: impl Into<UserId>, global_role_id: Option<RoleId>) -> Self {
        self.users.get_mut().insert(id.into(), global_role_id);
        self
    }

    pub fn with_group(
        mut self,
        id: GroupId,
        members: impl IntoIterator<Item = impl Into<UserId>>,
    ) -> Self {
        let members: Vec<UserId> = members.into_iter().map(Into::into).collect();
        self.groups.get_mut().insert(id, members);
        self
    }

    /// Insert a raw override row without validation
    pub fn with_override(mut self, row: StoredOverride) -> Self {
        self.overrides
            .get_mut()
            .insert((row.project_id, row.subject.clone()), row);
        self
    }

    pub fn with_role(mut self, id: RoleId, name: impl Into<String>) -> Self {
        self.roles.get_mut().insert(id, name.into());
        self
    }

    /// Snapshot of the role name table
    pub async fn role_names(&self) -> HashMap<RoleId, String> {
        self.roles.read().await.clone()
    }

    /// All override rows of a project, sorted by subject
    pub async fn project_overrides(&self, project_id: ProjectId) -> Vec<StoredOverride> {
        let mut rows: Vec<_> = self
            .overrides
            .read()
            .await
            .values()
            .filter(|row| row.project_id == project_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.subject.cmp(&b.subject));
        rows
    }

    /// Every user and group id known to the store, sorted
    pub async fn all_subjects(&self) -> Vec<SubjectId> {
        let mut subjects: Vec<_> = self
            .users
            .read()
            .await
            .keys()
            .cloned()
            .map(SubjectId::User)
            .collect();
        subjects.extend(self.groups.read().await.keys().copied().map(SubjectId::Group));
        subjects.sort();
        subjects
    }

    pub fn query_counts(&self) -> QueryCounts {
        let c = &self.counters;
        QueryCounts {
            project_default: c.project_default.load(Ordering::Relaxed),
            overrides: c.overrides.load(Ordering::Relaxed),
            existing_subjects: c.existing_subjects.load(Ordering::Relaxed),
            global_roles: c.global_roles.load(Ordering::Relaxed),
            group_members: c.group_members.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl AccessStore for InMemoryStore {
    async fn project_default(&self, project_id: ProjectId) -> StoreResult<Option<StoredDefault>> {
        self.counters.project_default.fetch_add(1, Ordering::Relaxed);
        Ok(self.projects.read().await.get(&project_id).cloned())
    }

    async fn overrides(
        &self,
        project_id: ProjectId,
        subjects: &[SubjectId],
    ) -> StoreResult<Vec<StoredOverride>> {
        self.counters.overrides.fetch_add(1, Ordering::Relaxed);
        let overrides = self.overrides.read().await;
        let rows: Vec<_> = subjects
            .iter()
            .filter_map(|subject| overrides.get(&(project_id, subject.clone())))
            .cloned()
            .collect();
        debug!(project_id, found = rows.len(), "Loaded overrides");
        Ok(rows)
    }

    async fn existing_subjects(&self, subjects: &[SubjectId]) -> StoreResult<HashSet<SubjectId>> {
        self.counters.existing_subjects.fetch_add(1, Ordering::Relaxed);
        let users = self.users.read().await;
        let groups = self.groups.read().await;
        Ok(subjects
            .iter()
            .filter(|subject| match subject {
                SubjectId::User(id) => users.contains_key(id),
                SubjectId::Group(id) => groups.contains_key(id),
            })
            .cloned()
            .collect())
    }

    async fn global_roles(&self, users: &[UserId]) -> StoreResult<HashMap<UserId, Option<RoleId>>> {
        self.counters.global_roles.fetch_add(1, Ordering::Relaxed);
        let known = self.users.read().await;
        Ok(users
            .iter()
            .filter_map(|id| known.get(id).map(|role| (id.clone(), *role)))
            .collect())
    }

    async fn group_members(&self, group_id: GroupId) -> StoreResult<Vec<UserId>> {
        self.counters.group_members.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .groups
            .read()
            .await
            .get(&group_id)
            .cloned()
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl AccessStoreWriter for InMemoryStore {
    async fn apply_overrides(
        &self,
        project_id: ProjectId,
        changes: OverrideChanges,
    ) -> StoreResult<usize> {
        let mut overrides = self.overrides.write().await;
        for row in changes.upserts {
            overrides.insert((row.project_id, row.subject.clone()), row);
        }
        let mut deleted = 0;
        for subject in changes.deletes {
            if overrides.remove(&(project_id, subject)).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn delete_invalid_override(
        &self,
        project_id: ProjectId,
        subject: &SubjectId,
    ) -> StoreResult<bool> {
        let mut overrides = self.overrides.write().await;
        let key = (project_id, subject.clone());
        match overrides.get(&key) {
            Some(row) if row.rule().is_err() => Ok(overrides.remove(&key).is_some()),
            _ => Ok(false),
        }
    }

    async fn set_project_default(&self, default: StoredDefault) -> StoreResult<()> {
        self.projects
            .write()
            .await
            .insert(default.project_id, default);
        Ok(())
    }
}
