//! Batch resolution
//!
//! Resolves many subjects of one project with a fixed number of store
//! queries: the project default once, overrides and subject existence in
//! one query each, and global roles at most once (skipped entirely when no
//! subject can reach `GLOBAL_ROLE`).

use crate::access_control::resolver::ProjectPolicy;
use crate::access_control::rule::StoredOverride;
use crate::access_control::types::{
    AccessSource, AccessType, EffectiveAccess, EffectiveRole, GroupId, ProjectId, RoleId,
    SubjectId, UserId,
};
use crate::config::ResolverConfig;
use crate::error::{DataInconsistency, ResolutionUnavailable, StoreError};
use crate::metrics::{BatchRecord, ResolutionMetrics};
use crate::store::AccessStore;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, trace};

/// Effective access of every requested subject on one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResolution {
    pub project_id: ProjectId,
    /// Exactly one entry per distinct requested subject
    pub entries: HashMap<SubjectId, EffectiveAccess>,
    /// Inconsistent records met while resolving
    pub diagnostics: Vec<DataInconsistency>,
}

impl BatchResolution {
    pub fn get(&self, subject: &SubjectId) -> Option<&EffectiveAccess> {
        self.entries.get(subject)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by subject
    pub fn sorted(&self) -> Vec<(&SubjectId, &EffectiveAccess)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// A group's decision expanded to its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupExpansion {
    pub group_id: GroupId,
    pub group_access: EffectiveAccess,
    pub members: BTreeMap<UserId, EffectiveAccess>,
}

/// Batch resolver over an [`AccessStore`]
///
/// Stateless apart from its configuration; share it behind an `Arc`.
pub struct BatchResolver {
    store: Arc<dyn AccessStore>,
    concurrent_loads: bool,
    metrics: Option<Arc<ResolutionMetrics>>,
}

impl BatchResolver {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self {
            store,
            concurrent_loads: true,
            metrics: None,
        }
    }

    pub fn from_config(store: Arc<dyn AccessStore>, config: &ResolverConfig) -> Self {
        Self::new(store).with_concurrent_loads(config.concurrent_loads)
    }

    /// Issue the override and existence queries concurrently
    pub fn with_concurrent_loads(mut self, enabled: bool) -> Self {
        self.concurrent_loads = enabled;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ResolutionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolve a single subject
    pub async fn resolve_one(
        &self,
        project_id: ProjectId,
        subject: SubjectId,
    ) -> Result<EffectiveAccess, ResolutionUnavailable> {
        let resolution = self.resolve_many(project_id, [subject.clone()]).await?;
        Ok(resolution
            .get(&subject)
            .copied()
            .unwrap_or_else(EffectiveAccess::no_access_default))
    }

    /// Resolve every subject against one project
    ///
    /// Duplicate subjects collapse. Fails as a whole if any store query fails.
    pub async fn resolve_many<I>(
        &self,
        project_id: ProjectId,
        subjects: I,
    ) -> Result<BatchResolution, ResolutionUnavailable>
    where
        I: IntoIterator<Item = SubjectId>,
    {
        let subjects: Vec<SubjectId> = subjects
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(
            project_id,
            subjects = subjects.len(),
            backend = self.store.backend_name(),
            "Resolving effective access"
        );

        let start = Instant::now();
        match self.load_and_resolve(project_id, &subjects).await {
            Ok(resolution) => {
                if let Some(metrics) = &self.metrics {
                    let override_hits = resolution
                        .entries
                        .values()
                        .filter(|a| a.source == AccessSource::Override)
                        .count();
                    metrics.record_batch(
                        project_id,
                        BatchRecord {
                            subjects: resolution.len() as u64,
                            override_hits: override_hits as u64,
                            inconsistencies: resolution.diagnostics.len() as u64,
                            duration: start.elapsed(),
                        },
                    );
                }
                Ok(resolution)
            }
            Err(source) => {
                error!(project_id, error = %source, "Effective access resolution failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(project_id);
                }
                Err(ResolutionUnavailable::new(project_id, source))
            }
        }
    }

    async fn load_and_resolve(
        &self,
        project_id: ProjectId,
        subjects: &[SubjectId],
    ) -> Result<BatchResolution, StoreError> {
        let stored_default = self.store.project_default(project_id).await?;
        let (policy, default_diagnostic) =
            ProjectPolicy::from_stored(project_id, stored_default.as_ref());
        let mut diagnostics: Vec<_> = default_diagnostic.into_iter().collect();

        if stored_default.is_none() || subjects.is_empty() {
            return Ok(BatchResolution {
                project_id,
                entries: subjects
                    .iter()
                    .map(|s| (s.clone(), EffectiveAccess::no_access_default()))
                    .collect(),
                diagnostics,
            });
        }

        let (rows, existing) = if self.concurrent_loads {
            tokio::try_join!(
                self.store.overrides(project_id, subjects),
                self.store.existing_subjects(subjects)
            )?
        } else {
            let rows = self.store.overrides(project_id, subjects).await?;
            let existing = self.store.existing_subjects(subjects).await?;
            (rows, existing)
        };

        let overrides: HashMap<&SubjectId, &StoredOverride> = rows
            .iter()
            .filter(|row| row.project_id == project_id)
            .map(|row| (&row.subject, row))
            .collect();

        let global_roles = self
            .load_global_roles(&policy, subjects, &existing, &overrides)
            .await?;

        let mut entries = HashMap::with_capacity(subjects.len());
        for subject in subjects {
            if !existing.contains(subject) {
                trace!(subject = %subject, "Unknown subject, defaulting to no access");
                entries.insert(subject.clone(), EffectiveAccess::no_access_default());
                continue;
            }

            let global_role = subject
                .as_user()
                .and_then(|id| global_roles.get(id).copied().flatten());
            let resolution = policy.resolve(subject, overrides.get(subject).copied(), global_role);

            diagnostics.extend(resolution.diagnostic);
            entries.insert(subject.clone(), resolution.access);
        }

        Ok(BatchResolution {
            project_id,
            entries,
            diagnostics,
        })
    }

    async fn load_global_roles(
        &self,
        policy: &ProjectPolicy,
        subjects: &[SubjectId],
        existing: &HashSet<SubjectId>,
        overrides: &HashMap<&SubjectId, &StoredOverride>,
    ) -> Result<HashMap<UserId, Option<RoleId>>, StoreError> {
        let users: Vec<UserId> = subjects
            .iter()
            .filter(|s| existing.contains(*s))
            .filter(|s| policy.needs_global_role(s, overrides.get(s).copied()))
            .filter_map(|s| s.as_user().map(str::to_string))
            .collect();

        if users.is_empty() {
            trace!("No subject reaches GLOBAL_ROLE, skipping global role query");
            return Ok(HashMap::new());
        }

        self.store.global_roles(&users).await
    }

    /// Resolve a group and expand its decision to each member
    ///
    /// When the group resolves to "each member uses their own global role",
    /// every member gets `GLOBAL_ROLE` with their own global role. Otherwise
    /// every member inherits the group's decision.
    pub async fn expand_group(
        &self,
        project_id: ProjectId,
        group_id: GroupId,
    ) -> Result<GroupExpansion, ResolutionUnavailable> {
        let group_access = self
            .resolve_one(project_id, SubjectId::Group(group_id))
            .await?;

        let members = self
            .store
            .group_members(group_id)
            .await
            .map_err(|e| ResolutionUnavailable::new(project_id, e))?;

        let members: BTreeMap<UserId, EffectiveAccess> = if group_access.requires_member_expansion()
        {
            let roles = if members.is_empty() {
                HashMap::new()
            } else {
                self.store
                    .global_roles(&members)
                    .await
                    .map_err(|e| ResolutionUnavailable::new(project_id, e))?
            };
            members
                .into_iter()
                .map(|id| {
                    let role = EffectiveRole::from_option(roles.get(&id).copied().flatten());
                    let access =
                        EffectiveAccess::new(group_access.source, AccessType::GlobalRole, role);
                    (id, access)
                })
                .collect()
        } else {
            members.into_iter().map(|id| (id, group_access)).collect()
        };

        debug!(project_id, group_id, "Expanded group access to members");

        Ok(GroupExpansion {
            group_id,
            group_access,
            members,
        })
    }
}
