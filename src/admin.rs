//! Admin edit flow
//!
//! Applies override and default edits coming from project create/edit
//! forms. Every edit is validated before anything is written, and the valid
//! set reaches the store as one [`OverrideChanges`], so an edit batch is
//! persisted entirely or not at all.

use crate::access_control::rule::{AccessRule, DefaultRule, StoredDefault, StoredOverride};
use crate::access_control::types::{ProjectId, RawAccessType, RoleId, SubjectId};
use crate::error::{DataInconsistency, EditError};
use crate::store::{AccessStoreWriter, OverrideChanges};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One requested change to a subject's override
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverrideEdit {
    pub subject: SubjectId,
    pub access_type: RawAccessType,
    #[serde(default)]
    pub role_id: Option<RoleId>,
}

impl OverrideEdit {
    pub fn new(subject: SubjectId, access_type: RawAccessType, role_id: Option<RoleId>) -> Self {
        Self {
            subject,
            access_type,
            role_id,
        }
    }
}

/// Counts of rows written by an edit batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub upserted: usize,
    pub deleted: usize,
}

/// Validates and persists access edits
pub struct OverrideEditor {
    store: Arc<dyn AccessStoreWriter>,
}

impl OverrideEditor {
    pub fn new(store: Arc<dyn AccessStoreWriter>) -> Self {
        Self { store }
    }

    /// Apply a set of override edits to one project
    ///
    /// `PROJECT_DEFAULT` removes the subject's override row; any other type
    /// upserts it. When a subject appears more than once the last edit wins.
    pub async fn apply(
        &self,
        project_id: ProjectId,
        edits: impl IntoIterator<Item = OverrideEdit>,
    ) -> Result<EditOutcome, EditError> {
        let mut validated: BTreeMap<SubjectId, AccessRule> = BTreeMap::new();
        for edit in edits {
            let rule = AccessRule::from_raw(edit.access_type, edit.role_id).map_err(|source| {
                EditError::InvalidRule {
                    subject: edit.subject.clone(),
                    source,
                }
            })?;
            validated.insert(edit.subject, rule);
        }

        let mut changes = OverrideChanges::default();
        for (subject, rule) in validated {
            if rule.is_project_default() {
                changes.deletes.push(subject);
            } else {
                changes
                    .upserts
                    .push(StoredOverride::new(subject, project_id, rule));
            }
        }

        let upserted = changes.upserts.len();
        let deleted = if changes.is_empty() {
            0
        } else {
            self.store.apply_overrides(project_id, changes).await?
        };
        let outcome = EditOutcome { upserted, deleted };

        debug!(
            project_id,
            upserted = outcome.upserted,
            deleted = outcome.deleted,
            "Applied override edits"
        );
        Ok(outcome)
    }

    /// Replace a project's default rule
    pub async fn set_default(
        &self,
        project_id: ProjectId,
        access_type: RawAccessType,
        role_id: Option<RoleId>,
    ) -> Result<DefaultRule, EditError> {
        let rule = DefaultRule::from_raw(access_type, role_id)
            .map_err(|source| EditError::InvalidDefault { project_id, source })?;

        self.store
            .set_project_default(StoredDefault::new(project_id, rule))
            .await?;
        debug!(project_id, access_type = %rule.raw_type(), "Updated project default");
        Ok(rule)
    }

    /// Delete the override rows named by resolution diagnostics
    ///
    /// A row is only removed if it is still invalid when the delete runs;
    /// rows fixed since the diagnostic was produced are kept. Diagnostics
    /// about project defaults are skipped; those need an explicit
    /// [`OverrideEditor::set_default`]. Returns the number of rows removed.
    pub async fn heal(&self, diagnostics: &[DataInconsistency]) -> Result<usize, EditError> {
        let mut removed = 0;
        for diagnostic in diagnostics {
            let Some(subject) = diagnostic.subject() else {
                continue;
            };
            if self
                .store
                .delete_invalid_override(diagnostic.project_id, subject)
                .await?
            {
                info!(
                    project_id = diagnostic.project_id,
                    subject = %subject,
                    "Removed inconsistent override"
                );
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Report every stored override row that fails validation
///
/// Unlike resolution, this also covers rows whose subject no longer exists.
pub fn scan_overrides(
    project_id: ProjectId,
    rows: &[StoredOverride],
) -> Vec<DataInconsistency> {
    rows.iter()
        .filter(|row| row.project_id == project_id)
        .filter_map(|row| {
            row.rule().err().map(|reason| {
                DataInconsistency::in_override(project_id, row.subject.clone(), reason)
            })
        })
        .collect()
}
