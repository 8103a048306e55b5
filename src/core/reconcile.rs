//! Membership mutation: commit intent, then re-derive truth
//!
//! The group-membership API has no multi-id transaction, so after every
//! save attempt the membership is read back and that read, not local
//! bookkeeping, becomes the new baseline.

use crate::core::diff::MembershipDiff;
use crate::models::{ContactId, GroupId, IdSet, RecordId};
use crate::services::remote::{ApiError, GroupStore};
use serde::Serialize;
use thiserror::Error;

pub use crate::core::diff::compute_diff;

/// One failed step of a save
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaveError {
    #[error("Failed to add {} contact(s): {message}", .ids.len())]
    AddMembers { ids: Vec<ContactId>, message: String },

    #[error("Failed to remove contact {id}: {message}")]
    RemoveMember { id: ContactId, message: String },

    #[error("Failed to re-read group membership: {message}")]
    Reconcile { message: String },
}

/// Result of [`apply_save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Membership to adopt as the new baseline
    pub baseline: IdSet,
    pub errors: Vec<SaveError>,
    /// True when `baseline` came from a fresh authoritative read
    pub reconciled: bool,
    pub diff: MembershipDiff,
}

impl SaveOutcome {
    pub fn is_clean(&self) -> bool {
        self.reconciled && self.errors.is_empty()
    }

    /// User-facing summary with counts and the first few reasons
    pub fn summary(&self, reason_limit: usize) -> String {
        if !self.reconciled {
            let reason = self
                .errors
                .first()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown error".to_string());
            return format!("Save failed: {}", reason);
        }

        let added = self.diff.to_add.len();
        let failed_removals = self
            .errors
            .iter()
            .filter(|e| matches!(e, SaveError::RemoveMember { .. }))
            .count();
        let removed = self.diff.to_remove.len().saturating_sub(failed_removals);

        let mut message = format!(
            "Saved: {} added, {} removed, {} failed; group now has {} contacts",
            added,
            removed,
            failed_removals,
            self.baseline.len()
        );
        append_reasons(&mut message, self.errors.iter().map(ToString::to_string), reason_limit);
        message
    }
}

/// Append up to `limit` reasons to a summary line
pub(crate) fn append_reasons<I>(message: &mut String, reasons: I, limit: usize)
where
    I: ExactSizeIterator<Item = String>,
{
    let total = reasons.len();
    if total == 0 || limit == 0 {
        return;
    }
    let shown: Vec<String> = reasons.take(limit).collect();
    message.push_str("\n- ");
    message.push_str(&shown.join("\n- "));
    if total > shown.len() {
        message.push_str(&format!("\n...and {} more", total - shown.len()));
    }
}

/// Fresh authoritative read of a group's membership
pub async fn reconcile(store: &dyn GroupStore, group_id: &GroupId) -> Result<IdSet, ApiError> {
    let members = store.group_members(group_id).await?;
    Ok(members.into_iter().map(|c| c.id).collect())
}

/// Apply the difference between `baseline` and `selection` to a group
///
/// 1. one batched add for every id in `selection − baseline`; a failure
///    aborts everything and hands back the untouched baseline
/// 2. one remove call per id in `baseline − selection`, sequentially,
///    recording failures and carrying on
/// 3. re-read the membership; that read is the new baseline
pub async fn apply_save(
    store: &dyn GroupStore,
    group_id: &GroupId,
    baseline: &IdSet,
    selection: &IdSet,
) -> SaveOutcome {
    let diff = compute_diff(baseline, selection);
    let mut errors = Vec::new();

    if !diff.to_add.is_empty() {
        let ids: Vec<RecordId> = diff.to_add.iter().cloned().collect();
        if let Err(e) = store.add_members(group_id, &ids).await {
            tracing::error!("Adding {} contacts to group {} failed, aborting save: {}", ids.len(), group_id, e);
            return SaveOutcome {
                baseline: baseline.clone(),
                errors: vec![SaveError::AddMembers {
                    ids,
                    message: e.to_string(),
                }],
                reconciled: false,
                diff,
            };
        }
        tracing::info!("Added {} contacts to group {}", ids.len(), group_id);
    }

    for id in &diff.to_remove {
        if let Err(e) = store.remove_member(group_id, id).await {
            tracing::warn!("Removing contact {} from group {} failed: {}", id, group_id, e);
            errors.push(SaveError::RemoveMember {
                id: id.clone(),
                message: e.to_string(),
            });
        }
    }

    match reconcile(store, group_id).await {
        Ok(fresh) => {
            tracing::info!(
                "Group {} reconciled: {} members, {} removal failures",
                group_id,
                fresh.len(),
                errors.len()
            );
            SaveOutcome {
                baseline: fresh,
                errors,
                reconciled: true,
                diff,
            }
        }
        Err(e) => {
            tracing::error!("Re-reading membership of group {} failed: {}", group_id, e);
            errors.push(SaveError::Reconcile { message: e.to_string() });
            SaveOutcome {
                baseline: baseline.clone(),
                errors,
                reconciled: false,
                diff,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalize_all;

    fn outcome(errors: Vec<SaveError>, reconciled: bool) -> SaveOutcome {
        SaveOutcome {
            baseline: normalize_all([1, 2]),
            errors,
            reconciled,
            diff: MembershipDiff {
                to_add: normalize_all([2]),
                to_remove: normalize_all([3, 4]),
            },
        }
    }

    #[test]
    fn test_summary_survives_more_failures_than_planned_removals() {
        let errors = (3..6)
            .map(|id| SaveError::RemoveMember {
                id: RecordId::Int(id),
                message: "boom".to_string(),
            })
            .collect();
        let summary = outcome(errors, true).summary(1);
        assert!(summary.starts_with("Saved: 1 added, 0 removed, 3 failed"));
    }

    #[test]
    fn test_summary_counts_failed_removals() {
        let out = outcome(
            vec![SaveError::RemoveMember {
                id: RecordId::Int(3),
                message: "boom".to_string(),
            }],
            true,
        );
        let summary = out.summary(5);
        assert!(summary.starts_with("Saved: 1 added, 1 removed, 1 failed; group now has 2 contacts"));
        assert!(summary.contains("Failed to remove contact 3: boom"));
        assert!(!out.is_clean());
    }

    #[test]
    fn test_summary_on_abort() {
        let out = outcome(
            vec![SaveError::AddMembers {
                ids: vec![RecordId::Int(2)],
                message: "503".to_string(),
            }],
            false,
        );
        assert_eq!(out.summary(5), "Save failed: Failed to add 1 contact(s): 503");
    }

    #[test]
    fn test_append_reasons_truncates() {
        let mut message = "head".to_string();
        let reasons: Vec<String> = (1..=4).map(|i| format!("r{}", i)).collect();
        append_reasons(&mut message, reasons.into_iter(), 2);
        assert_eq!(message, "head\n- r1\n- r2\n...and 2 more");
    }
}
