//! Contact and group lifecycle operations that span both collaborators
//!
//! Everything here is sequential and best-effort per item: each call's
//! outcome is counted and the first few reasons are kept for the user.

use crate::core::reconcile::append_reasons;
use crate::models::{Contact, ContactId, ContactPatch, ContactStatus, GroupId, GroupStats, MemberType};
use crate::services::remote::{ApiError, ContactStore, GroupStore};
use serde::Serialize;

/// Per-item tally of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BulkReport {
    fn record(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(e);
            }
        }
    }

    pub fn summary(&self, action: &str, reason_limit: usize) -> String {
        let mut message = format!("{}: {} succeeded, {} failed", action, self.succeeded, self.failed);
        append_reasons(&mut message, self.errors.iter().cloned(), reason_limit);
        message
    }
}

/// Delete a contact after detaching it from every group that holds it
///
/// Group membership is checked against each group's authoritative read.
/// The returned report covers the detach calls; a failure there does not
/// stop the contact delete, whose own error is returned as `Err`.
pub async fn delete_contact(
    contacts: &dyn ContactStore,
    groups: &dyn GroupStore,
    id: &ContactId,
) -> Result<BulkReport, ApiError> {
    let mut detached = BulkReport::default();

    for group in groups.list_groups().await? {
        let members = match groups.group_members(&group.id).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!("Could not read group {} while deleting contact {}: {}", group.id, id, e);
                detached.record(Err(format!("Group {}: {}", group.id, e)));
                continue;
            }
        };
        if !members.iter().any(|c| &c.id == id) {
            continue;
        }
        let result = groups
            .remove_member(&group.id, id)
            .await
            .map_err(|e| format!("Group {}: {}", group.id, e));
        if let Err(e) = &result {
            tracing::warn!("Could not detach contact {} from group {}: {}", id, group.id, e);
        }
        detached.record(result);
    }

    contacts.delete_contact(id).await?;
    tracing::info!("Deleted contact {} (detached from {} groups)", id, detached.succeeded);
    Ok(detached)
}

/// Delete a group, draining its membership first
pub async fn delete_group(groups: &dyn GroupStore, id: &GroupId) -> Result<BulkReport, ApiError> {
    let mut drained = BulkReport::default();

    match groups.group_members(id).await {
        Ok(members) => {
            tracing::info!("Removing {} contacts from group {} before deletion", members.len(), id);
            for member in members {
                let result = groups
                    .remove_member(id, &member.id)
                    .await
                    .map_err(|e| format!("Contact {}: {}", member.id, e));
                drained.record(result);
            }
        }
        Err(e) => tracing::warn!("Could not read members of group {} before deletion: {}", id, e),
    }

    groups.delete_group(id).await?;
    Ok(drained)
}

/// Delete several contacts, one at a time
pub async fn bulk_delete_contacts(
    contacts: &dyn ContactStore,
    groups: &dyn GroupStore,
    ids: &[ContactId],
) -> BulkReport {
    let mut report = BulkReport::default();
    for id in ids {
        let result = delete_contact(contacts, groups, id)
            .await
            .map(|_| ())
            .map_err(|e| format!("Contact {}: {}", id, e));
        report.record(result);
    }
    tracing::info!("Bulk delete: {} succeeded, {} failed", report.succeeded, report.failed);
    report
}

/// Set the subscription status of several contacts, one at a time
pub async fn bulk_update_status(
    contacts: &dyn ContactStore,
    ids: &[ContactId],
    status: ContactStatus,
) -> BulkReport {
    let patch = ContactPatch::status(status);
    let mut report = BulkReport::default();
    for id in ids {
        let result = contacts
            .update_contact(id, &patch)
            .await
            .map(|_| ())
            .map_err(|e| format!("Contact {}: {}", id, e));
        report.record(result);
    }
    tracing::info!(
        "Bulk status change to {}: {} succeeded, {} failed",
        status,
        report.succeeded,
        report.failed
    );
    report
}

/// Membership breakdown of a list of contacts
pub fn stats_for(contacts: &[Contact]) -> GroupStats {
    let mut stats = GroupStats {
        total: contacts.len(),
        ..Default::default()
    };
    for contact in contacts {
        match contact.status {
            ContactStatus::Subscribed => stats.subscribed += 1,
            ContactStatus::Unsubscribed => stats.unsubscribed += 1,
            ContactStatus::Bounced => stats.bounced += 1,
        }
        match contact.member_type {
            MemberType::Member => stats.members += 1,
            MemberType::NonMember => stats.non_members += 1,
        }
    }
    stats
}

/// Statistics over a group's authoritative membership
pub async fn group_stats(groups: &dyn GroupStore, id: &GroupId) -> Result<GroupStats, ApiError> {
    let members = groups.group_members(id).await?;
    Ok(stats_for(&members))
}

/// Contacts matching a free-text search on email or name
///
/// Case-insensitive substring match; an empty term matches everything.
pub fn filter_visible<'a>(contacts: &'a [Contact], term: &str) -> Vec<&'a Contact> {
    let needle = term.trim().to_lowercase();
    contacts
        .iter()
        .filter(|c| {
            needle.is_empty()
                || c.email.to_lowercase().contains(&needle)
                || c.first_name.to_lowercase().contains(&needle)
                || c.last_name.to_lowercase().contains(&needle)
        })
        .collect()
}
