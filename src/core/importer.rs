use crate::core::ingest::parse_contacts;
use crate::core::reconcile::{append_reasons, apply_save, reconcile, SaveError, SaveOutcome};
use crate::core::session::{MembershipSession, SessionError};
use crate::core::diff::MembershipDiff;
use crate::models::{Contact, ContactDraft, ContactId, GroupId, IdSet, SkipRecord};
use crate::services::remote::{ApiError, ContactStore, GroupStore};

/// Default number of skip reasons quoted in a summary
pub const DEFAULT_REASON_LIMIT: usize = 5;

/// Outcome of a bulk import
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: Vec<Contact>,
    pub skipped: Vec<SkipRecord>,
    /// Group attachment result, kept apart from row-level skips
    pub membership: Option<SaveOutcome>,
    /// Set when the session refused the new ids
    pub session_error: Option<SessionError>,
}

impl ImportReport {
    pub fn imported_ids(&self) -> IdSet {
        self.imported.iter().map(|c| c.id.clone()).collect()
    }

    pub fn membership_errors(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .membership
            .iter()
            .flat_map(|m| m.errors.iter().map(ToString::to_string))
            .collect();
        if let Some(e) = &self.session_error {
            errors.push(e.to_string());
        }
        errors
    }

    /// Human-readable summary, quoting at most `reason_limit` skip reasons
    pub fn summary(&self, reason_limit: usize) -> String {
        let mut message = format!(
            "Imported {} contacts, skipped {} rows",
            self.imported.len(),
            self.skipped.len()
        );
        append_reasons(&mut message, self.skipped.iter().map(ToString::to_string), reason_limit);

        if let Some(outcome) = &self.membership {
            message.push('\n');
            message.push_str(&outcome.summary(reason_limit));
        }
        if let Some(e) = &self.session_error {
            message.push_str(&format!("\nSelection not updated: {}", e));
        }
        message
    }
}

/// Drives parsing, contact creation and group attachment
///
/// Rows are created strictly one after another so that every skip record
/// maps to exactly one source row and the record store never sees a burst.
pub struct Importer<'a> {
    contacts: &'a dyn ContactStore,
    groups: &'a dyn GroupStore,
}

impl<'a> Importer<'a> {
    pub fn new(contacts: &'a dyn ContactStore, groups: &'a dyn GroupStore) -> Self {
        Self { contacts, groups }
    }

    /// Import `raw` text
    ///
    /// New ids are added to `session`'s selection when one is given. With a
    /// `target` group the new contacts are attached through a full save:
    /// via the session when it manages that group, otherwise against a
    /// freshly read baseline. A session that refuses the new ids leaves its
    /// group untouched.
    pub async fn run(
        &self,
        raw: &str,
        mut session: Option<&mut MembershipSession>,
        target: Option<&GroupId>,
    ) -> ImportReport {
        let parsed = parse_contacts(raw);
        let mut report = ImportReport {
            skipped: parsed.skipped,
            ..Default::default()
        };

        for row in parsed.contacts {
            match self.contacts.create_contact(&row.draft).await {
                Ok(contact) => report.imported.push(contact),
                Err(e) => {
                    tracing::warn!("Import row {} ({}) failed: {}", row.row, row.draft.email, e);
                    report.skipped.push(SkipRecord::new(row.row, e.to_string()));
                }
            }
        }
        report.skipped.sort_by_key(|s| s.row);

        tracing::info!(
            "Import created {} contacts, skipped {} rows",
            report.imported.len(),
            report.skipped.len()
        );

        let new_ids = report.imported_ids();
        if new_ids.is_empty() {
            return report;
        }

        if let Some(session) = session.as_deref_mut() {
            if let Err(e) = session.include(new_ids.iter().cloned()) {
                tracing::warn!("Could not add imported contacts to the selection: {}", e);
                report.session_error = Some(e);
            }
        }

        let Some(target) = target else {
            return report;
        };

        report.membership = match session {
            Some(session) if session.group_id() == target => {
                if report.session_error.is_some() {
                    // The session owns this group's membership; leave it alone.
                    return report;
                }
                match session.save(self.groups).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        report.session_error = Some(e);
                        None
                    }
                }
            }
            _ => Some(self.attach_to_group(target, &new_ids).await),
        };

        report
    }

    async fn attach_to_group(&self, group_id: &GroupId, new_ids: &IdSet) -> SaveOutcome {
        let baseline = match reconcile(self.groups, group_id).await {
            Ok(baseline) => baseline,
            Err(e) => {
                tracing::error!("Could not read group {} before attaching imports: {}", group_id, e);
                return SaveOutcome {
                    baseline: IdSet::new(),
                    errors: vec![SaveError::Reconcile { message: e.to_string() }],
                    reconciled: false,
                    diff: MembershipDiff::default(),
                };
            }
        };
        let selection: IdSet = baseline.union(new_ids).cloned().collect();
        apply_save(self.groups, group_id, &baseline, &selection).await
    }

    /// Create one contact by hand and select it
    ///
    /// The id only enters the selection once the record store has assigned
    /// it.
    pub async fn create_and_select(
        &self,
        draft: &ContactDraft,
        session: &mut MembershipSession,
    ) -> Result<(Contact, Result<bool, SessionError>), ApiError> {
        let contact = self.contacts.create_contact(draft).await?;
        let id: ContactId = contact.id.clone();
        let selected = session.include([id]).map(|added| added > 0);
        Ok((contact, selected))
    }
}
