use crate::core::diff::{compute_diff, sets_differ, MembershipDiff};
use crate::core::reconcile::{apply_save, reconcile, SaveError, SaveOutcome};
use crate::models::{ContactId, GroupId, IdSet, RecordId};
use crate::services::remote::{ApiError, GroupStore};
use std::fmt;
use thiserror::Error;

/// Lifecycle of a "manage membership" session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Baseline read, selection untouched
    Loaded,
    Editing,
    /// A save is in flight; edits and further saves are rejected
    Saving,
    /// Last save reconciled; selection equals baseline
    Confirmed,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Loaded => "loaded",
            SessionState::Editing => "editing",
            SessionState::Saving => "saving",
            SessionState::Confirmed => "confirmed",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations rejected by the session state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("A save is already in progress for this group")]
    SaveInProgress,

    #[error("Session is closed")]
    Closed,

    #[error("There are unsaved membership changes; confirm discarding them to close")]
    UnsavedChanges,

    #[error("No save is in progress")]
    NotSaving,
}

/// Snapshot taken when a save starts
#[derive(Debug, Clone)]
pub struct SaveTicket {
    pub group_id: GroupId,
    pub baseline: IdSet,
    pub selection: IdSet,
}

/// Editable membership selection for one group
///
/// Holds the last authoritatively read baseline next to the user's
/// selection. The baseline is only ever replaced by a reconciled
/// [`SaveOutcome`] or by [`MembershipSession::load`].
#[derive(Debug, Clone)]
pub struct MembershipSession {
    group_id: GroupId,
    baseline: IdSet,
    selection: IdSet,
    state: SessionState,
    last_errors: Vec<SaveError>,
}

impl MembershipSession {
    /// Start a session from a fresh membership read
    pub async fn load(store: &dyn GroupStore, group_id: GroupId) -> Result<Self, ApiError> {
        let baseline = reconcile(store, &group_id).await?;
        tracing::debug!("Opened membership session for group {} ({} members)", group_id, baseline.len());
        Ok(Self::from_baseline(group_id, baseline))
    }

    /// Start a session from an already confirmed baseline
    pub fn from_baseline(group_id: GroupId, baseline: IdSet) -> Self {
        Self {
            group_id,
            selection: baseline.clone(),
            baseline,
            state: SessionState::Loaded,
            last_errors: Vec::new(),
        }
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn baseline(&self) -> &IdSet {
        &self.baseline
    }

    pub fn selection(&self) -> &IdSet {
        &self.selection
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_errors(&self) -> &[SaveError] {
        &self.last_errors
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selection.contains(id)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        sets_differ(&self.baseline, &self.selection)
    }

    pub fn pending_diff(&self) -> MembershipDiff {
        compute_diff(&self.baseline, &self.selection)
    }

    fn begin_edit(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Saving => Err(SessionError::SaveInProgress),
            SessionState::Closed => Err(SessionError::Closed),
            _ => {
                self.state = SessionState::Editing;
                Ok(())
            }
        }
    }

    /// Flip one contact in or out of the selection
    ///
    /// Returns whether the contact is selected afterwards.
    pub fn toggle(&mut self, id: impl Into<ContactId>) -> Result<bool, SessionError> {
        self.begin_edit()?;
        let id = id.into();
        if self.selection.remove(&id) {
            Ok(false)
        } else {
            self.selection.insert(id);
            Ok(true)
        }
    }

    /// Add ids to the selection (used after creating contacts)
    pub fn include<I, T>(&mut self, ids: I) -> Result<usize, SessionError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ContactId>,
    {
        self.begin_edit()?;
        let before = self.selection.len();
        self.selection.extend(ids.into_iter().map(Into::into));
        Ok(self.selection.len() - before)
    }

    /// Select every id of the visible subset; ids outside it are untouched
    pub fn select_all<I, T>(&mut self, visible: I) -> Result<usize, SessionError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ContactId>,
    {
        self.include(visible)
    }

    /// Deselect every id of the visible subset; ids outside it are untouched
    pub fn select_none<I, T>(&mut self, visible: I) -> Result<usize, SessionError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ContactId>,
    {
        self.begin_edit()?;
        let before = self.selection.len();
        for id in visible {
            self.selection.remove(&id.into());
        }
        Ok(before - self.selection.len())
    }

    /// Enter the Saving state and snapshot what needs saving
    pub fn begin_save(&mut self) -> Result<SaveTicket, SessionError> {
        match self.state {
            SessionState::Saving => return Err(SessionError::SaveInProgress),
            SessionState::Closed => return Err(SessionError::Closed),
            _ => {}
        }
        self.state = SessionState::Saving;
        Ok(SaveTicket {
            group_id: self.group_id.clone(),
            baseline: self.baseline.clone(),
            selection: self.selection.clone(),
        })
    }

    /// Leave the Saving state with the outcome of [`apply_save`]
    ///
    /// A reconciled outcome replaces both baseline and selection. Anything
    /// else keeps the selection as the user left it.
    pub fn finish_save(&mut self, outcome: &SaveOutcome) -> Result<(), SessionError> {
        if self.state != SessionState::Saving {
            return Err(SessionError::NotSaving);
        }
        self.last_errors = outcome.errors.clone();
        if outcome.reconciled {
            self.baseline = outcome.baseline.clone();
            self.selection = outcome.baseline.clone();
            self.state = SessionState::Confirmed;
        } else {
            self.state = SessionState::Editing;
        }
        Ok(())
    }

    /// Run a complete save against the group store
    pub async fn save(&mut self, store: &dyn GroupStore) -> Result<SaveOutcome, SessionError> {
        let ticket = self.begin_save()?;
        let outcome = apply_save(store, &ticket.group_id, &ticket.baseline, &ticket.selection).await;
        self.finish_save(&outcome)?;
        Ok(outcome)
    }

    /// Close the session
    ///
    /// Unsaved changes are only dropped when `discard` is set.
    pub fn close(&mut self, discard: bool) -> Result<(), SessionError> {
        match self.state {
            SessionState::Closed => return Err(SessionError::Closed),
            SessionState::Saving => return Err(SessionError::SaveInProgress),
            _ => {}
        }
        if self.has_unsaved_changes() && !discard {
            return Err(SessionError::UnsavedChanges);
        }
        self.state = SessionState::Closed;
        Ok(())
    }
}
