use crate::models::domain::Contact;
use crate::models::ids::{ContactId, GroupId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Membership session snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub group_id: GroupId,
    pub state: String,
    pub baseline: Vec<ContactId>,
    pub selection: Vec<ContactId>,
    pub has_unsaved_changes: bool,
    pub pending_additions: usize,
    pub pending_removals: usize,
    pub last_errors: Vec<String>,
}

/// Result of a save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub saved: bool,
    pub message: String,
    pub session: SessionResponse,
}

/// Result of an import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: Vec<Contact>,
    pub skipped: Vec<crate::models::domain::SkipRecord>,
    pub membership_errors: Vec<String>,
    pub summary: String,
}
