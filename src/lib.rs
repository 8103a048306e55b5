//! Contact Sync - contact records, group membership and bulk import
//!
//! Manages a group's membership through a select/deselect session whose
//! baseline is always re-read from the group-membership service after a
//! save, and imports loosely formatted contact files row by row.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{compute_diff, parse_contacts, Importer, MembershipSession, SaveOutcome};
pub use models::{Contact, ContactDraft, ContactId, GroupId, IdSet, RecordId};
pub use services::{ApiClient, ApiError, ContactStore, GroupStore};
