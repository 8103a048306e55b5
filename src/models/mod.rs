// Model exports
pub mod domain;
pub mod ids;
pub mod requests;
pub mod responses;

pub use domain::{Contact, ContactDraft, ContactFilter, ContactPatch, ContactStatus, Group, GroupDraft, GroupStats, MemberType, SkipRecord};
pub use ids::{normalize_all, ContactId, GroupId, IdSet, RecordId};
pub use requests::{BulkIdsRequest, BulkStatusRequest, CloseQuery, CreateContactRequest, GroupRequest, ImportQuery, ScopeRequest, ToggleRequest};
pub use responses::{ErrorResponse, HealthResponse, ImportResponse, SaveResponse, SessionResponse};
