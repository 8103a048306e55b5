use crate::models::domain::{ContactDraft, ContactStatus, GroupDraft, MemberType};
use crate::models::ids::{ContactId, GroupId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a contact
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    #[serde(default, alias = "memberType")]
    pub member_type: MemberType,
    #[serde(default)]
    pub status: ContactStatus,
}

impl From<CreateContactRequest> for ContactDraft {
    fn from(req: CreateContactRequest) -> Self {
        ContactDraft {
            email: req.email.trim().to_string(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            member_type: req.member_type,
            status: req.status,
        }
    }
}

/// Request to create or rename a group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroupRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl From<GroupRequest> for GroupDraft {
    fn from(req: GroupRequest) -> Self {
        GroupDraft {
            name: req.name.trim().to_string(),
            description: req.description.trim().to_string(),
        }
    }
}

/// Bulk operation over a list of contact ids
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkIdsRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "contactIds")]
    pub contact_ids: Vec<ContactId>,
}

/// Bulk status change
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkStatusRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "contactIds")]
    pub contact_ids: Vec<ContactId>,
    pub status: ContactStatus,
}

/// Toggle one contact in a membership session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleRequest {
    #[serde(alias = "contactId")]
    pub contact_id: ContactId,
}

/// Select-all / select-none scope
///
/// Only contacts matching the filter (the visible subset) are touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeRequest {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ContactStatus>,
    #[serde(default, alias = "memberType")]
    pub member_type: Option<MemberType>,
}

/// Query parameters for imports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportQuery {
    #[serde(default, alias = "groupId")]
    pub group_id: Option<GroupId>,
}

/// Query parameters for closing a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseQuery {
    #[serde(default)]
    pub discard: bool,
}
