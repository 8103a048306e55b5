use crate::models::{Contact, ContactDraft, ContactFilter, ContactId, ContactPatch, Group, GroupDraft, GroupId};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the record-storage API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ApiError::Api {
            status,
            message: message.into(),
        }
    }
}

/// Contact records collaborator
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn create_contact(&self, draft: &ContactDraft) -> Result<Contact, ApiError>;
    async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, ApiError>;
    async fn get_contact(&self, id: &ContactId) -> Result<Contact, ApiError>;
    async fn update_contact(&self, id: &ContactId, patch: &ContactPatch) -> Result<Contact, ApiError>;
    async fn delete_contact(&self, id: &ContactId) -> Result<(), ApiError>;
}

/// Group and group-membership collaborator
///
/// `group_members` is the authoritative membership read; nothing else in
/// the crate is allowed to decide what a group contains.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>, ApiError>;
    async fn get_group(&self, id: &GroupId) -> Result<Group, ApiError>;
    async fn create_group(&self, draft: &GroupDraft) -> Result<Group, ApiError>;
    async fn update_group(&self, id: &GroupId, draft: &GroupDraft) -> Result<Group, ApiError>;
    async fn delete_group(&self, id: &GroupId) -> Result<(), ApiError>;
    async fn group_members(&self, id: &GroupId) -> Result<Vec<Contact>, ApiError>;
    async fn add_members(&self, id: &GroupId, contact_ids: &[ContactId]) -> Result<(), ApiError>;
    async fn remove_member(&self, id: &GroupId, contact_id: &ContactId) -> Result<(), ApiError>;
}

/// Collection paths on the remote API
#[derive(Debug, Clone)]
pub struct ApiPaths {
    pub contacts: String,
    pub groups: String,
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            contacts: "contacts".to_string(),
            groups: "groups".to_string(),
        }
    }
}

/// Ways of phrasing a group delete, tried in this order
///
/// The group delete endpoint insists on a `search` parameter carrying the
/// id, and which encoding it accepts has varied between deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteEncoding {
    PathOnly,
    QueryString,
    JsonBody,
    FormBody,
}

impl DeleteEncoding {
    pub const FALLBACK_ORDER: [DeleteEncoding; 4] = [
        DeleteEncoding::PathOnly,
        DeleteEncoding::QueryString,
        DeleteEncoding::JsonBody,
        DeleteEncoding::FormBody,
    ];
}

/// Record-storage API client
///
/// Implements both collaborators over one connection pool:
/// - contacts: create, list/search, get, update, delete
/// - groups: CRUD plus membership read, batch add and single remove
pub struct ApiClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    paths: ApiPaths,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
        paths: ApiPaths,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
            paths,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment.trim_matches('/'));
        }
        url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> Result<Response, ApiError> {
        let response = self.authorized(builder).send().await?;
        check_status(response, context).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, context: &str) -> Result<T, ApiError> {
        let response = self.send(builder, context).await?;
        let json: Value = response.json().await?;
        let data = unwrap_envelope(json);
        serde_json::from_value(data)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", context, e)))
    }

    async fn send_list<T: DeserializeOwned>(&self, builder: RequestBuilder, context: &str) -> Result<Vec<T>, ApiError> {
        let response = self.send(builder, context).await?;
        let json: Value = response.json().await?;
        let items = extract_list(json)
            .ok_or_else(|| ApiError::InvalidResponse(format!("Missing list in {} response", context)))?;

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value(item) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Dropping malformed record in {}: {}", context, e),
            }
        }
        Ok(records)
    }

    async fn attempt_delete_group(&self, id: &GroupId, encoding: DeleteEncoding) -> Result<(), ApiError> {
        let url = self.url(&[&self.paths.groups, &id.to_path_segment()]);
        let search = id.to_string();
        let builder = match encoding {
            DeleteEncoding::PathOnly => self.client.delete(&url),
            DeleteEncoding::QueryString => self.client.delete(&url).query(&[("search", search.as_str())]),
            DeleteEncoding::JsonBody => self.client.delete(&url).json(&json!({ "search": id })),
            DeleteEncoding::FormBody => self.client.delete(&url).form(&[("search", search.as_str())]),
        };
        self.send(builder, "delete group").await.map(|_| ())
    }
}

#[async_trait]
impl ContactStore for ApiClient {
    async fn create_contact(&self, draft: &ContactDraft) -> Result<Contact, ApiError> {
        let url = self.url(&[&self.paths.contacts]);
        tracing::debug!("Creating contact {} via {}", draft.email, url);
        self.send_json(self.client.post(&url).json(draft), "create contact").await
    }

    async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, ApiError> {
        let url = self.url(&[&self.paths.contacts]);
        let pairs = filter.to_query_pairs();
        tracing::debug!("Listing contacts from {} with {:?}", url, pairs);
        self.send_list(self.client.get(&url).query(&pairs), "list contacts").await
    }

    async fn get_contact(&self, id: &ContactId) -> Result<Contact, ApiError> {
        let url = self.url(&[&self.paths.contacts, &id.to_path_segment()]);
        self.send_json(self.client.get(&url), "get contact").await
    }

    async fn update_contact(&self, id: &ContactId, patch: &ContactPatch) -> Result<Contact, ApiError> {
        let url = self.url(&[&self.paths.contacts, &id.to_path_segment()]);
        self.send_json(self.client.patch(&url).json(patch), "update contact").await
    }

    async fn delete_contact(&self, id: &ContactId) -> Result<(), ApiError> {
        let url = self.url(&[&self.paths.contacts, &id.to_path_segment()]);
        self.send(self.client.delete(&url), "delete contact").await.map(|_| ())
    }
}

#[async_trait]
impl GroupStore for ApiClient {
    async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        let url = self.url(&[&self.paths.groups]);
        self.send_list(self.client.get(&url), "list groups").await
    }

    async fn get_group(&self, id: &GroupId) -> Result<Group, ApiError> {
        let url = self.url(&[&self.paths.groups, &id.to_path_segment()]);
        self.send_json(self.client.get(&url), "get group").await
    }

    async fn create_group(&self, draft: &GroupDraft) -> Result<Group, ApiError> {
        let url = self.url(&[&self.paths.groups]);
        self.send_json(self.client.post(&url).json(draft), "create group").await
    }

    async fn update_group(&self, id: &GroupId, draft: &GroupDraft) -> Result<Group, ApiError> {
        let url = self.url(&[&self.paths.groups, &id.to_path_segment()]);
        self.send_json(self.client.patch(&url).json(draft), "update group").await
    }

    /// Delete a group, trying each [`DeleteEncoding`] in turn
    ///
    /// This is the only operation that repeats a request. It stops at the
    /// first success and reports the last failure if none succeed.
    async fn delete_group(&self, id: &GroupId) -> Result<(), ApiError> {
        let mut last_error = None;
        for encoding in DeleteEncoding::FALLBACK_ORDER {
            match self.attempt_delete_group(id, encoding).await {
                Ok(()) => {
                    tracing::info!("Deleted group {} using {:?} encoding", id, encoding);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Group delete for {} with {:?} encoding failed: {}", id, encoding, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ApiError::InvalidResponse("no delete encoding attempted".into())))
    }

    async fn group_members(&self, id: &GroupId) -> Result<Vec<Contact>, ApiError> {
        let url = self.url(&[&self.paths.groups, &id.to_path_segment(), &self.paths.contacts]);
        tracing::debug!("Reading membership of group {} from {}", id, url);
        self.send_list(self.client.get(&url), "group members").await
    }

    async fn add_members(&self, id: &GroupId, contact_ids: &[ContactId]) -> Result<(), ApiError> {
        let url = self.url(&[&self.paths.groups, &id.to_path_segment(), &self.paths.contacts]);
        let body = json!({ "contact_ids": contact_ids });
        self.send(self.client.post(&url).json(&body), "add members").await.map(|_| ())
    }

    async fn remove_member(&self, id: &GroupId, contact_id: &ContactId) -> Result<(), ApiError> {
        let url = self.url(&[
            &self.paths.groups,
            &id.to_path_segment(),
            &self.paths.contacts,
            &contact_id.to_path_segment(),
        ]);
        self.send(self.client.delete(&url), "remove member").await.map(|_| ())
    }
}

async fn check_status(response: Response, context: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    tracing::error!("Failed to {}: {} - {}", context, status, message);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(format!("{}: {}", context, message)),
        _ => ApiError::api(status.as_u16(), message),
    })
}

/// Best human-readable message from an error body
fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        for key in ["message", "error", "detail"] {
            if let Some(msg) = json.get(key).and_then(Value::as_str) {
                return Some(msg.to_string());
            }
        }
    }
    Some(trimmed.to_string())
}

/// Single records sometimes come back wrapped in `{"data": {...}}`
fn unwrap_envelope(json: Value) -> Value {
    match json {
        Value::Object(mut map) if map.len() == 1 && map.get("data").map_or(false, Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Lists come back bare or under one of a few keys
fn extract_list(json: Value) -> Option<Vec<Value>> {
    match json {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ["items", "contacts", "groups", "data", "documents"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_creation() {
        let client = ApiClient::new(
            "https://records.test/api/".to_string(),
            Some(String::new()),
            Duration::from_secs(5),
            ApiPaths::default(),
        )
        .unwrap();

        assert_eq!(client.base_url(), "https://records.test/api");
        assert!(client.api_key.is_none());
        assert_eq!(client.url(&["groups", "4", "contacts"]), "https://records.test/api/groups/4/contacts");
    }

    #[test]
    fn test_extract_list_shapes() {
        assert_eq!(extract_list(json!([1, 2])).unwrap().len(), 2);
        assert_eq!(extract_list(json!({"items": [1]})).unwrap().len(), 1);
        assert_eq!(extract_list(json!({"contacts": [1, 2, 3]})).unwrap().len(), 3);
        assert!(extract_list(json!({"total": 0})).is_none());
    }

    #[test]
    fn test_server_message_prefers_json_message() {
        assert_eq!(server_message(r#"{"message":"Missing param: search"}"#).unwrap(), "Missing param: search");
        assert_eq!(server_message("plain text").unwrap(), "plain text");
        assert!(server_message("  ").is_none());
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({"data": {"id": 1}})), json!({"id": 1}));
        assert_eq!(unwrap_envelope(json!({"id": 1, "data": {}})), json!({"id": 1, "data": {}}));
    }
}
