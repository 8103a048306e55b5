// HTTP-level tests for the record-storage client

use contact_sync::models::{ContactDraft, ContactFilter, ContactStatus, IdSet, RecordId};
use contact_sync::services::{ApiClient, ApiError, ApiPaths, ContactStore, GroupStore};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn client(server: &Server) -> ApiClient {
    ApiClient::new(server.url(), Some("test-key".to_string()), Duration::from_secs(5), ApiPaths::default())
        .expect("client builds")
}

#[tokio::test]
async fn test_create_contact_unwraps_envelope() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/contacts")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({"email": "ann@x.com", "member_type": "non-member"})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": {"id": "12", "email": "ann@x.com", "first_name": "Ann", "last_name": null}}).to_string())
        .create_async()
        .await;

    let created = client(&server)
        .create_contact(&ContactDraft::new("ann@x.com").with_name("Ann", ""))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, RecordId::Int(12));
    assert_eq!(created.first_name, "Ann");
    assert_eq!(created.last_name, "");
    assert_eq!(created.status, ContactStatus::Subscribed);
}

#[tokio::test]
async fn test_group_members_normalizes_ids_and_drops_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/groups/5/contacts")
        .with_header("content-type", "application/json")
        .with_body(
            json!({"contacts": [
                {"id": 1, "email": "a@x.com"},
                {"id": "2", "email": "b@x.com"},
                {"email": "no-id@x.com"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let members = client(&server).group_members(&RecordId::Int(5)).await.unwrap();
    let ids: IdSet = members.into_iter().map(|c| c.id).collect();
    assert_eq!(ids, [RecordId::Int(1), RecordId::Int(2)].into_iter().collect());
}

#[tokio::test]
async fn test_list_contacts_sends_filters() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/contacts")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("status".into(), "bounced".into()),
            Matcher::UrlEncoded("search".into(), "lee".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(json!([{"id": 3, "email": "lee@x.com", "status": "bounced"}]).to_string())
        .create_async()
        .await;

    let filter = ContactFilter {
        status: Some(ContactStatus::Bounced),
        search: Some("lee".to_string()),
        ..Default::default()
    };
    let contacts = client(&server).list_contacts(&filter).await.unwrap();

    mock.assert_async().await;
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].status, ContactStatus::Bounced);
}

#[tokio::test]
async fn test_add_members_posts_id_batch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/groups/5/contacts")
        .match_body(Matcher::Json(json!({"contact_ids": [3, "abc"]})))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    client(&server)
        .add_members(&RecordId::Int(5), &[RecordId::Int(3), RecordId::Text("abc".into())])
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_remove_member_maps_server_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", "/groups/5/contacts/9")
        .with_status(500)
        .with_body(json!({"error": "constraint violation"}).to_string())
        .create_async()
        .await;

    let err = client(&server)
        .remove_member(&RecordId::Int(5), &RecordId::Int(9))
        .await
        .unwrap_err();
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "constraint violation");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_and_not_found() {
    let mut server = Server::new_async().await;
    let _denied = server
        .mock("GET", "/groups")
        .with_status(401)
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/contacts/77")
        .with_status(404)
        .with_body("no such contact")
        .create_async()
        .await;

    let api = client(&server);
    assert!(matches!(api.list_groups().await, Err(ApiError::Unauthorized)));
    assert!(matches!(api.get_contact(&RecordId::Int(77)).await, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_group_falls_back_through_encodings() {
    let mut server = Server::new_async().await;
    let path_only = server
        .mock("DELETE", "/groups/5")
        .match_body(Matcher::Exact(String::new()))
        .with_status(400)
        .with_body(json!({"message": "Missing param: search"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let query = server
        .mock("DELETE", "/groups/5?search=5")
        .with_status(400)
        .with_body(json!({"message": "Missing param: search"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let json_body = server
        .mock("DELETE", "/groups/5")
        .match_body(Matcher::Json(json!({"search": 5})))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let form = server
        .mock("DELETE", "/groups/5")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::Exact("search=5".to_string()))
        .with_status(204)
        .expect(0)
        .create_async()
        .await;

    client(&server).delete_group(&RecordId::Int(5)).await.unwrap();

    path_only.assert_async().await;
    query.assert_async().await;
    json_body.assert_async().await;
    form.assert_async().await;
}

#[tokio::test]
async fn test_delete_group_reports_last_failure() {
    let mut server = Server::new_async().await;
    let _path_only = server
        .mock("DELETE", "/groups/5")
        .match_body(Matcher::Exact(String::new()))
        .with_status(400)
        .create_async()
        .await;
    let _query = server
        .mock("DELETE", "/groups/5?search=5")
        .with_status(400)
        .create_async()
        .await;
    let _json_body = server
        .mock("DELETE", "/groups/5")
        .match_body(Matcher::Json(json!({"search": 5})))
        .with_status(400)
        .create_async()
        .await;
    let _form = server
        .mock("DELETE", "/groups/5")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::Exact("search=5".to_string()))
        .with_status(500)
        .with_body(json!({"message": "form rejected"}).to_string())
        .create_async()
        .await;

    let err = client(&server).delete_group(&RecordId::Int(5)).await.unwrap_err();
    assert_eq!(err.to_string(), "API returned 500: form rejected");
}
