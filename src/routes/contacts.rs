use super::{csv_attachment, error_body, export_error, parse_id, upstream_error, validation_error, AppState};
use crate::core::{bulk_delete_contacts, bulk_update_status, delete_contact, export_csv, filter_visible, Importer};
use crate::models::{BulkIdsRequest, BulkStatusRequest, ContactDraft, ContactFilter, ContactPatch, CreateContactRequest, ImportQuery, ImportResponse};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Configure contact routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/contacts", web::get().to(list_contacts))
        .route("/contacts", web::post().to(create_contact))
        .route("/contacts/export", web::get().to(export_contacts))
        .route("/contacts/import", web::post().to(import_contacts))
        .route("/contacts/bulk-delete", web::post().to(bulk_delete))
        .route("/contacts/bulk-status", web::post().to(bulk_status))
        .route("/contacts/{id}", web::get().to(get_contact))
        .route("/contacts/{id}", web::patch().to(update_contact))
        .route("/contacts/{id}", web::delete().to(remove_contact));
}

/// List contacts
///
/// GET /api/v1/contacts?status=&member_type=&group_id=&search=
async fn list_contacts(state: web::Data<AppState>, query: web::Query<ContactFilter>) -> impl Responder {
    let filter = query.into_inner();
    match state.contacts.list_contacts(&filter).await {
        Ok(contacts) => {
            let term = filter.search.as_deref().unwrap_or_default();
            let visible: Vec<_> = filter_visible(&contacts, term).into_iter().cloned().collect();
            HttpResponse::Ok().json(visible)
        }
        Err(e) => upstream_error("Failed to list contacts", &e),
    }
}

/// Create a single contact
///
/// POST /api/v1/contacts
async fn create_contact(state: web::Data<AppState>, req: web::Json<CreateContactRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }
    let draft = ContactDraft::from(req.into_inner());
    match state.contacts.create_contact(&draft).await {
        Ok(contact) => {
            tracing::info!("Created contact {} ({})", contact.id, contact.display_name());
            HttpResponse::Created().json(contact)
        }
        Err(e) => upstream_error("Failed to create contact", &e),
    }
}

async fn get_contact(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.contacts.get_contact(&parse_id(&path)).await {
        Ok(contact) => HttpResponse::Ok().json(contact),
        Err(e) => upstream_error("Failed to fetch contact", &e),
    }
}

/// PATCH /api/v1/contacts/{id}
async fn update_contact(
    state: web::Data<AppState>,
    path: web::Path<String>,
    patch: web::Json<ContactPatch>,
) -> impl Responder {
    if patch.is_empty() {
        return HttpResponse::BadRequest().json(error_body("Empty update", "No fields to update", 400));
    }
    let id = parse_id(&path);
    match state.contacts.update_contact(&id, &patch).await {
        Ok(contact) => HttpResponse::Ok().json(contact),
        Err(e) => upstream_error("Failed to update contact", &e),
    }
}

/// Delete a contact and detach it from its groups
///
/// DELETE /api/v1/contacts/{id}
async fn remove_contact(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = parse_id(&path);
    match delete_contact(state.contacts.as_ref(), state.groups.as_ref(), &id).await {
        Ok(detached) => HttpResponse::Ok().json(serde_json::json!({
            "deleted": true,
            "contactId": id,
            "detached": detached,
            "message": detached.summary("Detached from groups", state.reason_limit),
        })),
        Err(e) => upstream_error("Failed to delete contact", &e),
    }
}

/// POST /api/v1/contacts/bulk-delete
async fn bulk_delete(state: web::Data<AppState>, req: web::Json<BulkIdsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }
    let report = bulk_delete_contacts(state.contacts.as_ref(), state.groups.as_ref(), &req.contact_ids).await;
    HttpResponse::Ok().json(serde_json::json!({
        "report": report,
        "message": report.summary("Deleted contacts", state.reason_limit),
    }))
}

/// POST /api/v1/contacts/bulk-status
async fn bulk_status(state: web::Data<AppState>, req: web::Json<BulkStatusRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }
    let report = bulk_update_status(state.contacts.as_ref(), &req.contact_ids, req.status).await;
    HttpResponse::Ok().json(serde_json::json!({
        "report": report,
        "message": report.summary("Updated status", state.reason_limit),
    }))
}

/// Export filtered contacts as CSV
///
/// GET /api/v1/contacts/export
async fn export_contacts(state: web::Data<AppState>, query: web::Query<ContactFilter>) -> impl Responder {
    match state.contacts.list_contacts(&query).await {
        Ok(contacts) => match export_csv(&contacts) {
            Ok(csv) => {
                let filename = format!("contacts_{}.csv", chrono::Utc::now().format("%Y-%m-%d"));
                csv_attachment(&filename, csv)
            }
            Err(e) => export_error("Failed to export contacts", &e),
        },
        Err(e) => upstream_error("Failed to export contacts", &e),
    }
}

/// Bulk import from raw tabular text
///
/// POST /api/v1/contacts/import?group_id={id}
///
/// The request body is the file content (header row plus data rows).
async fn import_contacts(state: web::Data<AppState>, query: web::Query<ImportQuery>, body: String) -> impl Responder {
    let importer = Importer::new(state.contacts.as_ref(), state.groups.as_ref());
    let report = importer.run(&body, None, query.group_id.as_ref()).await;

    HttpResponse::Ok().json(ImportResponse {
        summary: report.summary(state.reason_limit),
        membership_errors: report.membership_errors(),
        imported: report.imported,
        skipped: report.skipped,
    })
}
