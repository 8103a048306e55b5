use super::{error_body, session_error, snapshot, upstream_error, validation_error, AppState};
use crate::core::{apply_save, filter_visible, Importer};
use crate::models::{
    CloseQuery, ContactDraft, ContactFilter, ContactId, CreateContactRequest, ImportResponse, SaveResponse,
    ScopeRequest, ToggleRequest,
};
use crate::services::SharedSession;
use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Configure membership session routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/sessions/{sid}", web::get().to(get_session))
        .route("/sessions/{sid}", web::delete().to(close_session))
        .route("/sessions/{sid}/toggle", web::post().to(toggle))
        .route("/sessions/{sid}/select-all", web::post().to(select_all))
        .route("/sessions/{sid}/select-none", web::post().to(select_none))
        .route("/sessions/{sid}/contacts", web::post().to(add_contact))
        .route("/sessions/{sid}/import", web::post().to(import))
        .route("/sessions/{sid}/save", web::post().to(save));
}

async fn lookup(state: &AppState, sid: Uuid) -> Result<SharedSession, HttpResponse> {
    state.sessions.get(&sid).await.ok_or_else(|| {
        HttpResponse::NotFound().json(error_body("Session not found", format!("No open session {}", sid), 404))
    })
}

async fn get_session(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let sid = path.into_inner();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };
    let session = shared.lock().await;
    HttpResponse::Ok().json(snapshot(sid, &session))
}

/// Flip one contact in or out of the selection
async fn toggle(state: web::Data<AppState>, path: web::Path<Uuid>, req: web::Json<ToggleRequest>) -> impl Responder {
    let sid = path.into_inner();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };
    let mut session = shared.lock().await;
    match session.toggle(req.into_inner().contact_id) {
        Ok(_) => HttpResponse::Ok().json(snapshot(sid, &session)),
        Err(e) => session_error(&e),
    }
}

/// Ids of the contacts currently visible under `scope`
async fn visible_ids(state: &AppState, scope: &ScopeRequest) -> Result<Vec<ContactId>, HttpResponse> {
    let filter = ContactFilter {
        status: scope.status,
        member_type: scope.member_type,
        group_id: None,
        search: scope.search.clone(),
    };
    let contacts = state
        .contacts
        .list_contacts(&filter)
        .await
        .map_err(|e| upstream_error("Failed to list contacts", &e))?;
    let term = scope.search.as_deref().unwrap_or_default();
    Ok(filter_visible(&contacts, term).into_iter().map(|c| c.id.clone()).collect())
}

/// Select every visible contact
async fn select_all(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: Option<web::Json<ScopeRequest>>,
) -> impl Responder {
    let sid = path.into_inner();
    let scope = scope.map(web::Json::into_inner).unwrap_or_default();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };
    let visible = match visible_ids(&state, &scope).await {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let mut session = shared.lock().await;
    match session.select_all(visible) {
        Ok(added) => {
            tracing::debug!("Session {}: selected {} more contacts", sid, added);
            HttpResponse::Ok().json(snapshot(sid, &session))
        }
        Err(e) => session_error(&e),
    }
}

/// Deselect every visible contact; hidden selections stay put
async fn select_none(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: Option<web::Json<ScopeRequest>>,
) -> impl Responder {
    let sid = path.into_inner();
    let scope = scope.map(web::Json::into_inner).unwrap_or_default();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };
    let visible = match visible_ids(&state, &scope).await {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let mut session = shared.lock().await;
    match session.select_none(visible) {
        Ok(removed) => {
            tracing::debug!("Session {}: deselected {} contacts", sid, removed);
            HttpResponse::Ok().json(snapshot(sid, &session))
        }
        Err(e) => session_error(&e),
    }
}

/// Create one contact and select it
///
/// POST /api/v1/sessions/{sid}/contacts
async fn add_contact(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<CreateContactRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }
    let sid = path.into_inner();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };

    let draft = ContactDraft::from(req.into_inner());
    let importer = Importer::new(state.contacts.as_ref(), state.groups.as_ref());
    let mut session = shared.lock().await;
    match importer.create_and_select(&draft, &mut session).await {
        Ok((contact, selected)) => {
            if let Err(e) = &selected {
                tracing::warn!("Contact {} created but not selected: {}", contact.id, e);
            }
            HttpResponse::Created().json(serde_json::json!({
                "contact": contact,
                "selected": selected.unwrap_or(false),
                "session": snapshot(sid, &session),
            }))
        }
        Err(e) => upstream_error("Failed to create contact", &e),
    }
}

/// Bulk import into this session's group
///
/// POST /api/v1/sessions/{sid}/import
async fn import(state: web::Data<AppState>, path: web::Path<Uuid>, body: String) -> impl Responder {
    let sid = path.into_inner();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };

    let importer = Importer::new(state.contacts.as_ref(), state.groups.as_ref());
    let mut session = shared.lock().await;
    let target = session.group_id().clone();
    let report = importer.run(&body, Some(&mut *session), Some(&target)).await;

    HttpResponse::Ok().json(ImportResponse {
        summary: report.summary(state.reason_limit),
        membership_errors: report.membership_errors(),
        imported: report.imported,
        skipped: report.skipped,
    })
}

/// Commit the selection, then re-read the group
///
/// The session lock is released while remote calls are in flight; a second
/// save in that window sees the Saving state and gets 409.
async fn save(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let sid = path.into_inner();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };

    let ticket = match shared.lock().await.begin_save() {
        Ok(ticket) => ticket,
        Err(e) => return session_error(&e),
    };

    let outcome = apply_save(state.groups.as_ref(), &ticket.group_id, &ticket.baseline, &ticket.selection).await;
    let message = outcome.summary(state.reason_limit);

    let mut session = shared.lock().await;
    if let Err(e) = session.finish_save(&outcome) {
        return session_error(&e);
    }

    let body = SaveResponse {
        saved: outcome.reconciled && outcome.is_clean(),
        message,
        session: snapshot(sid, &session),
    };
    if outcome.reconciled {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::BadGateway().json(body)
    }
}

/// Close a session
///
/// DELETE /api/v1/sessions/{sid}?discard=true
///
/// Without `discard`, a session with unsaved changes stays open and the
/// call returns 409.
async fn close_session(state: web::Data<AppState>, path: web::Path<Uuid>, query: web::Query<CloseQuery>) -> impl Responder {
    let sid = path.into_inner();
    let shared = match lookup(&state, sid).await {
        Ok(shared) => shared,
        Err(response) => return response,
    };

    let closed = shared.lock().await.close(query.discard);
    match closed {
        Ok(()) => {
            state.sessions.remove(&sid).await;
            tracing::info!("Closed session {}", sid);
            HttpResponse::NoContent().finish()
        }
        Err(e) => session_error(&e),
    }
}
