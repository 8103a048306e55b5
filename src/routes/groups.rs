use super::{csv_attachment, export_error, parse_id, snapshot, upstream_error, validation_error, AppState};
use crate::core::{delete_group, export_group, group_stats, MembershipSession};
use crate::models::{GroupDraft, GroupRequest};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Configure group routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/groups", web::get().to(list_groups))
        .route("/groups", web::post().to(create_group))
        .route("/groups/{id}", web::get().to(get_group))
        .route("/groups/{id}", web::patch().to(update_group))
        .route("/groups/{id}", web::delete().to(remove_group))
        .route("/groups/{id}/stats", web::get().to(stats))
        .route("/groups/{id}/export", web::get().to(export))
        .route("/groups/{id}/sessions", web::post().to(open_session));
}

async fn list_groups(state: web::Data<AppState>) -> impl Responder {
    match state.groups.list_groups().await {
        Ok(groups) => HttpResponse::Ok().json(groups),
        Err(e) => upstream_error("Failed to list groups", &e),
    }
}

async fn create_group(state: web::Data<AppState>, req: web::Json<GroupRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }
    let draft = GroupDraft::from(req.into_inner());
    match state.groups.create_group(&draft).await {
        Ok(group) => {
            tracing::info!("Created group {} ({})", group.id, group.name);
            HttpResponse::Created().json(group)
        }
        Err(e) => upstream_error("Failed to create group", &e),
    }
}

async fn get_group(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.groups.get_group(&parse_id(&path)).await {
        Ok(group) => HttpResponse::Ok().json(group),
        Err(e) => upstream_error("Failed to fetch group", &e),
    }
}

async fn update_group(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<GroupRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(&errors);
    }
    let draft = GroupDraft::from(req.into_inner());
    match state.groups.update_group(&parse_id(&path), &draft).await {
        Ok(group) => HttpResponse::Ok().json(group),
        Err(e) => upstream_error("Failed to update group", &e),
    }
}

/// Delete a group after removing all of its members
///
/// DELETE /api/v1/groups/{id}
async fn remove_group(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = parse_id(&path);
    match delete_group(state.groups.as_ref(), &id).await {
        Ok(drained) => HttpResponse::Ok().json(serde_json::json!({
            "deleted": true,
            "groupId": id,
            "drained": drained,
            "message": drained.summary("Removed members", state.reason_limit),
        })),
        Err(e) => upstream_error("Failed to delete group", &e),
    }
}

async fn stats(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match group_stats(state.groups.as_ref(), &parse_id(&path)).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => upstream_error("Failed to compute group stats", &e),
    }
}

/// Export a group's members as CSV
async fn export(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = parse_id(&path);
    match export_group(state.groups.as_ref(), &id).await {
        Ok(csv) => {
            let filename = format!("group_{}_{}.csv", id, chrono::Utc::now().format("%Y-%m-%d"));
            csv_attachment(&filename, csv)
        }
        Err(e) => export_error("Failed to export group", &e),
    }
}

/// Open a "manage membership" session
///
/// POST /api/v1/groups/{id}/sessions
///
/// The baseline is always read fresh from the group-membership service.
async fn open_session(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = parse_id(&path);
    let session = match MembershipSession::load(state.groups.as_ref(), id).await {
        Ok(session) => session,
        Err(e) => return upstream_error("Failed to load group membership", &e),
    };

    let (session_id, shared) = state.sessions.open(session).await;
    let session = shared.lock().await;
    tracing::info!(
        "Opened session {} for group {} with {} members",
        session_id,
        session.group_id(),
        session.baseline().len()
    );
    HttpResponse::Created().json(snapshot(session_id, &session))
}
