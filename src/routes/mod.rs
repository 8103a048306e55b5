// Route exports
pub mod contacts;
pub mod groups;
pub mod sessions;

use crate::core::{ExportError, MembershipSession, SessionError};
use crate::models::{ErrorResponse, HealthResponse, RecordId, SessionResponse};
use crate::services::{ApiError, ContactStore, GroupStore, SessionRegistry};
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use uuid::Uuid;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<dyn ContactStore>,
    pub groups: Arc<dyn GroupStore>,
    pub sessions: SessionRegistry,
    /// How many failure reasons a user-facing summary quotes
    pub reason_limit: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(contacts::configure)
            .configure(groups::configure)
            .configure(sessions::configure),
    );
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

pub(crate) fn error_body(error: &str, message: impl Into<String>, status_code: u16) -> ErrorResponse {
    ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code,
    }
}

/// Map a record-storage failure to an HTTP response
pub(crate) fn upstream_error(context: &str, e: &ApiError) -> HttpResponse {
    tracing::error!("{}: {}", context, e);
    match e {
        ApiError::NotFound(msg) => HttpResponse::NotFound().json(error_body(context, msg.clone(), 404)),
        ApiError::RequestError(err) if err.is_timeout() => {
            HttpResponse::GatewayTimeout().json(error_body(context, e.to_string(), 504))
        }
        _ => HttpResponse::BadGateway().json(error_body(context, e.to_string(), 502)),
    }
}

pub(crate) fn export_error(context: &str, e: &ExportError) -> HttpResponse {
    match e {
        ExportError::Api(api) => upstream_error(context, api),
        _ => {
            tracing::error!("{}: {}", context, e);
            HttpResponse::InternalServerError().json(error_body(context, e.to_string(), 500))
        }
    }
}

pub(crate) fn csv_attachment(filename: &str, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            actix_web::http::header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body)
}

/// Map a session state-machine rejection to an HTTP response
pub(crate) fn session_error(e: &SessionError) -> HttpResponse {
    tracing::info!("Session operation rejected: {}", e);
    match e {
        SessionError::NotSaving => {
            HttpResponse::InternalServerError().json(error_body("Session state error", e.to_string(), 500))
        }
        _ => HttpResponse::Conflict().json(error_body("Session conflict", e.to_string(), 409)),
    }
}

pub(crate) fn validation_error(errors: &validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(error_body("Validation failed", errors.to_string(), 400))
}

pub(crate) fn parse_id(raw: &str) -> RecordId {
    RecordId::normalize(raw)
}

pub(crate) fn snapshot(session_id: Uuid, session: &MembershipSession) -> SessionResponse {
    let pending = session.pending_diff();
    SessionResponse {
        session_id,
        group_id: session.group_id().clone(),
        state: session.state().to_string(),
        baseline: session.baseline().iter().cloned().collect(),
        selection: session.selection().iter().cloned().collect(),
        has_unsaved_changes: session.has_unsaved_changes(),
        pending_additions: pending.to_add.len(),
        pending_removals: pending.to_remove.len(),
        last_errors: session.last_errors().iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalize_all;

    #[test]
    fn test_snapshot_reports_unsaved_changes() {
        let mut session = MembershipSession::from_baseline(RecordId::Int(9), normalize_all([1, 2]));
        session.toggle(3).unwrap();
        let snap = snapshot(Uuid::nil(), &session);
        assert_eq!(snap.state, "editing");
        assert!(snap.has_unsaved_changes);
        assert_eq!(snap.selection.len(), 3);
        assert_eq!(snap.baseline.len(), 2);
        assert_eq!((snap.pending_additions, snap.pending_removals), (1, 0));
    }

    #[test]
    fn test_session_conflicts_map_to_409() {
        let response = session_error(&SessionError::SaveInProgress);
        assert_eq!(response.status().as_u16(), 409);
    }

    #[test]
    fn test_export_failures_map_by_source() {
        let response = export_error("export", &ExportError::Api(ApiError::NotFound("group 4".into())));
        assert_eq!(response.status().as_u16(), 404);
        let response = export_error("export", &ExportError::Buffer("flush".into()));
        assert_eq!(response.status().as_u16(), 500);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = upstream_error("get group", &ApiError::NotFound("group 4".into()));
        assert_eq!(response.status().as_u16(), 404);
        let response = upstream_error("get group", &ApiError::api(500, "boom"));
        assert_eq!(response.status().as_u16(), 502);
    }
}
