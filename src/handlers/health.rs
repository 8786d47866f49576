use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::session::SessionManager;
use crate::utils::responses::ResponseBuilder;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub auto_auth: bool,
    pub session: String,
    pub expires_in_minutes: i64,
    pub refresh_in_progress: bool,
}

/// `GET /health`
pub async fn health(sessions: web::Data<SessionManager>) -> HttpResponse {
    let status = sessions.status();
    let session = if status.authenticated {
        "authenticated"
    } else {
        "not authenticated"
    };

    ResponseBuilder::ok(&HealthResponse {
        status: "ok".to_string(),
        auto_auth: sessions.auto_auth_enabled(),
        session: session.to_string(),
        expires_in_minutes: status.expires_in_minutes,
        refresh_in_progress: status.refresh_in_progress,
    })
}
