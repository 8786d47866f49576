use actix_web::{web, HttpRequest, HttpResponse};
use log::warn;

use crate::error::RelayError;
use crate::forwarder::{Forwarder, Upstream};
use crate::session::SessionManager;

/// `ALL /api/ebsco-proxy/*`
///
/// # Errors
///
/// Returns an error if no session is available or the upstream call fails
pub async fn ebsco_proxy(
    req: HttpRequest,
    body: web::Bytes,
    sessions: web::Data<SessionManager>,
    forwarder: web::Data<Forwarder>,
) -> Result<HttpResponse, RelayError> {
    proxy_to(Upstream::Ebsco, &req, body, &sessions, &forwarder).await
}

/// `ALL /api/motor-proxy/*`
///
/// # Errors
///
/// Returns an error if no session is available or the upstream call fails
pub async fn motor_proxy(
    req: HttpRequest,
    body: web::Bytes,
    sessions: web::Data<SessionManager>,
    forwarder: web::Data<Forwarder>,
) -> Result<HttpResponse, RelayError> {
    proxy_to(Upstream::Motor, &req, body, &sessions, &forwarder).await
}

/// Obtain the server-side credential, then forward
async fn proxy_to(
    upstream: Upstream,
    req: &HttpRequest,
    body: web::Bytes,
    sessions: &SessionManager,
    forwarder: &Forwarder,
) -> Result<HttpResponse, RelayError> {
    let Some(credential) = sessions.ensure_authenticated().await else {
        warn!(
            "Rejecting {} proxy request to {}: no EBSCO session",
            upstream.name(),
            req.path()
        );
        return Err(RelayError::NoActiveSession);
    };

    forwarder.forward(req, body, upstream, &credential).await
}
