//! Manual EBSCO login for callers that manage their own credential

use actix_web::{web, HttpResponse};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthError;
use crate::error::RelayError;
use crate::session::SessionManager;
use crate::utils::responses::ResponseBuilder;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAuthResponse {
    pub auth_token: String,
}

/// `POST /api/auth/ebsco`
///
/// Runs the login handshake for `{cardNumber, password}` and hands the
/// credential back. The server-side session is not touched.
///
/// # Errors
///
/// Returns an error if:
/// - Either field is missing or empty (400)
/// - The login yields no credential (401)
/// - The identity provider cannot be reached (500)
pub async fn ebsco_auth(
    body: web::Bytes,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, RelayError> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let (Some(card_number), Some(password)) = (
        credential_field(&payload, "cardNumber"),
        credential_field(&payload, "password"),
    ) else {
        return Err(RelayError::MissingCredentialsInput);
    };

    match sessions.authenticate_with(&card_number, &password).await {
        Ok(credential) => {
            info!("Authentication successful!");
            Ok(ResponseBuilder::ok(&ManualAuthResponse {
                auth_token: credential.into_inner(),
            }))
        }
        Err(err) => {
            error!("EBSCO authentication error: {err}");
            if let AuthError::Transport {
                status: Some(status),
                ..
            } = &err
            {
                error!("Response status: {status}");
            }
            Err(err.into())
        }
    }
}

/// Non-empty string (or numeric) field of the request body
fn credential_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}
