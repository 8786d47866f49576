//! Error taxonomy surfaced at the HTTP boundary
//!
//! Handlers return `Result<HttpResponse, RelayError>`; actix turns the error
//! into the JSON envelope through [`ResponseError`].

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::utils::responses::ResponseBuilder;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Manual auth request without a card number or password
    #[error("cardNumber and password are required")]
    MissingCredentialsInput,

    /// The login flow completed without yielding a credential
    #[error("Authentication failed - no auth token received")]
    HandshakeNoToken,

    /// Network or HTTP failure in the middle of the login flow
    #[error("{0}")]
    HandshakeTransport(String),

    /// No credential available for a proxied request
    #[error("Unable to authenticate with EBSCO. Check server logs for details.")]
    NoActiveSession,

    /// Upstream answered but the answer could not be relayed
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// Upstream could not be reached at all
    #[error("{0}")]
    ForwardTransport(String),

    /// The proxied path does not form a usable upstream URL
    #[error("Invalid upstream target: {0}")]
    InvalidTarget(String),

    #[error("HTTP method not supported: {0}")]
    UnsupportedMethod(String),
}

impl From<AuthError> for RelayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NoToken => Self::HandshakeNoToken,
            other => Self::HandshakeTransport(other.to_string()),
        }
    }
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredentialsInput | Self::InvalidTarget(_) | Self::UnsupportedMethod(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::HandshakeNoToken | Self::NoActiveSession => StatusCode::UNAUTHORIZED,
            Self::HandshakeTransport(_) | Self::ForwardTransport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upstream { status, .. } => *status,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        let builder = ResponseBuilder::with_status(self.status_code());

        match self {
            Self::MissingCredentialsInput | Self::HandshakeNoToken => {
                builder.with_error(&message).build()
            }
            Self::HandshakeTransport(_) | Self::NoActiveSession => builder
                .with_error("Authentication failed")
                .with_message(&message)
                .build(),
            Self::Upstream { status, .. } => builder
                .with_error("Proxy request failed")
                .with_message(&message)
                .with_additional_fields(json!({ "status": status.as_u16() }))
                .build(),
            Self::ForwardTransport(_) | Self::InvalidTarget(_) | Self::UnsupportedMethod(_) => {
                builder
                    .with_error("Proxy request failed")
                    .with_message(&message)
                    .build()
            }
        }
    }
}
