//! HTTP response handling system
//!
//! Every failure the relay reports is a JSON envelope of the shape
//! `{error, message, [status], [data]}`. This module builds those envelopes
//! and the few JSON success bodies the relay produces.

use actix_web::{
    http::{header, StatusCode},
    HttpResponse,
};
use serde_json::{json, Value};

/// Unified response builder that handles all relay responses
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create an error response carrying an arbitrary (usually upstream) status
    #[must_use]
    pub fn with_status(status: StatusCode) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(status)
    }

    // ===============================
    // SUCCESS RESPONSE METHODS
    // ===============================

    /// Create a 200 JSON response
    #[must_use]
    pub fn ok<T: serde::Serialize>(data: &T) -> HttpResponse {
        HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .json(data)
    }
}

/// Builder for error envelopes
pub struct ErrorResponseBuilder {
    status: StatusCode,
    error: Option<String>,
    message: Option<String>,
    additional_fields: Option<Value>,
}

impl ErrorResponseBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            error: None,
            message: None,
            additional_fields: None,
        }
    }

    /// Set the short error summary (the `error` field)
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Set a custom error message
    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Add additional JSON fields to the envelope
    #[must_use]
    pub fn with_additional_fields(mut self, fields: Value) -> Self {
        self.additional_fields = Some(fields);
        self
    }

    /// Render the envelope body without building a response
    #[must_use]
    pub fn body(&self) -> Value {
        let mut json_body = json!({
            "error": self.error.clone().unwrap_or_else(|| self.default_error()),
        });

        if let Some(message) = &self.message {
            json_body["message"] = Value::String(message.clone());
        }

        if let Some(Value::Object(map)) = &self.additional_fields {
            for (key, value) in map {
                json_body[key] = value.clone();
            }
        }

        json_body
    }

    /// Build the final `HttpResponse`
    #[must_use]
    pub fn build(self) -> HttpResponse {
        HttpResponse::build(self.status)
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .json(self.body())
    }

    fn default_error(&self) -> String {
        match self.status {
            StatusCode::BAD_REQUEST => "Invalid request",
            StatusCode::UNAUTHORIZED => "Authentication failed",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error",
            _ => "Request failed",
        }
        .to_string()
    }
}
