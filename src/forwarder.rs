//! Request forwarder
//!
//! Rewrites an inbound `/api/<mount>/...` request into a call against one of
//! the two upstream hosts, attaches the session credential and relays the
//! upstream answer back unchanged. Upstream error statuses are relayed, not
//! turned into relay errors.

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use log::{error, info};
use reqwest::{redirect, Client};
use url::Url;

use crate::auth::Credential;
use crate::error::RelayError;
use crate::settings::ProxySettings;
use crate::utils::headers::{RequestHeaderProcessor, ResponseHeaderProcessor};

/// The two mount points of the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// `/api/ebsco-proxy/<host>/<path>` reaches `https://<host>/<path>`
    Ebsco,
    /// `/api/motor-proxy/<path>` reaches `<motor base>/<path>`
    Motor,
}

impl Upstream {
    /// Path prefix stripped from inbound requests
    #[must_use]
    pub const fn mount_prefix(self) -> &'static str {
        match self {
            Self::Ebsco => "/api/ebsco-proxy/",
            Self::Motor => "/api/motor-proxy",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ebsco => "EBSCO",
            Self::Motor => "Motor",
        }
    }

    /// The part of the inbound path that follows the mount prefix
    #[must_use]
    pub fn path_after_prefix(self, path: &str) -> &str {
        path.strip_prefix(self.mount_prefix()).unwrap_or_default()
    }

    /// Build the upstream URL for an inbound path and raw query string
    ///
    /// # Errors
    ///
    /// Returns `RelayError::InvalidTarget` if the result is not a valid URL
    pub fn resolve(self, path: &str, query: &str, motor_base_url: &str) -> Result<Url, RelayError> {
        let rest = self.path_after_prefix(path);
        let mut target = match self {
            Self::Ebsco => format!("https://{rest}"),
            Self::Motor => format!("{}{rest}", motor_base_url.trim_end_matches('/')),
        };
        if !query.is_empty() {
            target.push('?');
            target.push_str(query);
        }

        Url::parse(&target).map_err(|e| RelayError::InvalidTarget(format!("{target} ({e})")))
    }
}

/// Convert an Actix HTTP method to a reqwest method
///
/// # Errors
///
/// Returns `RelayError::UnsupportedMethod` if the method is not a valid token
pub fn convert_http_method(
    method: &actix_web::http::Method,
) -> Result<reqwest::Method, RelayError> {
    reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|_| RelayError::UnsupportedMethod(method.to_string()))
}

/// Executes proxied requests against the upstream hosts
pub struct Forwarder {
    client: Client,
    motor_base_url: String,
}

impl Forwarder {
    /// Create a forwarder with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(settings: &ProxySettings) -> reqwest::Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(settings.max_redirects))
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            motor_base_url: settings.motor_base_url.clone(),
        })
    }

    /// Relay `req` to `upstream` with `credential` attached
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The inbound path does not form a valid upstream URL
    /// - The upstream cannot be reached
    /// - The upstream body cannot be read
    pub async fn forward(
        &self,
        req: &HttpRequest,
        body: web::Bytes,
        upstream: Upstream,
        credential: &Credential,
    ) -> Result<HttpResponse, RelayError> {
        let target = upstream.resolve(req.path(), req.query_string(), &self.motor_base_url)?;
        info!("🔄 Proxying {} request to: {target}", req.method());

        let mut request = self
            .client
            .request(convert_http_method(req.method())?, target)
            .headers(RequestHeaderProcessor::outbound_headers(req, credential));
        if !body.is_empty() {
            request = request.body(body);
        }

        let upstream_response = request.send().await.map_err(|err| {
            error!("❌ {} proxy error: {err}", upstream.name());
            RelayError::ForwardTransport(err.to_string())
        })?;

        relay_response(upstream_response).await
    }
}

/// Copy status, headers and body of an upstream response
async fn relay_response(upstream_response: reqwest::Response) -> Result<HttpResponse, RelayError> {
    let status = StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response_builder = HttpResponse::build(status);
    ResponseHeaderProcessor::forward_response_headers(upstream_response.headers(), &mut response_builder);

    let body = upstream_response
        .bytes()
        .await
        .map_err(|err| RelayError::Upstream {
            status,
            message: format!("Failed to read upstream response: {err}"),
        })?;

    Ok(response_builder.body(body))
}
