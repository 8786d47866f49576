//! Header Processing Utilities
//!
//! Outbound requests get an explicitly constructed header set: inbound headers
//! are copied unless they identify the inbound hop, carry client-side auth, or
//! are recomputed by the HTTP client. The relay's credential becomes the only
//! `Cookie` header. Upstream response headers are copied back minus the ones
//! that only describe the upstream connection.

use actix_web::http::header::{HeaderName as ActixHeaderName, HeaderValue as ActixHeaderValue};
use actix_web::{HttpRequest, HttpResponseBuilder};
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};

use crate::auth::Credential;

/// Inbound headers never copied to the upstream request
///
/// `x-auth-token` is the legacy client-managed credential header; the relay
/// manages the session itself now.
const STRIPPED_REQUEST_HEADERS: [&str; 4] = ["host", "x-auth-token", "cookie", "content-length"];

// ===============================
// HOP-BY-HOP HEADER DETECTION
// ===============================

/// Check if a header is a hop-by-hop header that should not be forwarded
///
/// Based on RFC 2616 Section 13.5.1
#[must_use]
pub fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}

// ===============================
// REQUEST HEADER FORWARDING
// ===============================

/// Builds the header set of an upstream request
pub struct RequestHeaderProcessor;

impl RequestHeaderProcessor {
    /// Whether an inbound header is copied to the upstream request
    #[must_use]
    pub fn should_forward(name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        !STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) && !is_hop_by_hop_header(&name)
    }

    /// Construct the upstream header set from the inbound request
    ///
    /// Multi-valued headers keep every value. The credential is attached as
    /// the `Cookie` header.
    #[must_use]
    pub fn outbound_headers(req: &HttpRequest, credential: &Credential) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in req.headers() {
            if !Self::should_forward(name.as_str()) {
                continue;
            }
            match (
                HeaderName::from_bytes(name.as_str().as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => debug!("Skipping unconvertible request header {name}"),
            }
        }

        match HeaderValue::from_str(credential.as_str()) {
            Ok(cookie) => {
                headers.insert(COOKIE, cookie);
            }
            Err(_) => debug!("Credential is not a valid header value, sending without cookie"),
        }

        headers
    }
}

// ===============================
// RESPONSE HEADER FORWARDING
// ===============================

/// Copies upstream response headers onto the relayed response
pub struct ResponseHeaderProcessor;

impl ResponseHeaderProcessor {
    /// Whether an upstream header is copied to the client
    ///
    /// `content-length` is recomputed from the relayed body.
    #[must_use]
    pub fn should_forward(name: &str) -> bool {
        !name.eq_ignore_ascii_case("content-length") && !is_hop_by_hop_header(name)
    }

    /// Forward upstream headers to an Actix `HttpResponseBuilder`
    ///
    /// Headers are appended, so repeated headers such as `set-cookie` survive.
    pub fn forward_response_headers(
        upstream_headers: &HeaderMap,
        response_builder: &mut HttpResponseBuilder,
    ) {
        for (name, value) in upstream_headers {
            if !Self::should_forward(name.as_str()) {
                continue;
            }
            match (
                ActixHeaderName::from_bytes(name.as_str().as_bytes()),
                ActixHeaderValue::from_bytes(value.as_bytes()),
            ) {
                (Ok(name), Ok(value)) => {
                    response_builder.append_header((name, value));
                }
                _ => debug!("Skipping unconvertible response header {name}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test::TestRequest, HttpResponse};

    #[test]
    fn test_hop_by_hop_headers() {
        assert!(is_hop_by_hop_header("connection"));
        assert!(is_hop_by_hop_header("Transfer-Encoding"));
        assert!(!is_hop_by_hop_header("content-type"));
        assert!(!is_hop_by_hop_header("authorization"));
    }

    #[test]
    fn test_outbound_headers_strip_and_inject() {
        let req = TestRequest::default()
            .insert_header(("Host", "localhost:3001"))
            .insert_header(("X-Auth-Token", "legacy"))
            .insert_header(("Cookie", "browser=1"))
            .insert_header(("Connection", "keep-alive"))
            .insert_header(("Accept", "application/json"))
            .insert_header(("X-Custom", "kept"))
            .to_http_request();

        let headers =
            RequestHeaderProcessor::outbound_headers(&req, &Credential::new("ebsco-auth=XYZ"));

        assert!(headers.get("host").is_none());
        assert!(headers.get("x-auth-token").is_none());
        assert!(headers.get("connection").is_none());
        assert_eq!(headers.get("accept").unwrap(), "application/json");
        assert_eq!(headers.get("x-custom").unwrap(), "kept");
        assert_eq!(headers.get_all(COOKIE).iter().count(), 1);
        assert_eq!(headers.get(COOKIE).unwrap(), "ebsco-auth=XYZ");
    }

    #[test]
    fn test_response_header_filtering() {
        assert!(!ResponseHeaderProcessor::should_forward("connection"));
        assert!(!ResponseHeaderProcessor::should_forward("transfer-encoding"));
        assert!(!ResponseHeaderProcessor::should_forward("Content-Length"));
        assert!(ResponseHeaderProcessor::should_forward("content-type"));
        assert!(ResponseHeaderProcessor::should_forward("set-cookie"));
    }

    #[test]
    fn test_forward_response_headers_keeps_repeats() {
        let mut upstream = HeaderMap::new();
        upstream.append("set-cookie", HeaderValue::from_static("a=1"));
        upstream.append("set-cookie", HeaderValue::from_static("b=2"));
        upstream.insert("connection", HeaderValue::from_static("close"));
        upstream.insert("content-type", HeaderValue::from_static("text/plain"));

        let mut builder = HttpResponse::build(StatusCode::OK);
        ResponseHeaderProcessor::forward_response_headers(&upstream, &mut builder);
        let response = builder.finish();

        assert_eq!(response.headers().get_all("set-cookie").count(), 2);
        assert!(response.headers().get("connection").is_none());
        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
    }
}
