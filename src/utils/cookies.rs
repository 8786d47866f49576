//! Cookie codec for the login handshake
//!
//! Upstream responses hand out cookies through any number of `Set-Cookie`
//! headers. The relay only ever needs the `name=value` pairs, joined the way a
//! browser would send them back in a single `Cookie` header.

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Separator used between pairs of a serialized cookie string
pub const COOKIE_SEPARATOR: &str = "; ";

/// Serialize every `Set-Cookie` header into one `Cookie` header value
///
/// Attributes such as `Path`, `Domain`, `Expires` or `HttpOnly` are dropped;
/// only the leading `name=value` portion of each entry is kept. Returns an
/// empty string when the response carries no `Set-Cookie` header.
#[must_use]
pub fn serialize_cookies(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(|cookie| cookie.split(';').next().unwrap_or(cookie).trim())
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join(COOKIE_SEPARATOR)
}

/// Look up the value of a named cookie in a serialized cookie string
///
/// Each pair is split on `=` and only the text up to the next `=` is taken as
/// the value, so values that themselves contain `=` come back truncated.
#[must_use]
pub fn find_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(COOKIE_SEPARATOR).find_map(|pair| {
        let mut parts = pair.split('=');
        let key = parts.next()?;
        if key == name {
            Some(parts.next().unwrap_or_default().to_string())
        } else {
            None
        }
    })
}

/// Find a named cookie and return it as a `name=value` pair
#[must_use]
pub fn find_cookie_pair(cookies: &str, name: &str) -> Option<String> {
    find_cookie(cookies, name).map(|value| format!("{name}={value}"))
}
