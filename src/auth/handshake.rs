//! EBSCO prompted-login handshake
//!
//! The identity provider walks a browser through a sequence of prompts, keeping
//! its state in cookies. The relay replays that sequence:
//!
//! 1. `GET` the login page with a fresh request identifier, keep its cookies
//! 2. `POST` the card number to the next-step endpoint
//! 3. `POST` the password to the same endpoint
//! 4. Pull the credential out of the final response, following a redirect if
//!    the provider issued one
//!
//! Steps 1-3 never follow redirects so that every `Set-Cookie` is observed.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{
    header::{COOKIE, LOCATION},
    redirect, Client, RequestBuilder, Response,
};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use super::{AuthError, Authenticator, Credential};
use crate::settings::{AuthSettings, ProxySettings};
use crate::utils::cookies::{find_cookie_pair, serialize_cookies};

/// Cookie names that carry the session, in order of preference
const AUTH_COOKIE_NAMES: [&str; 2] = ["ebsco-auth", "authToken"];

/// JSON body fields that may carry the session when no cookie does
const AUTH_BODY_FIELDS: [&str; 2] = ["authToken", "token"];

const NEXT_STEP_PATH: &str = "api/login/v1/prompted/next-step";

/// URLs of the identity provider's login flow
#[derive(Debug, Clone)]
pub struct LoginEndpoints {
    base: Url,
    cust_id: String,
    group_id: String,
    prof_id: String,
}

impl LoginEndpoints {
    /// Build endpoints from auth settings
    ///
    /// # Errors
    ///
    /// Returns an error if the configured login base URL cannot be parsed
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let base = format!("{}/", settings.login_base_url.trim_end_matches('/'));
        let base = Url::parse(&base).map_err(|e| AuthError::InvalidUrl(format!("{base}: {e}")))?;

        Ok(Self {
            base,
            cust_id: settings.cust_id.clone(),
            group_id: settings.group_id.clone(),
            prof_id: settings.prof_id.clone(),
        })
    }

    /// Login page URL carrying the per-attempt request identifier
    #[must_use]
    pub fn login_page(&self, request_identifier: &Uuid) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("custId", &self.cust_id)
            .append_pair("groupId", &self.group_id)
            .append_pair("profId", &self.prof_id)
            .append_pair("requestIdentifier", &request_identifier.to_string());
        url
    }

    /// Endpoint that receives each prompted value
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined onto the base URL
    pub fn next_step(&self) -> Result<Url, AuthError> {
        self.base
            .join(NEXT_STEP_PATH)
            .map_err(|e| AuthError::InvalidUrl(e.to_string()))
    }
}

/// The real login flow against the EBSCO identity provider
pub struct EbscoHandshake {
    /// Used for the prompted steps, never follows redirects
    client: Client,
    /// Used for the final redirect hop
    redirect_client: Client,
    endpoints: LoginEndpoints,
}

impl EbscoHandshake {
    /// Create a handshake with its own HTTP clients
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The login base URL is invalid
    /// - The HTTP clients cannot be constructed
    pub fn new(auth: &AuthSettings, proxy: &ProxySettings) -> Result<Self, AuthError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(proxy.request_timeout())
            .build()?;
        let redirect_client = Client::builder()
            .redirect(redirect::Policy::limited(proxy.max_redirects))
            .timeout(proxy.request_timeout())
            .build()?;

        Ok(Self {
            client,
            redirect_client,
            endpoints: LoginEndpoints::from_settings(auth)?,
        })
    }

    /// Post one prompted value with the running cookie string
    async fn submit_prompt(&self, cookies: &str, prompt: &str) -> Result<Response, AuthError> {
        let request = self.client.post(self.endpoints.next_step()?).json(&json!({
            "action": "signin",
            "values": { "prompt": prompt }
        }));
        send_step(with_cookies(request, cookies), "next-step").await
    }
}

#[async_trait]
impl Authenticator for EbscoHandshake {
    async fn authenticate(
        &self,
        card_number: &str,
        password: &str,
    ) -> Result<Credential, AuthError> {
        let request_identifier = Uuid::new_v4();

        info!("   Step 1: Getting login page...");
        let login_page = send_step(
            self.client.get(self.endpoints.login_page(&request_identifier)),
            "login page",
        )
        .await?;
        let cookies = serialize_cookies(login_page.headers());
        debug!("Login page set {} cookie bytes", cookies.len());

        info!("   Step 2: Submitting card number...");
        let card_response = self.submit_prompt(&cookies, card_number).await?;
        let cookies = replace_if_set(cookies, serialize_cookies(card_response.headers()));

        info!("   Step 3: Submitting password...");
        let password_response = self.submit_prompt(&cookies, password).await?;
        let step_url = password_response.url().clone();
        let location = password_response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        let mut token = credential_from_cookies(&serialize_cookies(password_response.headers()));
        if token.is_none() {
            let body = password_response.bytes().await?;
            token = credential_from_body(&body);
        }

        if let Some(location) = location {
            info!("   Step 4: Following redirect...");
            let target = step_url
                .join(&location)
                .map_err(|e| AuthError::InvalidUrl(format!("{location}: {e}")))?;
            let redirect_response = send_step(
                with_cookies(self.redirect_client.get(target), &cookies),
                "redirect",
            )
            .await?;
            if let Some(redirect_token) =
                credential_from_cookies(&serialize_cookies(redirect_response.headers()))
            {
                token = Some(redirect_token);
            }
        }

        match token.filter(|token| !token.is_empty()) {
            Some(token) => Ok(Credential::new(token)),
            None => {
                warn!("Login flow completed without an auth token");
                Err(AuthError::NoToken)
            }
        }
    }
}

/// Attach the running cookie string, if there is one
fn with_cookies(request: RequestBuilder, cookies: &str) -> RequestBuilder {
    if cookies.is_empty() {
        request
    } else {
        request.header(COOKIE, cookies)
    }
}

/// Send a step and accept any 2xx or 3xx answer
async fn send_step(request: RequestBuilder, step: &str) -> Result<Response, AuthError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        Ok(response)
    } else {
        Err(AuthError::Transport {
            status: Some(status.as_u16()),
            message: format!("{step} request failed with status code {}", status.as_u16()),
        })
    }
}

/// Newly set cookies replace the running string; otherwise it carries over
fn replace_if_set(current: String, fresh: String) -> String {
    if fresh.is_empty() {
        current
    } else {
        fresh
    }
}

/// Pick the credential out of a serialized cookie string
///
/// A named auth cookie wins as a `name=value` pair. Failing that, the whole
/// cookie string is used, since upstream calls may need every cookie.
fn credential_from_cookies(cookies: &str) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    AUTH_COOKIE_NAMES
        .iter()
        .find_map(|name| find_cookie_pair(cookies, name))
        .or_else(|| Some(cookies.to_string()))
}

/// Pick the credential out of a JSON response body
fn credential_from_body(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    AUTH_BODY_FIELDS.iter().find_map(|field| {
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(ToString::to_string)
    })
}
