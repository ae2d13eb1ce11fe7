//! Session and HTTP transport for the secret store
//!
//! A [`VaultClient`] starts out unauthenticated; [`VaultClient::login`]
//! exchanges an [`AuthMethod`] for a session token, and every other
//! operation refuses to touch the network until that token exists.

use crate::auth::AuthMethod;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use vaultkit_core::{Error, Result};

/// Default timeout applied to every request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a KV v2 secret store over HTTPS.
///
/// Holds the normalized server address and, after a successful login,
/// the session token. The token is a `SecretString`: `Debug` output and
/// log events never reveal it.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    address: String,
    token: Option<SecretString>,
}

impl VaultClient {
    /// Build the user-agent string from the crate version
    fn user_agent() -> String {
        format!("vaultkit/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Create an unauthenticated client for the given server address.
    ///
    /// The address is normalized before use: trailing slashes are
    /// trimmed, a missing scheme becomes `https://`, and a plain-HTTP
    /// address is upgraded to HTTPS unless it points at a loopback host.
    ///
    /// # Errors
    ///
    /// Returns `Precondition` for an empty address or an unsupported
    /// scheme, and `Remote` if the HTTP connector cannot be built.
    pub fn new(address: impl AsRef<str>) -> Result<Self> {
        let address = normalize_address(address.as_ref())?;
        let http = reqwest::Client::builder()
            .user_agent(Self::user_agent())
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            address,
            token: None,
        })
    }

    /// The normalized server address this client talks to
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether a login has succeeded on this client
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Exchange a credential for a session token.
    ///
    /// On success the token is stored and subsequent operations are
    /// authenticated with it; logging in again replaces the session.
    /// On failure the previous session state is left untouched.
    ///
    /// # Errors
    ///
    /// Any failure (transport, non-success status, missing token in the
    /// response) surfaces as `Authentication`.
    pub async fn login(&mut self, method: &AuthMethod) -> Result<()> {
        let url = format!("{}/v1/auth/{}", self.address, method.login_path());
        debug!(method = method.name(), "logging in to secret store");

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&method.login_body())
            .send()
            .await
            .map_err(|e| Error::authentication(format!("login request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(Error::authentication(format!(
                "server rejected {} login (HTTP {}): {message}",
                method.name(),
                status.as_u16(),
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| Error::authentication(format!("malformed login response: {e}")))?;
        if body.auth.client_token.is_empty() {
            return Err(Error::authentication(
                "login response carried an empty session token",
            ));
        }

        self.token = Some(SecretString::from(body.auth.client_token));
        info!(method = method.name(), "session established");
        Ok(())
    }

    /// The session token, or `Precondition` when no login has happened.
    /// Called before any request is built, so unauthenticated operations
    /// never reach the network.
    pub(crate) fn auth_token(&self) -> Result<&str> {
        self.token
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .ok_or_else(|| Error::precondition("no active session; call login() first"))
    }

    /// Start an authenticated request to an absolute URL
    pub(crate) fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.auth_token()?;
        Ok(self
            .http
            .request(method, url)
            .header("X-Vault-Token", token)
            .header("Accept", "application/json"))
    }

    /// Send a prepared request, mapping transport failures to `Remote`
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))
    }

    /// Map a non-success response to the error taxonomy: 401/403 mean
    /// the session is no longer valid, 404 means `what` does not exist,
    /// everything else is `Remote` with the server's own message.
    pub(crate) async fn expect_success(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status.as_u16() {
            401 | 403 => {
                let message = read_error_message(response).await;
                Err(Error::authentication(format!(
                    "session token rejected: {message}"
                )))
            }
            404 => Err(Error::not_found(what.to_string())),
            code => {
                let message = read_error_message(response).await;
                Err(Error::remote(code, message))
            }
        }
    }
}

/// Pull the server's error message out of a failed response. The store
/// reports errors as `{"errors": ["..."]}`; anything else falls back to
/// the raw body or the status line.
async fn read_error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
        if !body.errors.is_empty() {
            return body.errors.join("; ");
        }
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no error message")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalize a server address to `https://host[:port]` form (loopback
/// hosts may keep plain HTTP for local development).
fn normalize_address(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::precondition("server address must not be empty"));
    }

    if trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }
    if let Some(rest) = trimmed.strip_prefix("http://") {
        if is_loopback_host(rest) {
            return Ok(trimmed.to_string());
        }
        warn!(address = trimmed, "upgrading plain-HTTP server address to HTTPS");
        return Ok(format!("https://{rest}"));
    }
    if trimmed.contains("://") {
        return Err(Error::precondition(format!(
            "unsupported URL scheme in server address: {trimmed}"
        )));
    }
    Ok(format!("https://{trimmed}"))
}

/// Plain HTTP is tolerated for these hosts only
fn is_loopback_host(authority: &str) -> bool {
    let host = authority.split('/').next().unwrap_or("");
    let host_no_port = host.split(':').next().unwrap_or("");
    host_no_port == "localhost" || host_no_port == "127.0.0.1"
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: LoginAuth,
}

#[derive(Deserialize)]
struct LoginAuth {
    client_token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}
