//! Authentication methods for establishing a session
//!
//! Two login flows are supported: approle (machine identity, role and
//! secret halves) and LDAP (directory identity, username and password).
//! The secret half of either method lives in a `SecretString` and never
//! appears in `Debug` output or log events.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::fmt;
use vaultkit_core::path;

/// A credential used to establish a session with the secret store
#[derive(Clone)]
pub enum AuthMethod {
    /// Machine identity: the two halves of an approle
    AppRole {
        /// Public half, identifies the role
        role_id: String,
        /// Secret half, proves possession of the role
        secret_id: SecretString,
    },
    /// Directory identity checked against the LDAP mount
    Ldap {
        /// Directory account name
        username: String,
        /// Directory account password
        password: SecretString,
    },
}

impl AuthMethod {
    /// Build an approle login credential
    #[must_use]
    pub fn app_role(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self::AppRole {
            role_id: role_id.into(),
            secret_id: SecretString::from(secret_id.into()),
        }
    }

    /// Build an LDAP login credential
    #[must_use]
    pub fn ldap(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Ldap {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Method name used in log events
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppRole { .. } => "approle",
            Self::Ldap { .. } => "ldap",
        }
    }

    /// Login path below `/v1/auth/`. LDAP carries the username in the
    /// path; approle carries everything in the body.
    pub(crate) fn login_path(&self) -> String {
        match self {
            Self::AppRole { .. } => "approle/login".to_string(),
            Self::Ldap { username, .. } => {
                format!("ldap/login/{}", path::encode_component(username))
            }
        }
    }

    /// JSON body for the login request
    pub(crate) fn login_body(&self) -> Value {
        match self {
            Self::AppRole { role_id, secret_id } => json!({
                "role_id": role_id,
                "secret_id": secret_id.expose_secret(),
            }),
            Self::Ldap { password, .. } => json!({
                "password": password.expose_secret(),
            }),
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppRole { role_id, .. } => f
                .debug_struct("AppRole")
                .field("role_id", role_id)
                .field("secret_id", &"[REDACTED]")
                .finish(),
            Self::Ldap { username, .. } => f
                .debug_struct("Ldap")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}
