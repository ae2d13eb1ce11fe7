//! Credential pairing with redacted secret storage
//!
//! A [`Credential`] pairs a principal name with its secret half. The
//! secret is wrapped in `secrecy::SecretString` so it is zeroed on drop,
//! never appears in `Debug` output, and must be exposed explicitly.

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;

/// A username/secret pair materialized from a stored key/value entry.
///
/// The key name becomes the principal and the key value becomes the
/// secret. Debug output shows `[REDACTED]` for the secret half.
#[derive(Clone)]
pub struct Credential {
    username: String,
    secret: SecretString,
}

impl Credential {
    /// Pair a principal with its secret.
    ///
    /// The secret string is moved into secure storage and zeroed when
    /// the credential is dropped.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// The principal half of the pair
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Expose the secret half for use.
    ///
    /// # Safety Note
    ///
    /// The caller must ensure the exposed value is:
    /// - Not logged or printed except as deliberate command output
    /// - Not persisted to disk
    /// - Used only for the immediate operation
    #[must_use]
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Convert into the single-entry mapping form used by write payloads.
    ///
    /// # Warning
    ///
    /// This exposes the secret value inside the returned map. Hand the
    /// map straight to a write call and drop it.
    #[must_use]
    pub fn into_payload(self) -> BTreeMap<String, String> {
        let mut payload = BTreeMap::new();
        payload.insert(self.username, self.secret.expose_secret().to_string());
        payload
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
