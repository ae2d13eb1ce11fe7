//! KV v2 operations: list, read, write, delete, and version history
//!
//! Every operation is one request/response cycle against the store,
//! except append-style writes (which probe and read before posting) and
//! key deletion (which rewrites the rest of the bundle). The store has
//! no partial-key primitives, so both are built from whole-bundle calls.

use crate::client::VaultClient;
use chrono::{DateTime, Utc};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use vaultkit_core::{
    BundleVersion, Credential, Error, Result, SecretBundle, SecretMetadata, SecretVersion,
    merge_payload, path,
};

/// How a write treats keys already stored at the target path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Append: existing keys absent from the payload are carried over;
    /// payload values win on collisions
    #[default]
    Merge,
    /// Overwrite: the new revision holds exactly the payload
    Replace,
}

impl VaultClient {
    /// List the names one level below a folder: child bundles keep their
    /// plain name, sub-folders carry a trailing `/`.
    ///
    /// Without a path the engine root is listed. A nested path is
    /// resolved to the folder containing its final segment, since the
    /// store lists one level per call. An empty folder yields an empty
    /// vector rather than an error.
    ///
    /// # Errors
    ///
    /// `Precondition` without a session or with an empty engine path;
    /// `Authentication` if the token is rejected; `Remote` otherwise.
    pub async fn list(&self, engine: &str, path: Option<&str>) -> Result<Vec<String>> {
        path::ensure_component(engine, "engine path")?;
        let normalized = path.map(path::normalize).unwrap_or_default();
        let folder = path::list_target(&normalized);
        debug!(engine, folder, "listing child bundles");
        self.list_folder(engine, folder).await
    }

    /// List the key names inside a bundle, without transferring values.
    ///
    /// # Errors
    ///
    /// `NotFound` if no bundle lives at the path; otherwise as [`Self::list`].
    pub async fn subkeys(&self, engine: &str, path: &str) -> Result<Vec<String>> {
        path::ensure_component(engine, "engine path")?;
        let normalized = path::normalize(path);
        path::ensure_component(&normalized, "secret path")?;

        let url = self.kv_url(engine, "subkeys", &normalized);
        debug!(engine, path = %normalized, "listing bundle subkeys");
        let request = self.request(Method::GET, &url)?;
        let response = self.send(request).await?;
        let response =
            Self::expect_success(response, &display_path(engine, &normalized)).await?;
        let body: VaultResponse<SubkeysData> = parse_body(response).await?;
        Ok(body.data.subkeys.into_keys().collect())
    }

    /// Read the bundle stored at a path. `version` selects a historical
    /// revision; `None` reads the latest.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path (or requested version) does not exist.
    pub async fn read(
        &self,
        engine: &str,
        path: &str,
        version: Option<u64>,
    ) -> Result<SecretBundle> {
        path::ensure_component(engine, "engine path")?;
        let normalized = path::normalize(path);
        path::ensure_component(&normalized, "secret path")?;

        let url = self.kv_url(engine, "data", &normalized);
        debug!(engine, path = %normalized, version = ?version, "reading secret bundle");
        let mut request = self.request(Method::GET, &url)?;
        if let Some(v) = version {
            request = request.query(&[("version", v.to_string())]);
        }
        let response = self.send(request).await?;

        let what = display_target(engine, &normalized, version);
        let response = Self::expect_success(response, &what).await?;
        let body: VaultResponse<ReadData> = parse_body(response).await?;

        let data = body
            .data
            .data
            .into_iter()
            .map(|(key, value)| (key, coerce_value(value)))
            .collect();
        Ok(SecretBundle::new(
            data,
            BundleVersion {
                version: body.data.metadata.version,
                created_time: body.data.metadata.created_time,
            },
        ))
    }

    /// Read a single key out of a bundle, returned as a one-entry
    /// bundle that keeps the revision metadata.
    ///
    /// # Errors
    ///
    /// `NotFound` if the bundle exists but does not hold `key`.
    pub async fn read_key(
        &self,
        engine: &str,
        path: &str,
        key: &str,
        version: Option<u64>,
    ) -> Result<SecretBundle> {
        path::ensure_component(key, "key name")?;
        let normalized = path::normalize(path);
        let bundle = self.read(engine, &normalized, version).await?;

        let value = match bundle.get(key) {
            Some(value) => value.to_string(),
            None => {
                return Err(Error::not_found(format!(
                    "key '{key}' at {}",
                    display_target(engine, &normalized, version)
                )));
            }
        };
        let mut data = BTreeMap::new();
        data.insert(key.to_string(), value);
        Ok(SecretBundle::new(data, bundle.metadata))
    }

    /// Materialize a stored key/value entry as a credential: the key
    /// name becomes the principal, the value becomes the secret half.
    ///
    /// # Errors
    ///
    /// `Precondition` for an empty key name (checked before any
    /// request); `NotFound` if the bundle does not hold `key`.
    pub async fn read_credential(
        &self,
        engine: &str,
        path: &str,
        key: &str,
        version: Option<u64>,
    ) -> Result<Credential> {
        path::ensure_component(key, "key name")?;
        let normalized = path::normalize(path);
        let bundle = self.read(engine, &normalized, version).await?;

        match bundle.get(key) {
            Some(value) => Ok(Credential::new(key, value)),
            None => Err(Error::not_found(format!(
                "key '{key}' at {}",
                display_target(engine, &normalized, version)
            ))),
        }
    }

    /// Write a bundle revision.
    ///
    /// [`WriteMode::Merge`] first checks whether a bundle already exists
    /// (by listing its parent folder) and, if so, carries over every
    /// existing key the payload does not name; payload values win on
    /// collisions. [`WriteMode::Replace`] stores exactly the payload.
    /// Returns the resulting bundle with its server-assigned revision.
    ///
    /// Merge reads and writes in separate round trips, so two concurrent
    /// writers can still race; use [`Self::write_cas`] when that matters.
    ///
    /// # Errors
    ///
    /// `Precondition` for an empty payload, path, or engine.
    pub async fn write(
        &self,
        engine: &str,
        path: &str,
        data: BTreeMap<String, String>,
        mode: WriteMode,
    ) -> Result<SecretBundle> {
        let normalized = checked_write_input(engine, path, &data)?;

        let payload = match mode {
            WriteMode::Replace => data,
            WriteMode::Merge => self.merge_with_existing(engine, &normalized, data).await?,
        };
        self.post_data(engine, &normalized, payload, None).await
    }

    /// Write a bundle revision only if the current version matches
    /// `expected_version` (0 means "only if nothing exists yet").
    ///
    /// Replace semantics with the store's compare-and-swap check; a
    /// version mismatch surfaces as `Remote` with the server's message.
    ///
    /// # Errors
    ///
    /// As [`Self::write`], plus `Remote` on a version conflict.
    pub async fn write_cas(
        &self,
        engine: &str,
        path: &str,
        data: BTreeMap<String, String>,
        expected_version: u64,
    ) -> Result<SecretBundle> {
        let normalized = checked_write_input(engine, path, &data)?;
        self.post_data(engine, &normalized, data, Some(expected_version))
            .await
    }

    /// Delete the live revision of a whole bundle. Retention of older
    /// revisions is governed by the store.
    ///
    /// # Errors
    ///
    /// `Precondition` for an empty path or engine; `Remote` for
    /// non-success responses.
    pub async fn delete(&self, engine: &str, path: &str) -> Result<()> {
        path::ensure_component(engine, "engine path")?;
        let normalized = path::normalize(path);
        path::ensure_component(&normalized, "secret path")?;

        let url = self.kv_url(engine, "data", &normalized);
        debug!(engine, path = %normalized, "deleting secret bundle");
        let request = self.request(Method::DELETE, &url)?;
        let response = self.send(request).await?;
        Self::expect_success(response, &display_path(engine, &normalized)).await?;
        info!(engine, path = %normalized, "deleted secret bundle");
        Ok(())
    }

    /// Delete a single key by rewriting the bundle without it. The
    /// store only deletes whole bundles, so this reads the current
    /// revision, drops the key, and replaces the bundle with the rest.
    ///
    /// # Errors
    ///
    /// `NotFound` if the bundle does not hold `key`; in that case no
    /// rewrite is issued.
    pub async fn delete_key(&self, engine: &str, path: &str, key: &str) -> Result<()> {
        path::ensure_component(key, "key name")?;
        let normalized = path::normalize(path);
        let bundle = self.read(engine, &normalized, None).await?;

        if !bundle.contains_key(key) {
            return Err(Error::not_found(format!(
                "key '{key}' at {}",
                display_path(engine, &normalized)
            )));
        }
        let mut remaining = bundle.data;
        remaining.remove(key);
        debug!(
            engine,
            path = %normalized,
            key,
            remaining = remaining.len(),
            "rewriting bundle without key"
        );
        self.post_data(engine, &normalized, remaining, None).await?;
        Ok(())
    }

    /// Read the version history of a path: current version, write
    /// times, and the per-revision list sorted by version number.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path has never been written.
    pub async fn metadata(&self, engine: &str, path: &str) -> Result<SecretMetadata> {
        path::ensure_component(engine, "engine path")?;
        let normalized = path::normalize(path);
        path::ensure_component(&normalized, "secret path")?;

        let url = self.kv_url(engine, "metadata", &normalized);
        debug!(engine, path = %normalized, "reading version history");
        let request = self.request(Method::GET, &url)?;
        let response = self.send(request).await?;
        let response =
            Self::expect_success(response, &display_path(engine, &normalized)).await?;
        let body: VaultResponse<MetadataData> = parse_body(response).await?;
        let data = body.data;

        let mut versions = Vec::with_capacity(data.versions.len());
        for (number, entry) in data.versions {
            let version = number.parse::<u64>().map_err(|_| {
                Error::transport(format!(
                    "unexpected version identifier '{number}' in metadata response"
                ))
            })?;
            versions.push(SecretVersion {
                version,
                created_time: entry.created_time,
                deletion_time: entry.deletion_time,
                destroyed: entry.destroyed,
            });
        }
        versions.sort_by_key(|v| v.version);

        Ok(SecretMetadata {
            current_version: data.current_version,
            created_time: data.created_time,
            updated_time: data.updated_time,
            versions,
        })
    }

    /// List an exact folder; 404 means "no children" and is normalized
    /// to an empty vector.
    async fn list_folder(&self, engine: &str, folder: &str) -> Result<Vec<String>> {
        let url = self.kv_url(engine, "metadata", folder);
        let request = self.request(Method::GET, &url)?.query(&[("list", "true")]);
        let response = self.send(request).await?;
        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        let response = Self::expect_success(response, &display_path(engine, folder)).await?;
        let body: VaultResponse<ListData> = parse_body(response).await?;
        let mut keys = body.data.keys;
        keys.sort();
        Ok(keys)
    }

    /// Resolve the merge source for an append-style write: the existing
    /// bundle if the parent folder lists it, otherwise the payload goes
    /// through unchanged (first write behaves as replace).
    async fn merge_with_existing(
        &self,
        engine: &str,
        path: &str,
        data: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let (parent, leaf) = path::split_parent(path);
        let siblings = self.list_folder(engine, parent.unwrap_or_default()).await?;
        if !siblings.iter().any(|name| name == leaf) {
            debug!(engine, path, "no existing bundle; writing payload as-is");
            return Ok(data);
        }

        let current = match self.read(engine, path, None).await {
            Ok(bundle) => bundle,
            // Listed a moment ago but gone now; fall back to a plain write
            Err(e) if e.is_not_found() => return Ok(data),
            Err(e) => return Err(e),
        };
        debug!(
            engine,
            path,
            existing_keys = current.len(),
            "merging payload into existing bundle"
        );
        Ok(merge_payload(&current.data, &data))
    }

    /// POST a payload to the data endpoint and fold the server-assigned
    /// revision metadata into the returned bundle.
    async fn post_data(
        &self,
        engine: &str,
        path: &str,
        payload: BTreeMap<String, String>,
        cas: Option<u64>,
    ) -> Result<SecretBundle> {
        let url = self.kv_url(engine, "data", path);
        let body = WriteBody {
            data: &payload,
            options: cas.map(|version| WriteOptions { cas: version }),
        };
        let request = self.request(Method::POST, &url)?.json(&body);
        let response = self.send(request).await?;
        let response = Self::expect_success(response, &display_path(engine, path)).await?;
        let meta: VaultResponse<VersionMeta> = parse_body(response).await?;

        let bundle = SecretBundle::new(
            payload,
            BundleVersion {
                version: meta.data.version,
                created_time: meta.data.created_time,
            },
        );
        info!(
            engine,
            path,
            version = bundle.metadata.version,
            keys = bundle.len(),
            "wrote secret bundle"
        );
        Ok(bundle)
    }

    /// Absolute URL for a KV v2 endpoint (`data`, `metadata`, `subkeys`)
    fn kv_url(&self, engine: &str, kind: &str, path: &str) -> String {
        let engine = path::encode_component(engine.trim().trim_matches('/'));
        if path.is_empty() {
            format!("{}/v1/{engine}/{kind}", self.address())
        } else {
            format!("{}/v1/{engine}/{kind}/{}", self.address(), path::encode(path))
        }
    }
}

/// Validate write inputs and return the normalized path
fn checked_write_input(
    engine: &str,
    path: &str,
    data: &BTreeMap<String, String>,
) -> Result<String> {
    path::ensure_component(engine, "engine path")?;
    let normalized = path::normalize(path);
    path::ensure_component(&normalized, "secret path")?;
    if data.is_empty() {
        return Err(Error::precondition("write payload must not be empty"));
    }
    Ok(normalized)
}

/// Human-readable address for error contexts
fn display_path(engine: &str, path: &str) -> String {
    let engine = engine.trim().trim_matches('/');
    if path.is_empty() {
        engine.to_string()
    } else {
        format!("{engine}/{path}")
    }
}

/// Address plus the pinned revision when one was requested
fn display_target(engine: &str, path: &str, version: Option<u64>) -> String {
    match version {
        Some(v) => format!("{} (version {v})", display_path(engine, path)),
        None => display_path(engine, path),
    }
}

/// Stored values are strings; anything else the store hands back is
/// rendered as compact JSON so no key silently disappears.
fn coerce_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::transport(format!("malformed response body: {e}")))
}

#[derive(Serialize)]
struct WriteBody<'a> {
    data: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<WriteOptions>,
}

#[derive(Serialize)]
struct WriteOptions {
    cas: u64,
}

#[derive(Deserialize)]
struct VaultResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct ListData {
    keys: Vec<String>,
}

#[derive(Deserialize)]
struct SubkeysData {
    subkeys: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ReadData {
    data: BTreeMap<String, serde_json::Value>,
    metadata: VersionMeta,
}

#[derive(Deserialize)]
struct VersionMeta {
    version: u64,
    created_time: DateTime<Utc>,
}

#[derive(Deserialize)]
struct MetadataData {
    current_version: u64,
    created_time: DateTime<Utc>,
    updated_time: DateTime<Utc>,
    versions: BTreeMap<String, VersionEntry>,
}

#[derive(Deserialize)]
struct VersionEntry {
    created_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "empty_time_as_none")]
    deletion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    destroyed: bool,
}

/// The store reports "never deleted" as an empty string, not null
fn empty_time_as_none<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}
