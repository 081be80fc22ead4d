#![doc = "Filesystem object store: the CLI's concrete implementation of the core `ObjectStore` contract."]
//
//! # LocalObjectStore
//!
//! Objects live as plain files under a root directory. Each upload also writes
//! a `{name}.meta.json` sidecar holding the content type and a generation id.
//!
//! Retrieval URLs are `file://` URLs carrying `generation`, `expires` (unix
//! seconds) and a hex HMAC-SHA256 `signature`, keyed with the signing key,
//! over `{object}:{generation}:{expires}`. Use
//! [`LocalObjectStore::verify_signed_url`] to resolve one back to a file.
//!
//! Object names are relative, `/`-separated, and may not leave the root.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kwitansi_core::contract::{ObjectStore, StoreError, StoredObject};
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use subtle::ConstantTimeEq;
use url::Url;
use uuid::Uuid;

const META_SUFFIX: &str = ".meta.json";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    signing_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    content_type: String,
    generation: String,
    size: u64,
    uploaded_at: DateTime<Utc>,
}

impl LocalObjectStore {
    /// Store rooted at `root`; the directory is created if missing.
    pub fn new(root: impl Into<PathBuf>, signing_key: impl Into<String>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            tracing::error!(error = ?e, root = %root.display(), "Failed to create storage root");
            e
        })?;
        let root = std::fs::canonicalize(&root)?;
        let signing_key = signing_key.into();
        tracing::info!(
            root = %root.display(),
            signing_key_set = !signing_key.is_empty(),
            "Initialized LocalObjectStore"
        );
        Ok(Self { root, signing_key })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object name to its file, rejecting names that escape the root.
    pub fn object_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        let mut resolved = self.root.clone();
        let mut has_file = false;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    has_file = true;
                }
                Component::CurDir => {}
                _ => return Err(format!("invalid object name {name:?}").into()),
            }
        }
        if !has_file {
            return Err(format!("invalid object name {name:?}").into());
        }
        Ok(resolved)
    }

    fn signature(&self, object: &str, generation: &str, expires: i64) -> Result<String, StoreError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_key.as_bytes())
            .map_err(|e| format!("invalid signing key: {e}"))?;
        mac.update(format!("{object}:{generation}:{expires}").as_bytes());
        Ok(format!("{:x}", mac.finalize().into_bytes()))
    }

    /// Check a URL issued by [`ObjectStore::signed_read_url`] at time `now` and
    /// return the file it grants access to.
    pub fn verify_signed_url(&self, url: &str, now: DateTime<Utc>) -> Result<PathBuf, StoreError> {
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "file" {
            return Err(format!("unsupported URL scheme {:?}", parsed.scheme()).into());
        }
        let path = parsed
            .to_file_path()
            .map_err(|_| format!("URL {url:?} is not a file path"))?;
        let object = path
            .strip_prefix(&self.root)
            .map_err(|_| "URL points outside the storage root")?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let query = |key: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .ok_or_else(|| format!("URL is missing {key}"))
        };
        let generation = query("generation")?;
        let expires: i64 = query("expires")?.parse()?;
        let signature = query("signature")?;

        let expected = self.signature(&object, &generation, expires)?;
        let matches = signature.len() == expected.len()
            && bool::from(signature.as_bytes().ct_eq(expected.as_bytes()));
        if !matches {
            tracing::warn!(object = %object, "Rejected URL with bad signature");
            return Err("signature mismatch".into());
        }
        if now.timestamp() >= expires {
            tracing::warn!(object = %object, expires, "Rejected expired URL");
            return Err("URL has expired".into());
        }

        let meta_path = self.object_path(&format!("{object}{META_SUFFIX}"))?;
        let meta: ObjectMeta = serde_json::from_slice(&std::fs::read(meta_path)?)?;
        if meta.generation != generation {
            return Err("object has been replaced since the URL was issued".into());
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn download(&self, object: &str, dest_dir: &Path) -> Result<PathBuf, StoreError> {
        let source = self.object_path(object)?;
        let file_name = source
            .file_name()
            .ok_or_else(|| format!("invalid object name {object:?}"))?;
        tokio::fs::create_dir_all(dest_dir).await?;
        let local = dest_dir.join(file_name);
        match tokio::fs::copy(&source, &local).await {
            Ok(bytes) => {
                tracing::info!(object, bytes, local = %local.display(), "Downloaded object");
                Ok(local)
            }
            Err(e) => {
                tracing::error!(error = ?e, object, "Failed to download object");
                Err(format!("object {object:?} could not be read: {e}").into())
            }
        }
    }

    async fn upload(
        &self,
        local: &Path,
        destination: &str,
        content_type: &str,
    ) -> Result<StoredObject, StoreError> {
        let target = self.object_path(destination)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = tokio::fs::copy(local, &target).await.map_err(|e| {
            tracing::error!(error = ?e, destination, "Failed to copy upload into store");
            e
        })?;

        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            generation: Uuid::new_v4().to_string(),
            size,
            uploaded_at: Utc::now(),
        };
        let meta_path = self.object_path(&format!("{destination}{META_SUFFIX}"))?;
        tokio::fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?).await?;

        tracing::info!(
            destination,
            content_type,
            size,
            generation = %meta.generation,
            "Stored object"
        );
        Ok(StoredObject {
            name: destination.to_string(),
            content_type: meta.content_type,
            generation: meta.generation,
        })
    }

    async fn signed_read_url(
        &self,
        object: &StoredObject,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let path = self.object_path(&object.name)?;
        let ttl = chrono::Duration::from_std(ttl)?;
        let expires = (Utc::now() + ttl).timestamp();
        let signature = self.signature(&object.name, &object.generation, expires)?;

        let mut url = Url::from_file_path(&path)
            .map_err(|_| format!("cannot build URL for {}", path.display()))?;
        url.query_pairs_mut()
            .append_pair("generation", &object.generation)
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);
        tracing::info!(object = %object.name, expires, "Issued signed read URL");
        Ok(url.into())
    }
}
