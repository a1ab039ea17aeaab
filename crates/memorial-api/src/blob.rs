use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::upload::content_type_for;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("blob service returned {0}")]
    Rejected(reqwest::StatusCode),

    #[error("not a URL owned by this store: {0}")]
    ForeignUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Public URL the browser loads the image from.
    pub url: String,
    /// Store-relative name, `{folder}/{stamp}-{filename}`.
    pub pathname: String,
}

/// Binary photo storage addressed by URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        bytes: Bytes,
        original_filename: &str,
        folder: &str,
    ) -> Result<StoredBlob, BlobError>;

    async fn try_delete(&self, url: &str) -> Result<(), BlobError>;

    /// Best-effort delete: the blob may already be gone, so failures are
    /// logged and swallowed.
    async fn delete(&self, url: &str) {
        if let Err(e) = self.try_delete(url).await {
            warn!("Failed to delete blob {}: {}", url, e);
        }
    }
}

/// Builds `{folder}/{millis}-{rand}-{filename}` with the filename reduced to
/// a safe character set.
pub fn blob_pathname(folder: &str, original_filename: &str) -> String {
    let stamp = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::random::<u32>() & 0xff_ffff;
    let name = sanitize_filename(original_filename);
    format!("{}/{}-{:06x}-{}", folder, stamp, suffix, name)
}

/// Strips directories and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

// -- Local disk --

/// Writes blobs under a directory that the server exposes at `url_prefix`.
pub struct LocalBlobStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalBlobStore {
    pub async fn new(dir: PathBuf, url_prefix: &str) -> Result<Self, BlobError> {
        fs::create_dir_all(&dir).await?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self {
            dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Maps a public URL back to a path inside `dir`, refusing anything that
    /// would escape it.
    fn path_for_url(&self, url: &str) -> Result<PathBuf, BlobError> {
        let relative = url
            .strip_prefix(&self.url_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| BlobError::ForeignUrl(url.to_string()))?;

        let relative = Path::new(relative);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(BlobError::ForeignUrl(url.to_string()));
        }
        Ok(self.dir.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        bytes: Bytes,
        original_filename: &str,
        folder: &str,
    ) -> Result<StoredBlob, BlobError> {
        let pathname = blob_pathname(folder, original_filename);
        let path = self.dir.join(&pathname);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;

        info!("Stored blob {} ({} bytes)", pathname, bytes.len());
        Ok(StoredBlob {
            url: format!("{}/{}", self.url_prefix, pathname),
            pathname,
        })
    }

    async fn try_delete(&self, url: &str) -> Result<(), BlobError> {
        let path = self.path_for_url(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted blob {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob {} already gone", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// -- Remote object store --

#[derive(Debug, Deserialize)]
struct PutBlobResponse {
    url: String,
}

/// HTTP object store speaking the Vercel Blob REST shape:
/// `PUT {api}/{pathname}` returns `{ "url": ... }`, and
/// `POST {api}/delete` takes `{ "urls": [...] }`.
pub struct RemoteBlobStore {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl RemoteBlobStore {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for RemoteBlobStore {
    async fn upload(
        &self,
        bytes: Bytes,
        original_filename: &str,
        folder: &str,
    ) -> Result<StoredBlob, BlobError> {
        let pathname = blob_pathname(folder, original_filename);
        let content_type =
            content_type_for(original_filename).unwrap_or("application/octet-stream");

        let response = self
            .client
            .put(format!("{}/{}", self.api_url, pathname))
            .bearer_auth(&self.token)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BlobError::Rejected(response.status()));
        }

        let body: PutBlobResponse = response.json().await?;
        info!("Uploaded blob {} to remote store", pathname);
        Ok(StoredBlob {
            url: body.url,
            pathname,
        })
    }

    async fn try_delete(&self, url: &str) -> Result<(), BlobError> {
        let response = self
            .client
            .post(format!("{}/delete", self.api_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "urls": [url] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BlobError::Rejected(response.status()));
        }
        Ok(())
    }
}
