//! Document store: where document metadata and bytes come from.
//!
//! The pipeline only needs two things from a store: the media type of a
//! document and a local file holding its bytes. [`DocumentStore`] captures
//! exactly that, so the renderer can be pointed at a Paperless-ngx instance
//! ([`PaperlessStore`]), a plain directory ([`FsStore`]) or a test double.
//!
//! ## Ownership of downloads
//!
//! [`DocumentStore::download_document`] always hands back a **fresh** file
//! that the caller owns and deletes. Stores never return a path to the
//! original document, so deleting the download can never destroy data.

use crate::error::OcrError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Metadata the pipeline reads from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    /// Declared media type; empty when the store does not know it.
    pub mime_type: String,
}

/// A downloaded copy of a document. The caller owns `file_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedDocument {
    pub file_path: PathBuf,
}

/// Source of documents for the renderer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch metadata for `id`.
    async fn get_document(&self, id: &str) -> Result<Document, OcrError>;

    /// Copy the bytes of `id` into a new local file owned by the caller.
    async fn download_document(&self, id: &str) -> Result<DownloadedDocument, OcrError>;
}

/// Create an empty named temp file under `scratch_dir` (or the system temp dir).
fn reserve_temp_file(scratch_dir: Option<&Path>) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("edgequake-ocr-download-");
    match scratch_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

/// Detach a temp file from its guard so ownership passes to the caller.
fn hand_over(tmp: NamedTempFile, id: &str) -> Result<DownloadedDocument, OcrError> {
    let file_path = tmp
        .into_temp_path()
        .keep()
        .map_err(|e| OcrError::DownloadFailed {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
    debug!("Downloaded document {} to {}", id, file_path.display());
    Ok(DownloadedDocument { file_path })
}

// ── Paperless-ngx ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PaperlessDocument {
    #[serde(default)]
    mime_type: Option<String>,
}

/// A Paperless-ngx instance reached over its REST API.
#[derive(Debug, Clone)]
pub struct PaperlessStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    scratch_dir: Option<PathBuf>,
}

impl PaperlessStore {
    /// Store rooted at `base_url` (e.g. `http://paperless:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Store using a caller-configured HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            scratch_dir: None,
        }
    }

    /// Send `Authorization: Token <token>` with every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Write downloads under `dir` instead of the system temp dir.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Token {token}")),
            None => request,
        }
    }

    fn document_url(&self, id: &str) -> Result<String, OcrError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(OcrError::StoreRequest {
                id: id.to_string(),
                reason: "Paperless document ids are numeric".into(),
            });
        }
        Ok(format!("{}/api/documents/{}/", self.base_url, id))
    }
}

#[async_trait]
impl DocumentStore for PaperlessStore {
    async fn get_document(&self, id: &str) -> Result<Document, OcrError> {
        let url = self.document_url(id)?;
        let store_err = |reason: String| OcrError::StoreRequest {
            id: id.to_string(),
            reason,
        };

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| store_err(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(OcrError::DocumentNotFound { id: id.to_string() });
        }
        if !response.status().is_success() {
            return Err(store_err(format!("HTTP {}", response.status())));
        }

        let body: PaperlessDocument = response
            .json()
            .await
            .map_err(|e| store_err(e.to_string()))?;

        Ok(Document {
            id: id.to_string(),
            mime_type: body.mime_type.unwrap_or_default(),
        })
    }

    async fn download_document(&self, id: &str) -> Result<DownloadedDocument, OcrError> {
        let url = format!("{}download/", self.document_url(id)?);
        let download_err = |reason: String| OcrError::DownloadFailed {
            id: id.to_string(),
            reason,
        };

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(OcrError::DocumentNotFound { id: id.to_string() });
        }
        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        let tmp = reserve_temp_file(self.scratch_dir.as_deref())
            .map_err(|e| download_err(format!("Failed to create temp file: {e}")))?;
        tokio::fs::write(tmp.path(), &bytes)
            .await
            .map_err(|e| download_err(format!("Failed to write temp file: {e}")))?;

        hand_over(tmp, id)
    }
}

// ── Local directory ──────────────────────────────────────────────────────

/// Documents stored as files under a root directory; the id is the relative
/// file name.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scratch_dir: None,
        }
    }

    /// Write downloads under `dir` instead of the system temp dir.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Map an id to a file under the root, refusing anything that escapes it.
    fn locate(&self, id: &str) -> Result<PathBuf, OcrError> {
        let relative = Path::new(id);
        let escapes = id.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(OcrError::StoreRequest {
                id: id.to_string(),
                reason: "document id must be a path relative to the store root".into(),
            });
        }

        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(OcrError::DocumentNotFound { id: id.to_string() });
        }
        Ok(path)
    }
}

#[async_trait]
impl DocumentStore for FsStore {
    async fn get_document(&self, id: &str) -> Result<Document, OcrError> {
        let path = self.locate(id)?;
        Ok(Document {
            id: id.to_string(),
            mime_type: guess_mime_type(&path).to_string(),
        })
    }

    async fn download_document(&self, id: &str) -> Result<DownloadedDocument, OcrError> {
        let source = self.locate(id)?;
        let download_err = |reason: String| OcrError::DownloadFailed {
            id: id.to_string(),
            reason,
        };

        let tmp = reserve_temp_file(self.scratch_dir.as_deref())
            .map_err(|e| download_err(format!("Failed to create temp file: {e}")))?;
        tokio::fs::copy(&source, tmp.path())
            .await
            .map_err(|e| download_err(format!("Failed to copy {}: {e}", source.display())))?;

        hand_over(tmp, id)
    }
}

/// Guess a media type from a file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
