//! Error types for the edgequake-ocr library.
//!
//! Every failure inside the pipeline is an [`OcrError`]. Internal functions
//! return `Result<_, OcrError>` and propagate with `?`; only the two public
//! entry points ([`crate::pipeline::render::PageRenderer::render`] and
//! [`crate::extract::OcrExtractor::extract_document_text`]) turn an error into
//! the empty value and report it through `tracing`.
//!
//! [`Stage`] tags each reported failure with the part of the pipeline that
//! produced it so operators can tell a broken rasterizer from a slow service.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All failures the extraction pipeline can hit internally.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Document store errors ─────────────────────────────────────────────
    /// The store has no document with this id.
    #[error("Document '{id}' not found in the document store")]
    DocumentNotFound { id: String },

    /// Fetching document metadata failed.
    #[error("Document store request for '{id}' failed: {reason}")]
    StoreRequest { id: String, reason: String },

    /// Fetching or persisting the document bytes failed.
    #[error("Failed to download document '{id}': {reason}")]
    DownloadFailed { id: String, reason: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The rasterizer binary could not be spawned.
    #[error("Rasterizer '{program}' not found\nInstall poppler-utils or point OCR_PDFTOPPM at pdftoppm.")]
    RasterizerMissing { program: PathBuf },

    /// The rasterizer ran but exited unsuccessfully.
    #[error("Rasterizer exited with {status}: {stderr}")]
    RasterizerFailed { status: String, stderr: String },

    /// Reading input or rasterizer output from disk failed.
    #[error("I/O error on '{path}': {source}")]
    RenderIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── OCR service errors ────────────────────────────────────────────────
    /// The request never produced a response (connect, TLS, body read).
    #[error("OCR service request failed: {reason}")]
    ServiceRequest { reason: String },

    /// The service answered with a non-2xx status.
    #[error("OCR service error: {status}")]
    ServiceStatus { status: u16 },

    /// The request was aborted because it outlived its budget.
    #[error("OCR service call aborted after {timeout_ms}ms")]
    ServiceTimeout { timeout_ms: u64 },

    /// The response body is not JSON.
    #[error("OCR service returned a malformed response: {detail}")]
    MalformedResponse { detail: String },
}

impl OcrError {
    /// Wrap an I/O error with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OcrError::RenderIo {
            path: path.into(),
            source,
        }
    }
}

/// The pipeline stage a reported failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Store lookup, download, rasterization, output reads.
    Render,
    /// The OCR service round trip.
    Call,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Render => f.write_str("render"),
            Stage::Call => f.write_str("call"),
        }
    }
}
