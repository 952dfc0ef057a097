//! # edgequake-ocr
//!
//! Extract machine-readable text from stored documents (scans, photos, PDFs)
//! by rendering them to page images and handing those images to an OCR
//! vision service.
//!
//! ## Why render first?
//!
//! Scanned PDFs carry no text layer, and the text layer of born-digital PDFs
//! is often out of reading order. Rasterising every page and letting a vision
//! model read it gives one code path for both, and for plain image uploads.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document id
//!  │
//!  ├─ 1. Store      fetch media type, download bytes to a scoped temp file
//!  ├─ 2. Classify   image/* → as-is · application/pdf → rasterise · else → nothing
//!  ├─ 3. Rasterise  pdftoppm pages 1..=max_pages at `dpi` (subprocess)
//!  ├─ 4. Encode     page files → data:<mime>;base64,... in page order
//!  ├─ 5. OCR        one POST {service_url}/ocr, aborted after `timeout_ms`
//!  └─ 6. Bound      coerce response shape, cut text to `max_chars`
//! ```
//!
//! Every step is soft-fail: the entry point returns `{ text: "", pages: [] }`
//! instead of an error, and reports what went wrong through `tracing`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr::{ExtractionOverrides, OcrExtractor, OcrSettings, PaperlessStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OCR_ENABLED=yes OCR_SERVICE_URL=http://ocr:8000 ...
//!     let settings = OcrSettings::from_env()?;
//!     let store = PaperlessStore::new("http://paperless:8000").token("secret");
//!     let extractor = OcrExtractor::new(settings, Arc::new(store));
//!
//!     let result = extractor
//!         .extract_document_text("42", &ExtractionOverrides::new().max_pages(5))
//!         .await;
//!     println!("{}", result.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `dococr` binary (clap + anyhow + dotenvy + tracing-subscriber) |
//!
//! ## Runtime requirements
//!
//! PDF rendering shells out to Poppler's `pdftoppm`
//! (`apt install poppler-utils`, `brew install poppler`). Image documents do
//! not need it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConfigError, ExtractionOptions, ExtractionOverrides, ImageFormat, OcrSettings, RenderOptions,
    RenderOverrides,
};
pub use error::{OcrError, Stage};
pub use extract::{extract_document_text, OcrExtractor};
pub use output::{ExtractionResult, RenderedPage};
pub use pipeline::client::OcrClient;
pub use pipeline::rasterize::{Pdftoppm, RasterJob, Rasterizer};
pub use pipeline::render::PageRenderer;
pub use store::{Document, DocumentStore, DownloadedDocument, FsStore, PaperlessStore};
