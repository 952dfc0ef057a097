//! Values produced by the pipeline: rendered pages and the extraction result.

use crate::config::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page image, encoded as a self-describing data URI.
///
/// Pages only live for the duration of one extraction and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    /// 0-based position in physical page order.
    pub ordinal: usize,
    /// Media type embedded in `payload` (e.g. `image/png`).
    pub media_type: String,
    /// `data:<media_type>;base64,<bytes>`.
    pub payload: String,
}

impl RenderedPage {
    /// The raster format, when the page is PNG or JPEG.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.media_type)
    }
}

/// Text extracted from a document, plus the service's per-page annotations.
///
/// Either the full result of a successful call or [`ExtractionResult::empty`];
/// never a half-built value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted text, at most `max_chars` characters.
    pub text: String,
    /// Opaque per-page annotations, in submission order.
    pub pages: Vec<Value>,
}

impl ExtractionResult {
    /// The canonical empty result: `{ text: "", pages: [] }`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True for the canonical empty result.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.pages.is_empty()
    }
}
