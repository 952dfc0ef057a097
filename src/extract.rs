//! Extraction entry point: document id → text.
//!
//! [`OcrExtractor::extract_document_text`] walks a short, retry-free state
//! machine:
//!
//! ```text
//! disabled ─────────────────────────────────────────────▶ empty
//! start ─▶ render ─┬─ no pages ─────────────────────────▶ empty
//!                  └─ pages ─▶ call ─┬─ error / timeout ─▶ empty
//!                                    └─ response ─▶ truncate ─▶ done
//! ```
//!
//! Every terminal state except `done` returns [`ExtractionResult::empty`].
//! Callers cannot tell "disabled", "unsupported document" and "service down"
//! apart; operators can, from the `warn!` events carrying `document_id` and
//! `stage`.

use crate::config::{ExtractionOptions, ExtractionOverrides, OcrSettings, RenderOverrides};
use crate::error::{OcrError, Stage};
use crate::output::ExtractionResult;
use crate::pipeline::client::OcrClient;
use crate::pipeline::render::PageRenderer;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Renders documents and sends them to the OCR service.
///
/// Holds no per-call state, so one extractor can serve any number of
/// concurrent extractions.
#[derive(Debug, Clone)]
pub struct OcrExtractor {
    settings: OcrSettings,
    renderer: PageRenderer,
    client: OcrClient,
}

impl OcrExtractor {
    /// Extractor reading from `store`, rendering with `pdftoppm` and calling
    /// the service at `settings.service_url`.
    pub fn new(settings: OcrSettings, store: Arc<dyn DocumentStore>) -> Self {
        let renderer = PageRenderer::new(store).defaults(settings.vision);
        let client = OcrClient::new(&settings.service_url);
        Self {
            settings,
            renderer,
            client,
        }
    }

    /// Replace the renderer (custom rasterizer, scratch directory, …).
    pub fn renderer(mut self, renderer: PageRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the service client.
    pub fn client(mut self, client: OcrClient) -> Self {
        self.client = client;
        self
    }

    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }

    /// Options an extraction with `overrides` would run with.
    pub fn resolve_options(&self, overrides: &ExtractionOverrides) -> ExtractionOptions {
        overrides.resolve(&self.settings.ocr)
    }

    /// Extract the text of `document_id`. Never fails; see the module docs.
    pub async fn extract_document_text(
        &self,
        document_id: &str,
        overrides: &ExtractionOverrides,
    ) -> ExtractionResult {
        if !self.settings.enabled {
            debug!("OCR disabled; skipping document {}", document_id);
            return ExtractionResult::empty();
        }

        let options = self.resolve_options(overrides);
        match self.try_extract(document_id, &options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    document_id,
                    stage = %Stage::Call,
                    error = %e,
                    "OCR extraction failed"
                );
                ExtractionResult::empty()
            }
        }
    }

    async fn try_extract(
        &self,
        document_id: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractionResult, OcrError> {
        let start = Instant::now();

        let request = RenderOverrides::from(options.render_options());
        let pages = self.renderer.render(document_id, &request).await;
        if pages.is_empty() {
            debug!("No page images for document {}", document_id);
            return Ok(ExtractionResult::empty());
        }

        let response = self.client.submit(&pages, options).await?;
        if response.text.is_empty() {
            return Ok(ExtractionResult {
                text: String::new(),
                pages: response.pages,
            });
        }

        let text = truncate_chars(response.text, options.max_chars);
        info!(
            "OCR complete for document {}: {} pages sent, {} chars in {}ms",
            document_id,
            pages.len(),
            text.chars().count(),
            start.elapsed().as_millis()
        );

        Ok(ExtractionResult {
            text,
            pages: response.pages,
        })
    }
}

/// One-shot extraction with a throwaway [`OcrExtractor`].
///
/// Prefer building an extractor once and reusing it; this helper exists for
/// scripts and tests that extract a single document.
pub async fn extract_document_text(
    settings: OcrSettings,
    store: Arc<dyn DocumentStore>,
    document_id: &str,
    overrides: &ExtractionOverrides,
) -> ExtractionResult {
    OcrExtractor::new(settings, store)
        .extract_document_text(document_id, overrides)
        .await
}

/// Keep at most `max_chars` characters of `text`. Hard cut, no word boundary.
pub fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        debug!("Truncating OCR text to {} chars", max_chars);
        text.truncate(byte_idx);
    }
    text
}
