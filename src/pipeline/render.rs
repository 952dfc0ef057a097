//! Page rendering: document id → ordered page images.
//!
//! [`PageRenderer::render`] is soft-fail by construction. Everything that can
//! go wrong (store lookup, download, missing `pdftoppm`, a crashing render,
//! unreadable output) is an [`OcrError`] inside [`PageRenderer::try_render`];
//! `render` logs it and returns no pages. Callers only ever see a (possibly
//! empty) page list.
//!
//! ## Resource lifetime
//!
//! Both transient resources are guards owned by the call that created them:
//!
//! * the downloaded copy of the document → [`ScopedFile`]
//! * the rasterizer's output directory → [`tempfile::TempDir`]
//!
//! They are dropped on every exit path, including the early returns for
//! images and unsupported types.

use crate::config::{RenderOptions, RenderOverrides};
use crate::error::{OcrError, Stage};
use crate::output::RenderedPage;
use crate::pipeline::encode::encode_data_uri;
use crate::pipeline::rasterize::{collect_page_files, Pdftoppm, RasterJob, Rasterizer, OUTPUT_STEM};
use crate::pipeline::scoped::ScopedFile;
use crate::store::DocumentStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Media type routed through the rasterizer.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Turns stored documents into page images.
#[derive(Clone)]
pub struct PageRenderer {
    store: Arc<dyn DocumentStore>,
    rasterizer: Arc<dyn Rasterizer>,
    defaults: RenderOverrides,
    scratch_dir: Option<PathBuf>,
}

impl std::fmt::Debug for PageRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRenderer")
            .field("store", &"<dyn DocumentStore>")
            .field("rasterizer", &"<dyn Rasterizer>")
            .field("defaults", &self.defaults)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

impl PageRenderer {
    /// Renderer reading from `store` and rasterising with `pdftoppm` on `PATH`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            rasterizer: Arc::new(Pdftoppm::default()),
            defaults: RenderOverrides::default(),
            scratch_dir: None,
        }
    }

    /// Replace the rasterizer.
    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Configured fallbacks (the `vision.*` layer) for options a call leaves unset.
    pub fn defaults(mut self, defaults: RenderOverrides) -> Self {
        self.defaults = defaults;
        self
    }

    /// Create rendering directories under `dir` instead of the system temp dir.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Render `document_id` into page images. Never fails; errors yield `[]`.
    ///
    /// * `image/*` documents come back as a single page carrying the original
    ///   bytes and declared media type.
    /// * `application/pdf` documents are rasterised, pages `1..=max_pages`.
    /// * Anything else yields no pages.
    pub async fn render(&self, document_id: &str, request: &RenderOverrides) -> Vec<RenderedPage> {
        let options = request.resolve(&self.defaults);
        match self.try_render(document_id, options).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(
                    document_id,
                    stage = %Stage::Render,
                    error = %e,
                    "Failed to render document for OCR"
                );
                Vec::new()
            }
        }
    }

    /// Fallible core of [`PageRenderer::render`].
    pub async fn try_render(
        &self,
        document_id: &str,
        options: RenderOptions,
    ) -> Result<Vec<RenderedPage>, OcrError> {
        let document = self.store.get_document(document_id).await?;
        let download = self.store.download_document(document_id).await?;
        let downloaded = ScopedFile::new(download.file_path);

        if document.mime_type.starts_with("image/") {
            let bytes = tokio::fs::read(downloaded.path())
                .await
                .map_err(|e| OcrError::io(downloaded.path(), e))?;
            debug!("Document {} is {}; sending as-is", document_id, document.mime_type);
            return Ok(vec![RenderedPage {
                ordinal: 0,
                media_type: document.mime_type.clone(),
                payload: encode_data_uri(&document.mime_type, &bytes),
            }]);
        }

        if document.mime_type != PDF_MIME_TYPE {
            debug!(
                "Unsupported mime type for OCR: {} (document {})",
                if document.mime_type.is_empty() { "unknown" } else { document.mime_type.as_str() },
                document_id
            );
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let pages = self.rasterize_pdf(downloaded.path(), options).await?;
        info!(
            "Rendered {} pages of document {} in {}ms",
            pages.len(),
            document_id,
            start.elapsed().as_millis()
        );
        Ok(pages)
    }

    async fn rasterize_pdf(
        &self,
        pdf_path: &Path,
        options: RenderOptions,
    ) -> Result<Vec<RenderedPage>, OcrError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("edgequake-ocr-");
        let render_dir = match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir).map_err(|e| OcrError::io(dir, e))?,
            None => builder
                .tempdir()
                .map_err(|e| OcrError::io(std::env::temp_dir(), e))?,
        };

        let output_prefix = render_dir.path().join(OUTPUT_STEM);
        let job = RasterJob {
            input: pdf_path,
            output_prefix: &output_prefix,
            format: options.image_format,
            first_page: 1,
            last_page: options.max_pages,
            dpi: options.dpi,
        };
        self.rasterizer.rasterize(&job).await?;

        let files = collect_page_files(render_dir.path(), options.image_format).await?;

        // Reads may finish in any order; try_join_all keeps input order.
        let contents = futures::future::try_join_all(files.iter().map(|path| async move {
            tokio::fs::read(path).await.map_err(|e| OcrError::io(path, e))
        }))
        .await?;

        let mime_type = options.image_format.mime_type();
        Ok(contents
            .iter()
            .enumerate()
            .map(|(ordinal, bytes)| RenderedPage {
                ordinal,
                media_type: mime_type.to_string(),
                payload: encode_data_uri(mime_type, bytes),
            })
            .collect())
    }
}
