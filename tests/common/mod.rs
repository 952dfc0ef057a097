//! Shared fixtures for the integration tests.
//!
//! * [`FakeRasterizer`] stands in for `pdftoppm`: it writes real image files
//!   named the way `pdftoppm` names them, one per page, with the page number
//!   encoded in the red channel so tests can check order after a round trip.
//! * [`RecordingStore`] wraps [`FsStore`] and remembers every download path so
//!   tests can assert the file is gone afterwards.
//! * [`Fixture`] owns a document root and a scratch directory.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_ocr::config::ImageFormat;
use edgequake_ocr::pipeline::encode::decode_data_uri;
use edgequake_ocr::{
    Document, DocumentStore, DownloadedDocument, FsStore, OcrError, PageRenderer, RasterJob,
    Rasterizer,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Rasterizer ───────────────────────────────────────────────────────────────

/// What a rasterizer was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedJob {
    pub input: PathBuf,
    pub format: ImageFormat,
    pub first_page: u32,
    pub last_page: u32,
    pub dpi: u32,
}

/// Pretends every PDF has `page_count` pages.
pub struct FakeRasterizer {
    pub page_count: u32,
    /// Write `page-01.png` style names, as pdftoppm does past nine pages.
    pub zero_pad: bool,
    /// Extra file names dropped into the output directory.
    pub extra_files: Vec<String>,
    pub jobs: Mutex<Vec<RecordedJob>>,
}

impl FakeRasterizer {
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count,
            zero_pad: false,
            extra_files: Vec::new(),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Vec<RecordedJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, job: &RasterJob<'_>) -> Result<(), OcrError> {
        self.jobs.lock().unwrap().push(RecordedJob {
            input: job.input.to_path_buf(),
            format: job.format,
            first_page: job.first_page,
            last_page: job.last_page,
            dpi: job.dpi,
        });
        assert!(job.input.exists(), "rasterizer input must exist while rendering");

        let last = job.last_page.min(self.page_count);
        // Highest page first so directory order never matches page order by accident.
        for page in (job.first_page..=last).rev() {
            let number = if self.zero_pad {
                format!("{page:02}")
            } else {
                page.to_string()
            };
            let mut name: OsString = job.output_prefix.as_os_str().to_owned();
            name.push(format!("-{number}.{}", job.format.extension()));
            write_page_image(Path::new(&name), page as u8, job.format);
        }

        let dir = job.output_prefix.parent().expect("prefix has a parent");
        for extra in &self.extra_files {
            write_page_image(&dir.join(extra), 0, ImageFormat::Png);
        }
        Ok(())
    }
}

/// A 4×4 image whose red channel is `marker`.
pub fn write_page_image(path: &Path, marker: u8, format: ImageFormat) {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([marker, 0, 0]));
    let format = match format {
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
    };
    img.save_with_format(path, format).expect("write page image");
}

/// Read back the marker of a PNG page payload.
pub fn page_marker(payload: &str) -> u8 {
    let (_, bytes) = decode_data_uri(payload).expect("valid data uri");
    let img = image::load_from_memory(&bytes).expect("decodable image").to_rgb8();
    img.get_pixel(0, 0)[0]
}

// ── Store ────────────────────────────────────────────────────────────────────

/// [`FsStore`] that counts calls and remembers download paths.
pub struct RecordingStore {
    inner: FsStore,
    pub calls: AtomicUsize,
    pub downloads: Mutex<Vec<PathBuf>>,
}

impl RecordingStore {
    pub fn new(inner: FsStore) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> Vec<PathBuf> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn get_document(&self, id: &str) -> Result<Document, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_document(id).await
    }

    async fn download_document(&self, id: &str) -> Result<DownloadedDocument, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let download = self.inner.download_document(id).await?;
        self.downloads
            .lock()
            .unwrap()
            .push(download.file_path.clone());
        Ok(download)
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────────

/// A document root plus a scratch directory for downloads and renders.
pub struct Fixture {
    pub root: TempDir,
    pub scratch: TempDir,
    pub store: Arc<RecordingStore>,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::new(
            FsStore::new(root.path()).scratch_dir(scratch.path()),
        ));
        Self {
            root,
            scratch,
            store,
        }
    }

    /// Add a document under the root.
    pub fn add(&self, name: &str, bytes: &[u8]) -> &Self {
        std::fs::write(self.root.path().join(name), bytes).unwrap();
        self
    }

    /// A minimal stand-in PDF; the fake rasterizer never parses it.
    pub fn add_pdf(&self, name: &str) -> &Self {
        self.add(name, b"%PDF-1.7\n%%EOF\n")
    }

    /// Renderer over this fixture's store and scratch dir.
    pub fn renderer(&self, rasterizer: Arc<dyn Rasterizer>) -> PageRenderer {
        PageRenderer::new(self.store.clone())
            .rasterizer(rasterizer)
            .scratch_dir(self.scratch.path())
    }

    /// True when no download or render directory survived.
    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path())
            .unwrap()
            .next()
            .is_none()
    }

    /// Every recorded download has been deleted.
    pub fn downloads_removed(&self) -> bool {
        let downloads = self.store.downloads();
        !downloads.is_empty() && downloads.iter().all(|p| !p.exists())
    }
}
