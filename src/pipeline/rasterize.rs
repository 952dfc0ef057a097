//! PDF rasterisation through an external `pdftoppm` process.
//!
//! ## Why a subprocess?
//!
//! Poppler's `pdftoppm` is present on every OCR host we deploy to, handles
//! every PDF flavour we have thrown at it, and keeps the PDF parser out of our
//! address space: a malformed document can crash the child, never the service.
//! The call is awaited through `tokio::process`, so a slow render does not
//! block other extractions running on the same runtime.
//!
//! ## Output naming
//!
//! `pdftoppm ... <dir>/page` writes `page-1.png`, `page-2.png`, … and
//! zero-pads once the document passes nine pages (`page-01.png`). Directory
//! listings come back in arbitrary order, so [`collect_page_files`] sorts on
//! the parsed page number, never on the file name.

use crate::config::ImageFormat;
use crate::error::OcrError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::debug;

/// File-name stem passed to the rasterizer; output files are `page-<N>.<ext>`.
pub const OUTPUT_STEM: &str = "page";

static RE_PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"page-(\d+)").unwrap());

/// One rasterisation request.
#[derive(Debug, Clone)]
pub struct RasterJob<'a> {
    /// The PDF to render.
    pub input: &'a Path,
    /// Output path prefix; the rasterizer appends `-<N>.<ext>`.
    pub output_prefix: &'a Path,
    pub format: ImageFormat,
    /// 1-based, inclusive.
    pub first_page: u32,
    /// 1-based, inclusive. May exceed the document's page count.
    pub last_page: u32,
    pub dpi: u32,
}

/// Renders PDF pages to image files.
///
/// Implementations must write one `page-<N>.<ext>` file per rendered page
/// next to `job.output_prefix` and return only once they are all on disk.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, job: &RasterJob<'_>) -> Result<(), OcrError>;
}

/// Poppler `pdftoppm` invoked as a child process.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    program: PathBuf,
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl Pdftoppm {
    /// Use `program` (a name on `PATH` or an absolute path).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument vector for `job`, in the order pdftoppm expects.
    pub fn args(job: &RasterJob<'_>) -> Vec<OsString> {
        let format_flag = match job.format {
            ImageFormat::Jpeg => "-jpeg",
            ImageFormat::Png => "-png",
        };
        vec![
            format_flag.into(),
            "-f".into(),
            job.first_page.to_string().into(),
            "-l".into(),
            job.last_page.to_string().into(),
            "-r".into(),
            job.dpi.to_string().into(),
            job.input.into(),
            job.output_prefix.into(),
        ]
    }
}

#[async_trait]
impl Rasterizer for Pdftoppm {
    async fn rasterize(&self, job: &RasterJob<'_>) -> Result<(), OcrError> {
        let args = Self::args(job);
        debug!("Running {} {:?}", self.program.display(), args);

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::RasterizerMissing {
                        program: self.program.clone(),
                    }
                } else {
                    OcrError::io(&self.program, e)
                }
            })?;

        if !output.status.success() {
            return Err(OcrError::RasterizerFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Page number embedded in a rasterizer output name.
///
/// Names without a parseable number sort as page 0, ahead of page 1.
pub fn page_number(file_name: &str) -> u64 {
    RE_PAGE_NUMBER
        .captures(file_name)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// List the rasterizer's output files in `dir`, in ascending page order.
pub async fn collect_page_files(dir: &Path, format: ImageFormat) -> Result<Vec<PathBuf>, OcrError> {
    let prefix = format!("{OUTPUT_STEM}-");
    let suffix = format!(".{}", format.extension());

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| OcrError::io(dir, e))?;

    let mut pages: Vec<(u64, String)> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| OcrError::io(dir, e))? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with(&prefix) && name.ends_with(&suffix) {
            pages.push((page_number(&name), name));
        }
    }

    pages.sort();
    debug!("Rasterizer produced {} page files in {}", pages.len(), dir.display());

    Ok(pages.into_iter().map(|(_, name)| dir.join(name)).collect())
}
