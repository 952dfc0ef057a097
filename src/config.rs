//! Configuration types for document rendering and OCR extraction.
//!
//! Three layers decide every option of an extraction:
//!
//! 1. **Explicit**: the [`ExtractionOverrides`] passed with a single call
//! 2. **Configured**: the `ocr.*` layer of [`OcrSettings`]
//! 3. **Built-in defaults**: the `DEFAULT_*` constants below
//!
//! [`ExtractionOverrides::resolve`] merges them field by field into an
//! immutable [`ExtractionOptions`]. It is a pure function so the precedence
//! rules are tested without a service, a store or the environment.
//!
//! A field counts as "not provided" when it is `None`, zero, or (for the
//! prompt) empty. That way a stray `OCR_DPI=0` falls through to the default
//! instead of asking the rasterizer for a zero-resolution render.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default page cap for an extraction.
pub const DEFAULT_MAX_PAGES: u32 = 50;
/// Default rendering resolution.
pub const DEFAULT_DPI: u32 = 150;
/// Default instruction sent with the page images.
pub const DEFAULT_PROMPT: &str = "Convert to markdown.";
/// Default generation budget for the OCR model.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 4096;
/// Default budget for the OCR service round trip.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
/// Default cap on returned text, in characters.
pub const DEFAULT_MAX_CHARS: usize = 50_000;
/// Page cap used when the renderer is called directly without one.
pub const DEFAULT_RENDER_MAX_PAGES: u32 = 1;

// ── Image format ─────────────────────────────────────────────────────────

/// Raster format requested from the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless; the default.
    #[default]
    Png,
    /// Smaller payloads for large page counts.
    Jpeg,
}

impl ImageFormat {
    /// Parse a user- or config-supplied name. `jpeg` and `jpg` select JPEG,
    /// anything else selects PNG.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => ImageFormat::Jpeg,
            _ => ImageFormat::Png,
        }
    }

    /// Media type tagged onto encoded pages.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// File extension the rasterizer writes.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Map a media type back to a format, if it is one we render.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Png => f.write_str("png"),
            ImageFormat::Jpeg => f.write_str("jpeg"),
        }
    }
}

// ── Resolved options ─────────────────────────────────────────────────────

/// Fully resolved options for one extraction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionOptions {
    /// Last page handed to the rasterizer.
    pub max_pages: u32,
    /// Raster format of rendered PDF pages.
    pub image_format: ImageFormat,
    /// Rendering resolution.
    pub dpi: u32,
    /// Instruction sent alongside the images.
    pub prompt: String,
    /// Generation budget forwarded as `max_new_tokens`.
    pub max_new_tokens: u32,
    /// Abort the service call after this many milliseconds.
    pub timeout_ms: u64,
    /// Hard cap on returned text, in characters.
    pub max_chars: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            image_format: ImageFormat::Png,
            dpi: DEFAULT_DPI,
            prompt: DEFAULT_PROMPT.to_string(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl ExtractionOptions {
    /// The subset the renderer needs.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_pages: self.max_pages,
            image_format: self.image_format,
            dpi: self.dpi,
        }
    }
}

/// Fully resolved rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderOptions {
    pub max_pages: u32,
    pub image_format: ImageFormat,
    pub dpi: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_RENDER_MAX_PAGES,
            image_format: ImageFormat::Png,
            dpi: DEFAULT_DPI,
        }
    }
}

// ── Partial layers ───────────────────────────────────────────────────────

/// A partial set of extraction options: one layer of the precedence chain.
///
/// # Example
/// ```rust
/// use edgequake_ocr::config::{ExtractionOverrides, ImageFormat};
///
/// let explicit = ExtractionOverrides::new().max_pages(2).image_format(ImageFormat::Jpeg);
/// let configured = ExtractionOverrides::new().max_pages(10).dpi(300);
///
/// let options = explicit.resolve(&configured);
/// assert_eq!(options.max_pages, 2);
/// assert_eq!(options.dpi, 300);
/// assert_eq!(options.max_chars, 50_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOverrides {
    pub max_pages: Option<u32>,
    pub image_format: Option<ImageFormat>,
    pub dpi: Option<u32>,
    pub prompt: Option<String>,
    pub max_new_tokens: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub max_chars: Option<usize>,
}

impl ExtractionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_pages(mut self, n: u32) -> Self {
        self.max_pages = Some(n);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = Some(format);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn max_new_tokens(mut self, n: u32) -> Self {
        self.max_new_tokens = Some(n);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn max_chars(mut self, n: usize) -> Self {
        self.max_chars = Some(n);
        self
    }

    /// Merge `self` (explicit) over `configured` over the built-in defaults.
    pub fn resolve(&self, configured: &ExtractionOverrides) -> ExtractionOptions {
        ExtractionOptions {
            max_pages: layered(self.max_pages, configured.max_pages, DEFAULT_MAX_PAGES),
            image_format: self
                .image_format
                .or(configured.image_format)
                .unwrap_or_default(),
            dpi: layered(self.dpi, configured.dpi, DEFAULT_DPI),
            prompt: self
                .prompt
                .as_deref()
                .filter(|p| !p.is_empty())
                .or_else(|| configured.prompt.as_deref().filter(|p| !p.is_empty()))
                .unwrap_or(DEFAULT_PROMPT)
                .to_string(),
            max_new_tokens: layered(
                self.max_new_tokens,
                configured.max_new_tokens,
                DEFAULT_MAX_NEW_TOKENS,
            ),
            timeout_ms: layered(self.timeout_ms, configured.timeout_ms, DEFAULT_TIMEOUT_MS),
            max_chars: layered(self.max_chars, configured.max_chars, DEFAULT_MAX_CHARS),
        }
    }
}

/// A partial set of rendering options (the `vision.*` layer, or a direct
/// renderer call).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOverrides {
    pub max_pages: Option<u32>,
    pub image_format: Option<ImageFormat>,
    pub dpi: Option<u32>,
}

impl RenderOverrides {
    /// Merge `self` over `configured` over the renderer defaults.
    pub fn resolve(&self, configured: &RenderOverrides) -> RenderOptions {
        RenderOptions {
            max_pages: layered(
                self.max_pages,
                configured.max_pages,
                DEFAULT_RENDER_MAX_PAGES,
            ),
            image_format: self
                .image_format
                .or(configured.image_format)
                .unwrap_or_default(),
            dpi: layered(self.dpi, configured.dpi, DEFAULT_DPI),
        }
    }
}

impl From<RenderOptions> for RenderOverrides {
    fn from(o: RenderOptions) -> Self {
        Self {
            max_pages: Some(o.max_pages),
            image_format: Some(o.image_format),
            dpi: Some(o.dpi),
        }
    }
}

/// First non-zero value of explicit, configured, default.
fn layered<T: Copy + PartialEq + Default>(explicit: Option<T>, configured: Option<T>, default: T) -> T {
    let zero = T::default();
    explicit
        .filter(|v| *v != zero)
        .or_else(|| configured.filter(|v| *v != zero))
        .unwrap_or(default)
}

// ── Settings (configuration provider) ────────────────────────────────────

/// Errors encountered while loading [`OcrSettings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Variable holds a value that could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Process-level configuration, injected into the extractor and renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrSettings {
    /// Feature flag; nothing runs unless this is true.
    pub enabled: bool,
    /// Base URL of the OCR service (no trailing slash).
    pub service_url: String,
    /// Configured `ocr.*` layer.
    pub ocr: ExtractionOverrides,
    /// Configured `vision.*` layer, used by direct renderer calls.
    pub vision: RenderOverrides,
}

impl OcrSettings {
    /// Settings for an enabled pipeline talking to `service_url`, with no
    /// configured overrides.
    pub fn enabled(service_url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            service_url: normalise_url(&service_url.into()),
            ..Self::default()
        }
    }

    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    ///
    /// Blank values are treated as absent. Numeric values that do not parse
    /// fail the load.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let enabled = get("OCR_ENABLED").is_some_and(|v| is_affirmative(&v));
        let service_url = match get("OCR_SERVICE_URL") {
            Some(url) => normalise_url(&url),
            None if enabled => return Err(ConfigError::MissingVariable("OCR_SERVICE_URL".into())),
            None => String::new(),
        };

        let ocr = ExtractionOverrides {
            max_pages: parse_number(&get, "OCR_MAX_PAGES")?,
            image_format: get("OCR_IMAGE_FORMAT").map(|v| ImageFormat::parse_lenient(&v)),
            dpi: parse_number(&get, "OCR_DPI")?,
            prompt: get("OCR_PROMPT"),
            max_new_tokens: parse_number(&get, "OCR_MAX_NEW_TOKENS")?,
            timeout_ms: parse_number(&get, "OCR_TIMEOUT_MS")?,
            max_chars: parse_number(&get, "OCR_MAX_CHARS")?,
        };

        let vision = RenderOverrides {
            max_pages: parse_number(&get, "VISION_MAX_PAGES")?,
            image_format: get("VISION_IMAGE_FORMAT").map(|v| ImageFormat::parse_lenient(&v)),
            dpi: parse_number(&get, "VISION_DPI")?,
        };

        let settings = Self {
            enabled,
            service_url,
            ocr,
            vision,
        };
        tracing::debug!(
            enabled = settings.enabled,
            service_url = %settings.service_url,
            "Loaded OCR settings"
        );
        Ok(settings)
    }
}

fn is_affirmative(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1" | "on"
    )
}

fn normalise_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_number<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}
