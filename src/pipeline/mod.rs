//! Pipeline stages for document OCR.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped (a different rasterizer, a stub service) without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! store ──▶ render ──▶ rasterize ──▶ encode ──▶ client
//! (bytes)   (classify)  (pdftoppm)   (data URI)  (POST /ocr)
//! ```
//!
//! 1. [`render`]: fetch the document, classify it by media type, and
//!    produce ordered page images; never fails outward
//! 2. [`rasterize`]: run `pdftoppm` into a scratch directory and list its
//!    output in page order
//! 3. [`encode`]: wrap image bytes as `data:<mime>;base64,...`
//! 4. [`client`]: the single timeout-bounded call to the OCR service
//! 5. [`scoped`]: drop guard deleting the downloaded document copy

pub mod client;
pub mod encode;
pub mod rasterize;
pub mod render;
pub mod scoped;
