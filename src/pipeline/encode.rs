//! Image encoding: raw bytes → `data:<mime>;base64,<...>` URIs.
//!
//! The OCR service takes images inline in a JSON body, so every page is
//! carried as a self-describing data URI. The media type travels with the
//! bytes, which lets the service accept a mix of PNG, JPEG and whatever an
//! uploaded photo happens to be.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode `bytes` as a base64 data URI tagged with `mime_type`.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes of {} → {} bytes base64", bytes.len(), mime_type, b64.len());
    format!("data:{mime_type};base64,{b64}")
}

/// Split a base64 data URI back into its media type and bytes.
///
/// Returns `None` for anything that is not `data:<mime>;base64,<payload>`
/// with valid base64.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime_type.to_string(), bytes))
}
