//! OCR service interaction: one `POST {service_url}/ocr` per extraction.
//!
//! The request carries every rendered page as a data URI together with the
//! prompt and generation budget:
//!
//! ```json
//! { "images": ["data:image/png;base64,..."], "prompt": "...", "max_new_tokens": 4096 }
//! ```
//!
//! and the service answers `{ "text": "...", "pages": [...] }`.
//!
//! ## Timeout
//!
//! The whole round trip (send, status, body) runs inside
//! `tokio::time::timeout`. When the budget elapses the request future is
//! dropped, which closes the connection, and the timer goes with it. There is
//! no retry: one call per extraction.
//!
//! ## Response shape
//!
//! Only a body that is not JSON at all is an error. Within valid JSON, a
//! non-string `text` becomes `""` and a non-array `pages` becomes `[]`.

use crate::config::ExtractionOptions;
use crate::error::OcrError;
use crate::output::RenderedPage;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    images: Vec<&'a str>,
    prompt: &'a str,
    max_new_tokens: u32,
}

/// The service's answer after shape coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrResponse {
    pub text: String,
    pub pages: Vec<Value>,
}

impl OcrResponse {
    /// Keep `text` only if it is a string and `pages` only if it is an array.
    pub fn from_value(mut value: Value) -> Self {
        let text = match value.get_mut("text").map(Value::take) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let pages = match value.get_mut("pages").map(Value::take) {
            Some(Value::Array(pages)) => pages,
            _ => Vec::new(),
        };
        Self { text, pages }
    }
}

/// HTTP client for the OCR service.
#[derive(Debug, Clone)]
pub struct OcrClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OcrClient {
    /// Client for the service rooted at `service_url`.
    pub fn new(service_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), service_url)
    }

    /// Client reusing a caller-configured `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, service_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/ocr", service_url.trim_end_matches('/')),
        }
    }

    /// The full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit `pages` for recognition, bounded by `options.timeout_ms`.
    pub async fn submit(
        &self,
        pages: &[RenderedPage],
        options: &ExtractionOptions,
    ) -> Result<OcrResponse, OcrError> {
        let body = OcrRequest {
            images: pages.iter().map(|p| p.payload.as_str()).collect(),
            prompt: &options.prompt,
            max_new_tokens: options.max_new_tokens,
        };
        let start = Instant::now();

        let call = async {
            let response = self
                .client
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| OcrError::ServiceRequest {
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(OcrError::ServiceStatus {
                    status: status.as_u16(),
                });
            }

            let bytes = response.bytes().await.map_err(|e| OcrError::ServiceRequest {
                reason: e.to_string(),
            })?;
            let value: Value =
                serde_json::from_slice(&bytes).map_err(|e| OcrError::MalformedResponse {
                    detail: e.to_string(),
                })?;
            Ok(OcrResponse::from_value(value))
        };

        let response = tokio::time::timeout(Duration::from_millis(options.timeout_ms), call)
            .await
            .map_err(|_| OcrError::ServiceTimeout {
                timeout_ms: options.timeout_ms,
            })??;

        debug!(
            "OCR service returned {} chars, {} page entries in {}ms",
            response.text.chars().count(),
            response.pages.len(),
            start.elapsed().as_millis()
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_keeps_well_typed_fields() {
        let r = OcrResponse::from_value(json!({ "text": "hello", "pages": [{}, {"n": 2}] }));
        assert_eq!(r.text, "hello");
        assert_eq!(r.pages, vec![json!({}), json!({"n": 2})]);
    }

    #[test]
    fn response_coerces_wrong_types() {
        let r = OcrResponse::from_value(json!({ "text": 42, "pages": {"0": {}} }));
        assert_eq!(r, OcrResponse::default());

        let r = OcrResponse::from_value(json!({ "text": null, "pages": [1] }));
        assert_eq!(r.text, "");
        assert_eq!(r.pages, vec![json!(1)]);
    }

    #[test]
    fn response_coerces_non_objects() {
        assert_eq!(OcrResponse::from_value(json!([1, 2])), OcrResponse::default());
        assert_eq!(OcrResponse::from_value(json!("text")), OcrResponse::default());
    }

    #[test]
    fn request_body_shape() {
        let body = OcrRequest {
            images: vec!["data:image/png;base64,AAAA"],
            prompt: "Convert to markdown.",
            max_new_tokens: 4096,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "images": ["data:image/png;base64,AAAA"],
                "prompt": "Convert to markdown.",
                "max_new_tokens": 4096
            })
        );
    }

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(OcrClient::new("http://ocr:8000/").endpoint(), "http://ocr:8000/ocr");
        assert_eq!(OcrClient::new("http://ocr:8000").endpoint(), "http://ocr:8000/ocr");
    }
}
