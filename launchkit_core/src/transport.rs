// Network egress abstraction. Every outbound call in the pipeline goes
// through a ProxyTransport implementation, which is therefore the single
// place enforcing the request deadline and request-id correlation.

use crate::error::{LaunchError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hard deadline for every transport call.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Process-wide monotonically increasing request-id source. Shared across
/// concurrent launches; ids are only ever used for correlation.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// How the response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
    Bytes,
}

/// A single multipart form entry. Binary parts carry a file name and MIME
/// type so the receiving end can reconstruct the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    Binary {
        name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl MultipartPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn binary(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        MultipartPart::Binary {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MultipartPart::Text { name, .. } => name,
            MultipartPart::Binary { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    None,
    Json(String),
    Multipart(Vec<MultipartPart>),
}

#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub response_format: ResponseFormat,
}

impl ProxyRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: RequestBody::None,
            response_format: ResponseFormat::Json,
        }
    }

    pub fn post_json(url: impl Into<String>, payload: &Value) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: RequestBody::Json(payload.to_string()),
            response_format: ResponseFormat::Json,
        }
    }

    pub fn post_multipart(url: impl Into<String>, parts: Vec<MultipartPart>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            headers: Vec::new(),
            body: RequestBody::Multipart(parts),
            response_format: ResponseFormat::Json,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn expecting(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }
}

/// Decoded response body, per the request's `ResponseFormat`.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub ok: bool,
    pub status: u16,
    pub body: ResponseBody,
}

impl ProxyResponse {
    pub fn json(&self) -> Result<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Ok(v),
            other => Err(LaunchError::MalformedResponse(format!(
                "expected JSON body, got {:?}",
                body_kind(other)
            ))),
        }
    }

    pub fn bytes(&self) -> Result<&[u8]> {
        match &self.body {
            ResponseBody::Bytes(b) => Ok(b),
            other => Err(LaunchError::MalformedResponse(format!(
                "expected binary body, got {:?}",
                body_kind(other)
            ))),
        }
    }

    pub fn text(&self) -> Result<&str> {
        match &self.body {
            ResponseBody::Text(s) => Ok(s),
            // Storage endpoints sometimes answer a bare JSON string
            ResponseBody::Json(Value::String(s)) => Ok(s),
            other => Err(LaunchError::MalformedResponse(format!(
                "expected text body, got {:?}",
                body_kind(other)
            ))),
        }
    }

    /// Best-effort rendering of the body for error messages.
    pub fn body_as_lossy_string(&self) -> String {
        match &self.body {
            ResponseBody::Json(v) => v.to_string(),
            ResponseBody::Text(s) => s.clone(),
            ResponseBody::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

fn body_kind(body: &ResponseBody) -> &'static str {
    match body {
        ResponseBody::Json(_) => "json",
        ResponseBody::Text(_) => "text",
        ResponseBody::Bytes(_) => "bytes",
    }
}

/// Transport trait implemented natively with reqwest and, at a browser-style
/// boundary, by `RelayTransport`. Non-2xx responses come back as `Ok` with
/// `ok == false`; callers decide what a failure status means.
#[async_trait(?Send)]
pub trait ProxyTransport {
    async fn request(&self, request: ProxyRequest) -> Result<ProxyResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_strictly_increasing() {
        let a = next_request_id();
        let b = next_request_id();
        let c = next_request_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = ProxyRequest::post_json("https://example.com", &serde_json::json!({"a": 1}));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/json"));
    }

    #[test]
    fn text_accessor_accepts_bare_json_string() {
        let resp = ProxyResponse {
            ok: true,
            status: 200,
            body: ResponseBody::Json(Value::String("https://x/y".to_string())),
        };
        assert_eq!(resp.text().unwrap(), "https://x/y");
    }

    #[test]
    fn bytes_accessor_rejects_other_bodies() {
        let resp = ProxyResponse {
            ok: true,
            status: 200,
            body: ResponseBody::Text("nope".to_string()),
        };
        assert!(matches!(resp.bytes(), Err(LaunchError::MalformedResponse(_))));
    }
}
