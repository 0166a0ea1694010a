// Native transport: direct HTTP with reqwest. Browser-style embeddings use
// `relay::RelayTransport` instead; both sit behind the same trait.

use crate::error::{LaunchError, Result};
use crate::transport::{
    HttpMethod, MultipartPart, ProxyRequest, ProxyResponse, ProxyTransport, RequestBody,
    ResponseBody, ResponseFormat, REQUEST_TIMEOUT_SECS,
};
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

pub struct NativeTransport {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl NativeTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LaunchError::Io(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

fn multipart_form(parts: Vec<MultipartPart>) -> Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name, value),
            MultipartPart::Binary {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let file_part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| {
                        LaunchError::Validation(format!("bad MIME type {}: {}", content_type, e))
                    })?;
                form.part(name, file_part)
            }
        };
    }
    Ok(form)
}

#[async_trait(?Send)]
impl ProxyTransport for NativeTransport {
    async fn request(&self, request: ProxyRequest) -> Result<ProxyResponse> {
        debug!("{} {}", request.method.as_str(), request.url);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Json(payload) => builder.body(payload),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let format = request.response_format;
        let exchange = async move {
            let response = builder
                .send()
                .await
                .map_err(|e| LaunchError::Io(format!("request failed: {}", e)))?;
            let status = response.status().as_u16();
            let ok = response.status().is_success();
            let body = match format {
                ResponseFormat::Bytes => ResponseBody::Bytes(
                    response
                        .bytes()
                        .await
                        .map_err(|e| LaunchError::Io(format!("body read failed: {}", e)))?
                        .to_vec(),
                ),
                ResponseFormat::Json | ResponseFormat::Text => {
                    let text = response
                        .text()
                        .await
                        .map_err(|e| LaunchError::Io(format!("body read failed: {}", e)))?;
                    // Error pages are often plain text even on JSON endpoints
                    if format == ResponseFormat::Json {
                        match serde_json::from_str(&text) {
                            Ok(value) => ResponseBody::Json(value),
                            Err(_) => ResponseBody::Text(text),
                        }
                    } else {
                        ResponseBody::Text(text)
                    }
                }
            };
            Ok(ProxyResponse { ok, status, body })
        };

        tokio::time::timeout(Duration::from_secs(self.timeout_secs), exchange)
            .await
            .map_err(|_| LaunchError::Timeout(self.timeout_secs))?
    }
}
