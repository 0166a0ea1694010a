// Message-relay form of the transport: requests are serialized into JSON
// envelopes, sent across a boundary that cannot carry binary objects, and
// matched back to their caller by request id. Binary multipart parts travel
// base64-tagged inside the envelope.

use crate::error::{LaunchError, Result};
use crate::transport::{
    next_request_id, HttpMethod, MultipartPart, ProxyRequest, ProxyResponse, RequestBody,
    ResponseBody, ResponseFormat, REQUEST_TIMEOUT_SECS,
};
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine as _};
use serde_json::{json, Value};

pub const REQUEST_ENVELOPE_TYPE: &str = "fetch_request";
pub const RESPONSE_ENVELOPE_TYPE: &str = "fetch_response";

/// Serialize a request into a relay envelope under the given id.
pub fn encode_request(request_id: u64, request: &ProxyRequest) -> Value {
    let mut options = json!({
        "method": request.method.as_str(),
        "responseType": response_format_tag(request.response_format),
    });

    if !request.headers.is_empty() {
        let headers: serde_json::Map<String, Value> = request
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        options["headers"] = Value::Object(headers);
    }

    match &request.body {
        RequestBody::None => {}
        RequestBody::Json(payload) => {
            options["body"] = Value::String(payload.clone());
        }
        RequestBody::Multipart(parts) => {
            options["bodyType"] = Value::String("formdata".to_string());
            options["formDataEntries"] =
                Value::Array(parts.iter().map(part_to_entry).collect());
        }
    }

    json!({
        "type": REQUEST_ENVELOPE_TYPE,
        "requestId": request_id,
        "url": request.url,
        "options": options,
    })
}

fn part_to_entry(part: &MultipartPart) -> Value {
    match part {
        MultipartPart::Text { name, value } => json!({
            "key": name,
            "isBlob": false,
            "value": value,
        }),
        MultipartPart::Binary {
            name,
            file_name,
            content_type,
            bytes,
        } => json!({
            "key": name,
            "isBlob": true,
            "value": {
                "data": Base64Engine.encode(bytes),
                "type": content_type,
                "name": file_name,
            },
        }),
    }
}

/// Parse a form-data entry back into a multipart part. The privileged end
/// of the relay uses this to rebuild the original upload.
pub fn entry_to_part(entry: &Value) -> Result<MultipartPart> {
    let key = entry
        .get("key")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LaunchError::MalformedResponse("form entry missing key".to_string()))?;

    if entry.get("isBlob").and_then(|v| v.as_bool()).unwrap_or(false) {
        let value = entry
            .get("value")
            .ok_or_else(|| LaunchError::MalformedResponse("blob entry missing value".to_string()))?;
        let data = value
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LaunchError::MalformedResponse("blob entry missing data".to_string()))?;
        let bytes = Base64Engine
            .decode(data)
            .map_err(|e| LaunchError::InvalidEncoding(format!("blob base64: {}", e)))?;
        Ok(MultipartPart::binary(
            key,
            value.get("name").and_then(|v| v.as_str()).unwrap_or("file"),
            value
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("application/octet-stream"),
            bytes,
        ))
    } else {
        let value = entry
            .get("value")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LaunchError::MalformedResponse("form entry missing value".to_string()))?;
        Ok(MultipartPart::text(key, value))
    }
}

fn response_format_tag(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Json => "json",
        ResponseFormat::Text => "text",
        ResponseFormat::Bytes => "arraybuffer",
    }
}

/// Build a response envelope. Used by the privileged end and by tests.
pub fn encode_response(request_id: u64, response: &ProxyResponse) -> Value {
    let (tag, data) = match &response.body {
        ResponseBody::Json(v) => ("json", v.clone()),
        ResponseBody::Text(s) => ("text", Value::String(s.clone())),
        ResponseBody::Bytes(b) => (
            "arraybuffer",
            Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
        ),
    };
    json!({
        "type": RESPONSE_ENVELOPE_TYPE,
        "requestId": request_id,
        "success": true,
        "ok": response.ok,
        "status": response.status,
        "responseType": tag,
        "data": data,
    })
}

pub fn encode_error_response(request_id: u64, message: &str) -> Value {
    json!({
        "type": RESPONSE_ENVELOPE_TYPE,
        "requestId": request_id,
        "success": false,
        "error": message,
    })
}

/// Decode a response envelope into its request id and outcome.
pub fn decode_response(envelope: &Value) -> Result<(u64, Result<ProxyResponse>)> {
    let request_id = envelope
        .get("requestId")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| LaunchError::MalformedResponse("response missing requestId".to_string()))?;

    let success = envelope
        .get("success")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !success {
        let message = envelope
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("relay request failed")
            .to_string();
        return Ok((request_id, Err(LaunchError::Rpc(message))));
    }

    let status = envelope.get("status").and_then(|v| v.as_u64()).unwrap_or(0) as u16;
    let ok = envelope.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    let data = envelope.get("data").cloned().unwrap_or(Value::Null);
    let body = match envelope
        .get("responseType")
        .and_then(|v| v.as_str())
        .unwrap_or("json")
    {
        "text" => ResponseBody::Text(data.as_str().unwrap_or_default().to_string()),
        "arraybuffer" => match decode_byte_array(&data) {
            Ok(bytes) => ResponseBody::Bytes(bytes),
            Err(e) => return Ok((request_id, Err(e))),
        },
        _ => ResponseBody::Json(data),
    };

    Ok((request_id, Ok(ProxyResponse { ok, status, body })))
}

// An arraybuffer body must be a number array with every entry in 0..=255;
// anything else means the envelope was corrupted in transit.
fn decode_byte_array(data: &Value) -> Result<Vec<u8>> {
    let arr = data.as_array().ok_or_else(|| {
        LaunchError::MalformedResponse("arraybuffer body is not an array".to_string())
    })?;
    let mut bytes = Vec::with_capacity(arr.len());
    for entry in arr {
        let byte = entry.as_u64().filter(|v| *v <= u8::MAX as u64).ok_or_else(|| {
            LaunchError::MalformedResponse(format!("arraybuffer entry {} is not a byte", entry))
        })?;
        bytes.push(byte as u8);
    }
    Ok(bytes)
}

#[cfg(feature = "native")]
pub use native_relay::RelayTransport;

#[cfg(feature = "native")]
mod native_relay {
    use super::*;
    use crate::transport::ProxyTransport;
    use async_trait::async_trait;
    use log::{debug, warn};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    type EnvelopeSender = Box<dyn Fn(Value)>;

    /// Transport that speaks request/response envelopes over a caller-supplied
    /// channel. Out-of-order responses are matched by request id; every call
    /// is bounded by the fixed deadline.
    pub struct RelayTransport {
        send_envelope: EnvelopeSender,
        pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
        timeout_secs: u64,
    }

    impl RelayTransport {
        pub fn new(send_envelope: EnvelopeSender) -> Self {
            Self {
                send_envelope,
                pending: Mutex::new(HashMap::new()),
                timeout_secs: REQUEST_TIMEOUT_SECS,
            }
        }

        #[cfg(test)]
        pub fn with_timeout(send_envelope: EnvelopeSender, timeout_secs: u64) -> Self {
            Self {
                send_envelope,
                pending: Mutex::new(HashMap::new()),
                timeout_secs,
            }
        }

        /// Feed a response envelope back in. Unknown ids (already timed out)
        /// are dropped with a warning.
        pub fn handle_response(&self, envelope: Value) {
            let request_id = envelope.get("requestId").and_then(|v| v.as_u64());
            let Some(request_id) = request_id else {
                warn!("Relay response without requestId dropped");
                return;
            };
            let sender = self.pending.lock().ok().and_then(|mut p| p.remove(&request_id));
            match sender {
                Some(tx) => {
                    let _ = tx.send(envelope);
                }
                None => debug!("Relay response for unknown id {} dropped", request_id),
            }
        }
    }

    #[async_trait(?Send)]
    impl ProxyTransport for RelayTransport {
        async fn request(&self, request: ProxyRequest) -> Result<ProxyResponse> {
            let request_id = next_request_id();
            let (tx, rx) = oneshot::channel();
            if let Ok(mut pending) = self.pending.lock() {
                pending.insert(request_id, tx);
            }

            debug!("Relay request {} -> {}", request_id, request.url);
            (self.send_envelope)(encode_request(request_id, &request));

            let envelope = match tokio::time::timeout(
                Duration::from_secs(self.timeout_secs),
                rx,
            )
            .await
            {
                Ok(Ok(envelope)) => envelope,
                Ok(Err(_)) => {
                    return Err(LaunchError::Rpc("relay channel closed".to_string()));
                }
                Err(_) => {
                    if let Ok(mut pending) = self.pending.lock() {
                        pending.remove(&request_id);
                    }
                    return Err(LaunchError::Timeout(self.timeout_secs));
                }
            };

            let (_, outcome) = decode_response(&envelope)?;
            outcome
        }
    }
}
