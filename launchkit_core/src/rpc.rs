// Thin JSON-RPC client over the proxy transport

use crate::error::{LaunchError, Result};
use crate::transport::{next_request_id, ProxyRequest, ProxyTransport};
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine as _};
use log::debug;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub skip_preflight: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
        }
    }
}

/// JSON-RPC 2.0 client. All calls go through the proxy transport; reads are
/// idempotent, `send_raw_transaction` is at-most-once (no internal retry).
pub struct RpcClient<'a> {
    transport: &'a dyn ProxyTransport,
    endpoint: String,
}

impl<'a> RpcClient<'a> {
    pub fn new(transport: &'a dyn ProxyTransport, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        debug!("RPC {} -> {}", method, redact_endpoint(&self.endpoint));

        let payload = json!({
            "jsonrpc": "2.0",
            "id": next_request_id(),
            "method": method,
            "params": params,
        });
        let response = self
            .transport
            .request(ProxyRequest::post_json(&self.endpoint, &payload))
            .await?;

        if !response.ok {
            if response.status == 403 {
                return Err(LaunchError::RateLimited {
                    status: response.status,
                });
            }
            return Err(LaunchError::Rpc(format!(
                "RPC call failed: {}",
                response.status
            )));
        }

        let body = response.json()?;
        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| error.to_string());
            return Err(LaunchError::Rpc(message));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| LaunchError::MalformedResponse("RPC response missing result".to_string()))
    }

    pub async fn get_latest_blockhash(&self) -> Result<LatestBlockhash> {
        let result = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        let value = result
            .get("value")
            .ok_or_else(|| LaunchError::MalformedResponse("blockhash missing value".to_string()))?;
        let blockhash = value
            .get("blockhash")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LaunchError::MalformedResponse("missing blockhash".to_string()))?
            .to_string();
        let last_valid_block_height = value
            .get("lastValidBlockHeight")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }

    /// Submit signed transaction bytes. The payload crosses the wire base64
    /// encoded; node rejection reasons are surfaced verbatim.
    pub async fn send_raw_transaction(
        &self,
        transaction: &[u8],
        options: SendOptions,
    ) -> Result<String> {
        let encoded = Base64Engine.encode(transaction);
        let result = self
            .call(
                "sendTransaction",
                json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "skipPreflight": options.skip_preflight,
                        "preflightCommitment": "confirmed",
                    }
                ]),
            )
            .await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LaunchError::MalformedResponse("sendTransaction returned no signature".to_string()))
    }

    /// Best-effort balance read; callers treat failure as unknown, not fatal.
    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let result = self.call("getBalance", json!([address])).await?;
        result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| LaunchError::MalformedResponse("getBalance missing value".to_string()))
    }
}

fn redact_endpoint(endpoint: &str) -> &str {
    // Keys travel as query params on authenticated endpoints
    endpoint.split('?').next().unwrap_or(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ProxyResponse, RequestBody, ResponseBody};
    use async_trait::async_trait;
    use std::cell::RefCell;

    struct ScriptedTransport {
        requests: RefCell<Vec<ProxyRequest>>,
        responses: RefCell<Vec<ProxyResponse>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<ProxyResponse>) -> Self {
            Self {
                requests: RefCell::new(Vec::new()),
                responses: RefCell::new(responses),
            }
        }
    }

    #[async_trait(?Send)]
    impl ProxyTransport for ScriptedTransport {
        async fn request(&self, request: ProxyRequest) -> Result<ProxyResponse> {
            self.requests.borrow_mut().push(request);
            Ok(self.responses.borrow_mut().remove(0))
        }
    }

    fn json_response(status: u16, body: Value) -> ProxyResponse {
        ProxyResponse {
            ok: (200..300).contains(&status),
            status,
            body: ResponseBody::Json(body),
        }
    }

    #[tokio::test]
    async fn blockhash_parses_value() {
        let transport = ScriptedTransport::new(vec![json_response(
            200,
            json!({"result": {"value": {"blockhash": "Hash111", "lastValidBlockHeight": 42}}}),
        )]);
        let rpc = RpcClient::new(&transport, "https://rpc.example");
        let result = rpc.get_latest_blockhash().await.unwrap();
        assert_eq!(result.blockhash, "Hash111");
        assert_eq!(result.last_valid_block_height, 42);
    }

    #[tokio::test]
    async fn http_403_maps_to_rate_limited() {
        let transport = ScriptedTransport::new(vec![json_response(403, json!({}))]);
        let rpc = RpcClient::new(&transport, "https://rpc.example");
        let err = rpc.get_latest_blockhash().await.unwrap_err();
        assert!(matches!(err, LaunchError::RateLimited { status: 403 }));
    }

    #[tokio::test]
    async fn node_error_surfaces_message() {
        let transport = ScriptedTransport::new(vec![json_response(
            200,
            json!({"error": {"code": -32002, "message": "Blockhash not found"}}),
        )]);
        let rpc = RpcClient::new(&transport, "https://rpc.example");
        let err = rpc.get_latest_blockhash().await.unwrap_err();
        match err {
            LaunchError::Rpc(msg) => assert_eq!(msg, "Blockhash not found"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_transaction_encodes_base64() {
        let transport = ScriptedTransport::new(vec![json_response(
            200,
            json!({"result": "Sig111"}),
        )]);
        let rpc = RpcClient::new(&transport, "https://rpc.example");
        let signature = rpc
            .send_raw_transaction(&[1, 2, 3], SendOptions::default())
            .await
            .unwrap();
        assert_eq!(signature, "Sig111");

        let requests = transport.requests.borrow();
        let RequestBody::Json(body) = &requests[0].body else {
            panic!("expected JSON body");
        };
        let payload: Value = serde_json::from_str(body).unwrap();
        assert_eq!(payload["method"], "sendTransaction");
        assert_eq!(payload["params"][0], Base64Engine.encode([1u8, 2, 3]));
        assert_eq!(payload["params"][1]["encoding"], "base64");
        assert_eq!(payload["params"][1]["preflightCommitment"], "confirmed");
    }

    #[tokio::test]
    async fn balance_reads_value() {
        let transport = ScriptedTransport::new(vec![json_response(
            200,
            json!({"result": {"context": {"slot": 1}, "value": 1500000}}),
        )]);
        let rpc = RpcClient::new(&transport, "https://rpc.example");
        assert_eq!(rpc.get_balance("Addr1").await.unwrap(), 1_500_000);
    }
}
