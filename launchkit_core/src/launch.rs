// Launch orchestration. One `launch` call drives the whole pipeline:
// validate, resolve the image, upload, take the service fee, generate the
// mint, build the transaction, sign and broadcast.

use crate::adapters::{adapter_for, validate_claimers, AdapterContext};
use crate::error::{LaunchError, Result};
use crate::fee;
use crate::image::{sniff_content_type, ImageTranscoder};
use crate::models::{
    BuildParams, FeeResult, ImageAsset, LaunchRequest, LaunchResult, Platform, SigningContext,
    UnsignedLaunchTx, WalletState,
};
use crate::rpc::RpcClient;
use crate::settings::Settings;
use crate::signing::{SigningService, WalletSigner};
use crate::transport::{ProxyRequest, ProxyTransport, ResponseFormat};
use log::info;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::cell::Cell;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    Validating,
    ResolvingImage,
    Uploading,
    FeeSending,
    MintGenerating,
    BuildingTx,
    AwaitingSignature,
    Broadcasting,
    Done,
    Failed,
}

impl LaunchState {
    fn is_in_flight(&self) -> bool {
        !matches!(self, LaunchState::Idle | LaunchState::Done | LaunchState::Failed)
    }
}

impl std::fmt::Display for LaunchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LaunchState::Idle => "idle",
            LaunchState::Validating => "validating",
            LaunchState::ResolvingImage => "resolving image",
            LaunchState::Uploading => "uploading",
            LaunchState::FeeSending => "sending fee",
            LaunchState::MintGenerating => "generating mint",
            LaunchState::BuildingTx => "building transaction",
            LaunchState::AwaitingSignature => "awaiting signature",
            LaunchState::Broadcasting => "broadcasting",
            LaunchState::Done => "done",
            LaunchState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Progress reporting seam. The CLI logs; a UI would render these.
pub trait StatusSink {
    fn status(&self, state: LaunchState, detail: &str);
}

/// Default sink, reports through the logger.
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn status(&self, state: LaunchState, detail: &str) {
        info!("[{}] {}", state, detail);
    }
}

pub struct LaunchOrchestrator<'a> {
    transport: &'a dyn ProxyTransport,
    transcoder: &'a dyn ImageTranscoder,
    settings: &'a Settings,
    wallet_signer: Option<&'a dyn WalletSigner>,
    sink: &'a dyn StatusSink,
    signing_context: SigningContext,
    state: Cell<LaunchState>,
}

impl<'a> LaunchOrchestrator<'a> {
    pub fn new(
        transport: &'a dyn ProxyTransport,
        transcoder: &'a dyn ImageTranscoder,
        settings: &'a Settings,
        wallet_signer: Option<&'a dyn WalletSigner>,
        sink: &'a dyn StatusSink,
    ) -> Self {
        Self {
            transport,
            transcoder,
            settings,
            wallet_signer,
            sink,
            signing_context: settings.signing_context(),
            state: Cell::new(LaunchState::Idle),
        }
    }

    pub fn state(&self) -> LaunchState {
        self.state.get()
    }

    /// Run one launch end to end. At most one launch runs at a time per
    /// orchestrator; a second call while one is in flight fails fast.
    pub async fn launch(
        &self,
        platform: Platform,
        wallet: &WalletState,
        request: LaunchRequest,
    ) -> Result<LaunchResult> {
        if self.state.get().is_in_flight() {
            return Err(LaunchError::Validation(
                "a launch is already in progress".to_string(),
            ));
        }

        let result = self.run(platform, wallet, request).await;
        match &result {
            Ok(done) => self.set_state(
                LaunchState::Done,
                &format!("launched {} with signature {}", done.mint_address, done.signature),
            ),
            Err(err) => self.set_state(LaunchState::Failed, &err.friendly_message()),
        }
        result
    }

    async fn run(
        &self,
        platform: Platform,
        wallet: &WalletState,
        request: LaunchRequest,
    ) -> Result<LaunchResult> {
        self.set_state(LaunchState::Validating, "checking inputs");
        let address = self.validate(platform, wallet, &request)?;

        let adapter = adapter_for(platform);
        let ctx = AdapterContext {
            transport: self.transport,
            transcoder: self.transcoder,
            settings: self.settings,
        };
        let rpc = RpcClient::new(self.transport, &self.settings.rpc_url);
        let signing = SigningService::new(&self.signing_context, self.wallet_signer);

        self.set_state(LaunchState::ResolvingImage, "preparing token image");
        let image = match request.image.clone() {
            Some(image) => image,
            None => self.download_image(&request).await?,
        };

        self.set_state(LaunchState::Uploading, "uploading metadata");
        let upload = adapter.upload(&ctx, &request.metadata, image).await?;

        // Fee comes out first; the buy proceeds with the net amount. A fee
        // failure aborts the launch before anything irreversible happens.
        let mut effective_buy = request.buy_amount_sol;
        let mut fee_result: Option<FeeResult> = None;
        if adapter.fee_eligible() {
            if let Some(quote) = fee::compute_fee(request.buy_amount_sol, self.settings.fee_enabled)
            {
                self.set_state(
                    LaunchState::FeeSending,
                    &format!("sending service fee ({} lamports)", quote.fee_lamports),
                );
                let payer = Pubkey::from_str(address).map_err(|_| {
                    LaunchError::InvalidEncoding("invalid wallet address".to_string())
                })?;
                let transfer = fee::build_fee_transfer(&payer, quote.fee_lamports);
                let signature = signing
                    .sign_and_send(
                        UnsignedLaunchTx::Instructions(vec![transfer]),
                        None,
                        address,
                        &rpc,
                    )
                    .await?;
                info!("Service fee sent: {}", signature);
                fee_result = Some(FeeResult {
                    signature,
                    fee_amount_sol: quote.fee_lamports as f64 / fee::LAMPORTS_PER_SOL,
                });
                effective_buy = quote.net_amount_sol;
            }
        }

        self.set_state(LaunchState::MintGenerating, "preparing token mint");
        let (mint_keypair, mint_address) = match upload.server_mint.clone() {
            Some(mint) => (None, mint),
            None => {
                let keypair = Keypair::new();
                let address = keypair.pubkey().to_string();
                (Some(keypair), address)
            }
        };

        self.set_state(LaunchState::BuildingTx, "building launch transaction");
        let params = BuildParams {
            wallet_address: address.to_string(),
            metadata: request.metadata.clone(),
            metadata_uri: upload.metadata_uri.clone(),
            mint_address: mint_address.clone(),
            buy_amount_sol: effective_buy,
            slippage: request.slippage,
            fee_claimers: request.fee_claimers.clone(),
        };
        let unsigned = adapter.build_transaction(&ctx, &params).await?;

        let detail = if self.signing_context.autosign_enabled {
            "signing with stored key"
        } else {
            "waiting for wallet approval"
        };
        self.set_state(LaunchState::AwaitingSignature, detail);
        // sign_and_send broadcasts as soon as the signature set is complete
        self.set_state(LaunchState::Broadcasting, "submitting launch transaction");
        let signature = signing
            .sign_and_send(unsigned, mint_keypair.as_ref(), address, &rpc)
            .await?;

        let pool_state = match platform {
            Platform::Bonk => crate::adapters::pool_state_for_mint(&mint_address),
            _ => None,
        };

        Ok(LaunchResult {
            platform,
            signature,
            mint_address,
            metadata_uri: upload.metadata_uri,
            fee_signature: fee_result.map(|f| f.signature),
            pool_state,
            timestamp: chrono::Utc::now().timestamp(),
        })
    }

    fn validate<'w>(
        &self,
        platform: Platform,
        wallet: &'w WalletState,
        request: &LaunchRequest,
    ) -> Result<&'w str> {
        if request.metadata.name.trim().is_empty() {
            return Err(LaunchError::Validation("token name is required".to_string()));
        }
        if request.metadata.ticker.trim().is_empty() {
            return Err(LaunchError::Validation("token ticker is required".to_string()));
        }
        if request.buy_amount_sol < 0.0 {
            return Err(LaunchError::Validation(
                "buy amount cannot be negative".to_string(),
            ));
        }
        if request.buy_amount_sol > self.settings.buy_amount_limit_sol {
            return Err(LaunchError::Validation(format!(
                "buy amount {} SOL exceeds the limit of {} SOL",
                request.buy_amount_sol, self.settings.buy_amount_limit_sol
            )));
        }
        if platform == Platform::Bags {
            if self.settings.bags_api_key.as_deref().unwrap_or("").is_empty() {
                return Err(LaunchError::Validation("Bags API key required".to_string()));
            }
            validate_claimers(&request.fee_claimers)?;
        }
        let address = wallet
            .address
            .as_deref()
            .filter(|_| wallet.connected)
            .ok_or_else(|| LaunchError::WalletUnavailable("wallet not connected".to_string()))?;
        Ok(address)
    }

    async fn download_image(&self, request: &LaunchRequest) -> Result<ImageAsset> {
        let url = request
            .metadata
            .image_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                LaunchError::Validation("no image supplied and no image URL set".to_string())
            })?;
        let response = self
            .transport
            .request(ProxyRequest::get(url).expecting(ResponseFormat::Bytes))
            .await?;
        if !response.ok {
            return Err(LaunchError::ImageDownload(format!(
                "HTTP {} fetching {}",
                response.status, url
            )));
        }
        let bytes = response.bytes()?.to_vec();
        if bytes.is_empty() {
            return Err(LaunchError::ImageDownload("image was empty".to_string()));
        }
        let content_type = sniff_content_type(&bytes, Some(url));
        Ok(ImageAsset::new(bytes, content_type))
    }

    fn set_state(&self, state: LaunchState, detail: &str) {
        self.state.set(state);
        self.sink.status(state, detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenMetadata;
    use crate::transport::{ProxyResponse, RequestBody, ResponseBody};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use solana_sdk::message::{Message, VersionedMessage};
    use solana_sdk::signature::Signature;
    use solana_sdk::system_instruction;
    use solana_sdk::transaction::VersionedTransaction;
    use std::cell::RefCell;

    // Simulates the platform APIs and the RPC node for a full pipeline run.
    struct PipelineTransport {
        settings: Settings,
        requests: RefCell<Vec<ProxyRequest>>,
        sends: Cell<u32>,
        fail_first_send: bool,
    }

    impl PipelineTransport {
        fn new(settings: Settings) -> Self {
            Self {
                settings,
                requests: RefCell::new(Vec::new()),
                sends: Cell::new(0),
                fail_first_send: false,
            }
        }

        fn json(&self, value: Value) -> ProxyResponse {
            ProxyResponse {
                ok: true,
                status: 200,
                body: ResponseBody::Json(value),
            }
        }

        fn rpc_response(&self, request: &ProxyRequest) -> ProxyResponse {
            let RequestBody::Json(body) = &request.body else {
                panic!("RPC request without JSON body");
            };
            let payload: Value = serde_json::from_str(body).unwrap();
            match payload["method"].as_str().unwrap() {
                "getLatestBlockhash" => self.json(json!({"result": {"value": {
                    "blockhash": solana_sdk::hash::Hash::new_unique().to_string(),
                    "lastValidBlockHeight": 100,
                }}})),
                "sendTransaction" => {
                    let n = self.sends.get();
                    self.sends.set(n + 1);
                    if self.fail_first_send && n == 0 {
                        self.json(json!({"error": {"code": -32002,
                            "message": "Transfer: insufficient lamports 1, need 2"}}))
                    } else if n == 0 {
                        self.json(json!({"result": "FeeSig"}))
                    } else {
                        self.json(json!({"result": "LaunchSig"}))
                    }
                }
                other => panic!("unexpected RPC method {}", other),
            }
        }

        fn portal_response(&self, request: &ProxyRequest) -> ProxyResponse {
            let RequestBody::Json(body) = &request.body else {
                panic!("portal request without JSON body");
            };
            let payload: Value = serde_json::from_str(body).unwrap();
            let payer = Pubkey::from_str(payload["publicKey"].as_str().unwrap()).unwrap();
            let mint = Pubkey::from_str(payload["mint"].as_str().unwrap()).unwrap();
            let message = Message::new(
                &[system_instruction::create_account(&payer, &mint, 1, 0, &payer)],
                Some(&payer),
            );
            let tx = VersionedTransaction {
                signatures: vec![Signature::default(); 2],
                message: VersionedMessage::Legacy(message),
            };
            ProxyResponse {
                ok: true,
                status: 200,
                body: ResponseBody::Bytes(bincode::serialize(&tx).unwrap()),
            }
        }
    }

    #[async_trait(?Send)]
    impl ProxyTransport for PipelineTransport {
        async fn request(&self, request: ProxyRequest) -> Result<ProxyResponse> {
            let response = if request.url == self.settings.rpc_url {
                self.rpc_response(&request)
            } else if request.url == self.settings.pump_ipfs_url {
                self.json(json!({"metadataUri": "ipfs://meta"}))
            } else if request.url == self.settings.pump_trade_url {
                self.portal_response(&request)
            } else if request.url == self.settings.bonk_image_upload_url {
                ProxyResponse {
                    ok: true,
                    status: 200,
                    body: ResponseBody::Text("https://ipfs/img".to_string()),
                }
            } else if request.url == self.settings.bonk_metadata_upload_url {
                ProxyResponse {
                    ok: true,
                    status: 200,
                    body: ResponseBody::Text("https://ipfs/meta".to_string()),
                }
            } else {
                panic!("unexpected request URL {}", request.url);
            };
            self.requests.borrow_mut().push(request);
            Ok(response)
        }
    }

    struct NoopTranscoder;

    impl ImageTranscoder for NoopTranscoder {
        fn webp_to_png(&self, bytes: &[u8]) -> Result<Vec<u8>> {
            Ok(bytes.to_vec())
        }
    }

    struct RecordingSink {
        states: RefCell<Vec<LaunchState>>,
    }

    impl StatusSink for RecordingSink {
        fn status(&self, state: LaunchState, _detail: &str) {
            self.states.borrow_mut().push(state);
        }
    }

    fn autosign_settings(payer: &Keypair) -> Settings {
        Settings {
            autosign_enabled: true,
            wallet_private_key: Some(bs58::encode(payer.to_bytes()).into_string()),
            ..Settings::default()
        }
    }

    fn request_with_image() -> LaunchRequest {
        LaunchRequest {
            metadata: TokenMetadata {
                name: "Test".to_string(),
                ticker: "TST".to_string(),
                description: "a token".to_string(),
                image_url: None,
                twitter: None,
                telegram: None,
                website: None,
            },
            image: Some(ImageAsset::new(vec![1, 2, 3], "image/png")),
            buy_amount_sol: 0.5,
            slippage: 10,
            fee_claimers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn pump_launch_runs_full_pipeline_with_fee() {
        let payer = Keypair::new();
        let settings = autosign_settings(&payer);
        let transport = PipelineTransport::new(settings.clone());
        let sink = RecordingSink {
            states: RefCell::new(Vec::new()),
        };
        let orchestrator =
            LaunchOrchestrator::new(&transport, &NoopTranscoder, &settings, None, &sink);
        let wallet = WalletState::connected(payer.pubkey().to_string());

        let result = orchestrator
            .launch(Platform::Pump, &wallet, request_with_image())
            .await
            .unwrap();
        assert_eq!(result.signature, "LaunchSig");
        assert_eq!(result.fee_signature.as_deref(), Some("FeeSig"));
        assert!(result.pool_state.is_none());
        assert_eq!(orchestrator.state(), LaunchState::Done);

        assert_eq!(
            *sink.states.borrow(),
            vec![
                LaunchState::Validating,
                LaunchState::ResolvingImage,
                LaunchState::Uploading,
                LaunchState::FeeSending,
                LaunchState::MintGenerating,
                LaunchState::BuildingTx,
                LaunchState::AwaitingSignature,
                LaunchState::Broadcasting,
                LaunchState::Done,
            ]
        );

        // portal receives the buy net of the 2% fee
        let requests = transport.requests.borrow();
        let portal = requests
            .iter()
            .find(|r| r.url == settings.pump_trade_url)
            .unwrap();
        let RequestBody::Json(body) = &portal.body else {
            panic!("expected JSON portal body");
        };
        let payload: Value = serde_json::from_str(body).unwrap();
        assert!((payload["amount"].as_f64().unwrap() - 0.49).abs() < 1e-12);
        assert_eq!(payload["mint"], result.mint_address);
    }

    struct RecordingWallet {
        calls: RefCell<Vec<Vec<u8>>>,
    }

    #[async_trait(?Send)]
    impl WalletSigner for RecordingWallet {
        fn is_available(&self) -> bool {
            true
        }

        async fn sign_and_send(&self, transaction_bytes: &[u8]) -> Result<String> {
            let mut calls = self.calls.borrow_mut();
            calls.push(transaction_bytes.to_vec());
            Ok(format!("WalletSig{}", calls.len()))
        }
    }

    #[tokio::test]
    async fn pump_launch_delegates_to_external_wallet_without_autosign() {
        let payer = Keypair::new();
        let settings = Settings::default();
        let transport = PipelineTransport::new(settings.clone());
        let wallet_signer = RecordingWallet {
            calls: RefCell::new(Vec::new()),
        };
        let sink = RecordingSink {
            states: RefCell::new(Vec::new()),
        };
        let orchestrator = LaunchOrchestrator::new(
            &transport,
            &NoopTranscoder,
            &settings,
            Some(&wallet_signer),
            &sink,
        );
        let wallet = WalletState::connected(payer.pubkey().to_string());

        let result = orchestrator
            .launch(Platform::Pump, &wallet, request_with_image())
            .await
            .unwrap();
        assert_eq!(result.fee_signature.as_deref(), Some("WalletSig1"));
        assert_eq!(result.signature, "WalletSig2");
        assert_eq!(orchestrator.state(), LaunchState::Done);

        // the wallet broadcasts both transactions; the node never sees a send
        assert_eq!(wallet_signer.calls.borrow().len(), 2);
        assert_eq!(transport.sends.get(), 0);

        // upload completes before the transaction build starts
        let requests = transport.requests.borrow();
        let upload_at = requests
            .iter()
            .position(|r| r.url == settings.pump_ipfs_url)
            .unwrap();
        let portal_at = requests
            .iter()
            .position(|r| r.url == settings.pump_trade_url)
            .unwrap();
        assert!(upload_at < portal_at);
    }

    #[tokio::test]
    async fn fee_failure_aborts_before_transaction_build() {
        let payer = Keypair::new();
        let settings = autosign_settings(&payer);
        let mut transport = PipelineTransport::new(settings.clone());
        transport.fail_first_send = true;
        let sink = RecordingSink {
            states: RefCell::new(Vec::new()),
        };
        let orchestrator =
            LaunchOrchestrator::new(&transport, &NoopTranscoder, &settings, None, &sink);
        let wallet = WalletState::connected(payer.pubkey().to_string());

        let err = orchestrator
            .launch(Platform::Pump, &wallet, request_with_image())
            .await
            .unwrap_err();
        assert!(err.friendly_message().contains("Insufficient SOL"));
        assert_eq!(orchestrator.state(), LaunchState::Failed);
        assert!(!transport
            .requests
            .borrow()
            .iter()
            .any(|r| r.url == settings.pump_trade_url));
    }

    #[tokio::test]
    async fn bonk_launch_skips_fee_and_records_pool() {
        let payer = Keypair::new();
        let settings = autosign_settings(&payer);
        let transport = PipelineTransport::new(settings.clone());
        let sink = RecordingSink {
            states: RefCell::new(Vec::new()),
        };
        let orchestrator =
            LaunchOrchestrator::new(&transport, &NoopTranscoder, &settings, None, &sink);
        let wallet = WalletState::connected(payer.pubkey().to_string());

        let mut request = request_with_image();
        request.buy_amount_sol = 0.1;
        let result = orchestrator
            .launch(Platform::Bonk, &wallet, request)
            .await
            .unwrap();
        // no fee transaction, so the single send is the launch itself
        assert_eq!(result.signature, "FeeSig");
        assert!(result.fee_signature.is_none());
        assert!(result.pool_state.is_some());
        assert!(!sink.states.borrow().contains(&LaunchState::FeeSending));
    }

    #[tokio::test]
    async fn validation_failures_fail_fast_and_reset_state() {
        let settings = Settings::default();
        let transport = PipelineTransport::new(settings.clone());
        let orchestrator =
            LaunchOrchestrator::new(&transport, &NoopTranscoder, &settings, None, &LogStatusSink);
        let wallet = WalletState::connected("Wallet111");

        let mut request = request_with_image();
        request.metadata.name = "  ".to_string();
        let err = orchestrator
            .launch(Platform::Pump, &wallet, request.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::Validation(_)));
        assert_eq!(orchestrator.state(), LaunchState::Failed);
        assert!(transport.requests.borrow().is_empty());

        // not stuck in flight: a second attempt reports the same error,
        // not "already in progress"
        let err = orchestrator
            .launch(Platform::Pump, &wallet, request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[tokio::test]
    async fn rejects_buy_over_limit_and_missing_wallet() {
        let settings = Settings::default();
        let transport = PipelineTransport::new(settings.clone());
        let orchestrator =
            LaunchOrchestrator::new(&transport, &NoopTranscoder, &settings, None, &LogStatusSink);

        let mut request = request_with_image();
        request.buy_amount_sol = 150.0;
        let err = orchestrator
            .launch(
                Platform::Pump,
                &WalletState::connected("Wallet111"),
                request,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds the limit"));

        let err = orchestrator
            .launch(
                Platform::Pump,
                &WalletState::disconnected(),
                request_with_image(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::WalletUnavailable(_)));
    }

    #[tokio::test]
    async fn bags_without_api_key_is_rejected_up_front() {
        let settings = Settings::default();
        let transport = PipelineTransport::new(settings.clone());
        let orchestrator =
            LaunchOrchestrator::new(&transport, &NoopTranscoder, &settings, None, &LogStatusSink);

        let err = orchestrator
            .launch(
                Platform::Bags,
                &WalletState::connected("Wallet111"),
                request_with_image(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Bags API key"));
        assert!(transport.requests.borrow().is_empty());
    }
}
