// Shared data model for the launch pipeline

use serde::{Deserialize, Serialize};
use solana_program::instruction::Instruction;

/// Target launch platform. Selected by the caller, dispatched through
/// `adapters::adapter_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Pump,
    Bonk,
    Bags,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Pump => "pump",
            Platform::Bonk => "bonk",
            Platform::Bags => "bags",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized token metadata as entered by the user. Immutable input to a
/// launch; adapters derive truncated copies, they never mutate this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Raw image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageAsset {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// File name derived from the MIME subtype, e.g. `token.png`.
    pub fn file_name(&self) -> String {
        let ext = self
            .content_type
            .split('/')
            .nth(1)
            .filter(|s| !s.is_empty())
            .unwrap_or("png");
        format!("token.{}", ext)
    }

    pub fn is_webp(&self) -> bool {
        self.content_type == "image/webp"
    }
}

/// Connected wallet as seen by the pipeline. Owned by the caller, read-only
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletState {
    pub connected: bool,
    pub address: Option<String>,
}

impl WalletState {
    pub fn connected(address: impl Into<String>) -> Self {
        Self {
            connected: true,
            address: Some(address.into()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            address: None,
        }
    }
}

/// How a transaction gets signed: locally with a stored key, or delegated
/// to an external wallet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SigningContext {
    #[serde(default)]
    pub autosign_enabled: bool,
    #[serde(default)]
    pub stored_private_key: Option<String>,
}

/// A Bags fee-split recipient: either a wallet address or a social identity
/// resolved server-side, with a basis-point share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeClaimer {
    pub recipient: ClaimerRecipient,
    pub bps: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimerRecipient {
    Address(String),
    Twitter(String),
    Github(String),
}

impl FeeClaimer {
    /// JSON shape the Bags launch API expects. Social handles are prefixed
    /// identities with any leading `@` stripped.
    pub fn to_api_value(&self) -> serde_json::Value {
        match &self.recipient {
            ClaimerRecipient::Address(addr) => serde_json::json!({
                "address": addr,
                "bps": self.bps,
            }),
            ClaimerRecipient::Twitter(handle) => serde_json::json!({
                "identity": format!("twitter:{}", handle.trim_start_matches('@')),
                "bps": self.bps,
            }),
            ClaimerRecipient::Github(handle) => serde_json::json!({
                "identity": format!("github:{}", handle.trim_start_matches('@')),
                "bps": self.bps,
            }),
        }
    }
}

/// One launch attempt's input.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub metadata: TokenMetadata,
    /// User-supplied image; when absent the image is downloaded from
    /// `metadata.image_url`.
    pub image: Option<ImageAsset>,
    pub buy_amount_sol: f64,
    pub slippage: u64,
    pub fee_claimers: Vec<FeeClaimer>,
}

/// What an adapter's upload step produced.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub metadata_uri: String,
    pub image_uri: Option<String>,
    /// Some platforms (Bags) choose the mint server-side; when present no
    /// local mint keypair is generated.
    pub server_mint: Option<String>,
}

/// Unsigned transaction handed from an adapter to the signing service.
/// Single-use: once signed and sent it is discarded.
#[derive(Debug, Clone)]
pub enum UnsignedLaunchTx {
    /// Serialized versioned transaction straight from a builder API.
    Serialized(Vec<u8>),
    /// Locally built instruction list; the signer assembles a legacy
    /// transaction around it with a fresh blockhash.
    Instructions(Vec<Instruction>),
}

/// Parameters an adapter needs to obtain the unsigned transaction.
#[derive(Debug, Clone)]
pub struct BuildParams {
    pub wallet_address: String,
    pub metadata: TokenMetadata,
    pub metadata_uri: String,
    pub mint_address: String,
    pub buy_amount_sol: f64,
    pub slippage: u64,
    pub fee_claimers: Vec<FeeClaimer>,
}

/// Outcome of a successful fee transfer. `None` at the call site (fee
/// skipped below the dust floor or disabled) is a valid non-error result.
#[derive(Debug, Clone)]
pub struct FeeResult {
    pub signature: String,
    pub fee_amount_sol: f64,
}

/// Terminal value of one launch. Never retried internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchResult {
    pub platform: Platform,
    pub signature: String,
    pub mint_address: String,
    pub metadata_uri: String,
    pub fee_signature: Option<String>,
    pub pool_state: Option<String>,
    pub timestamp: i64,
}
