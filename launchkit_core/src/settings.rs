use crate::error::LaunchError;
use crate::models::SigningContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_pump_ipfs_url")]
    pub pump_ipfs_url: String,
    #[serde(default = "default_pump_trade_url")]
    pub pump_trade_url: String,
    #[serde(default = "default_bonk_image_upload_url")]
    pub bonk_image_upload_url: String,
    #[serde(default = "default_bonk_metadata_upload_url")]
    pub bonk_metadata_upload_url: String,
    #[serde(default = "default_bags_token_info_url")]
    pub bags_token_info_url: String,
    #[serde(default = "default_bags_launch_tx_url")]
    pub bags_launch_tx_url: String,
    #[serde(default)]
    pub bags_api_key: Option<String>,
    #[serde(default = "default_fee_enabled")]
    pub fee_enabled: bool,
    #[serde(default)]
    pub autosign_enabled: bool,
    #[serde(default)]
    pub wallet_private_key: Option<String>,
    #[serde(default = "default_priority_fee_sol")]
    pub priority_fee_sol: f64,
    #[serde(default = "default_slippage")]
    pub default_slippage: u64,
    #[serde(default = "default_buy_amount_limit_sol")]
    pub buy_amount_limit_sol: f64,
    // Build the Bonk launch transaction locally instead of asking the
    // portal API for one
    #[serde(default = "default_bonk_local_build")]
    pub bonk_local_build: bool,
}

impl Settings {
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, LaunchError> {
        let builder = config::Config::builder().add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), LaunchError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.rpc_url.is_empty() {
            return Err(LaunchError::Validation("rpc_url must be set".to_string()));
        }
        if self.priority_fee_sol < 0.0 {
            return Err(LaunchError::Validation(
                "priority_fee_sol must be >= 0".to_string(),
            ));
        }
        if self.buy_amount_limit_sol <= 0.0 {
            return Err(LaunchError::Validation(
                "buy_amount_limit_sol must be > 0".to_string(),
            ));
        }
        if self.default_slippage > 100 {
            return Err(LaunchError::Validation(
                "default_slippage is a percentage, must be <= 100".to_string(),
            ));
        }
        Ok(())
    }

    pub fn signing_context(&self) -> SigningContext {
        SigningContext {
            autosign_enabled: self.autosign_enabled,
            stored_private_key: self.wallet_private_key.clone(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            pump_ipfs_url: default_pump_ipfs_url(),
            pump_trade_url: default_pump_trade_url(),
            bonk_image_upload_url: default_bonk_image_upload_url(),
            bonk_metadata_upload_url: default_bonk_metadata_upload_url(),
            bags_token_info_url: default_bags_token_info_url(),
            bags_launch_tx_url: default_bags_launch_tx_url(),
            bags_api_key: None,
            fee_enabled: default_fee_enabled(),
            autosign_enabled: false,
            wallet_private_key: None,
            priority_fee_sol: default_priority_fee_sol(),
            default_slippage: default_slippage(),
            buy_amount_limit_sol: default_buy_amount_limit_sol(),
            bonk_local_build: default_bonk_local_build(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}
fn default_pump_ipfs_url() -> String {
    "https://pump.fun/api/ipfs".to_string()
}
fn default_pump_trade_url() -> String {
    "https://pumpportal.fun/api/trade-local".to_string()
}
fn default_bonk_image_upload_url() -> String {
    "https://nft-storage.letsbonk22.workers.dev/upload/img".to_string()
}
fn default_bonk_metadata_upload_url() -> String {
    "https://nft-storage.letsbonk22.workers.dev/upload/meta".to_string()
}
fn default_bags_token_info_url() -> String {
    "https://public-api-v2.bags.fm/api/v1/token-launch/create-token-info".to_string()
}
fn default_bags_launch_tx_url() -> String {
    "https://public-api-v2.bags.fm/api/v1/token-launch/create-launch-transaction".to_string()
}
fn default_fee_enabled() -> bool {
    true
}
fn default_priority_fee_sol() -> f64 {
    0.0005
}
fn default_slippage() -> u64 {
    10
}
fn default_buy_amount_limit_sol() -> f64 {
    100.0
}
fn default_bonk_local_build() -> bool {
    true
}
