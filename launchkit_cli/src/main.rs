// Launchkit CLI
// One-shot token launcher over launchkit_core

use clap::{Parser, ValueEnum};
use launchkit_core::image::{sniff_content_type, NativeTranscoder};
use launchkit_core::keycodec::parse_private_key_string;
use launchkit_core::{
    ClaimerRecipient, FeeClaimer, ImageAsset, LaunchOrchestrator, LaunchRequest, LogStatusSink,
    Platform, Settings, TokenMetadata, WalletState,
};
use log::{info, warn};
use solana_sdk::signature::{Keypair, Signer};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "launchkit")]
#[command(about = "Launch a token on pump.fun, bonk.fun, or bags.fm")]
#[command(version)]
struct Cli {
    /// Settings file (TOML); built-in defaults when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target platform
    #[arg(long, value_enum)]
    platform: PlatformArg,

    /// Token name
    #[arg(long)]
    name: String,

    /// Token ticker
    #[arg(long)]
    ticker: String,

    /// Token description
    #[arg(long, default_value = "")]
    description: String,

    /// Image file to upload
    #[arg(long)]
    image: Option<PathBuf>,

    /// Image URL to download (used when --image is absent)
    #[arg(long)]
    image_url: Option<String>,

    /// Dev buy amount in SOL
    #[arg(long, default_value_t = 0.0)]
    buy: f64,

    /// Slippage percentage (default from settings)
    #[arg(long)]
    slippage: Option<u64>,

    /// Twitter link
    #[arg(long)]
    twitter: Option<String>,

    /// Telegram link
    #[arg(long)]
    telegram: Option<String>,

    /// Website link
    #[arg(long)]
    website: Option<String>,

    /// Bags fee split, repeatable: address:<pubkey>:<bps>,
    /// twitter:<handle>:<bps>, or github:<handle>:<bps>
    #[arg(long = "fee-claimer", value_parser = parse_claimer)]
    fee_claimers: Vec<FeeClaimer>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
enum PlatformArg {
    Pump,
    Bonk,
    Bags,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Pump => Platform::Pump,
            PlatformArg::Bonk => Platform::Bonk,
            PlatformArg::Bags => Platform::Bags,
        }
    }
}

fn parse_claimer(spec: &str) -> Result<FeeClaimer, String> {
    let mut pieces = spec.splitn(3, ':');
    let kind = pieces.next().unwrap_or("");
    let value = pieces.next().ok_or("fee claimer missing value")?;
    let bps: u16 = pieces
        .next()
        .ok_or("fee claimer missing bps")?
        .parse()
        .map_err(|_| "fee claimer bps must be a number")?;
    let recipient = match kind {
        "address" => ClaimerRecipient::Address(value.to_string()),
        "twitter" => ClaimerRecipient::Twitter(value.to_string()),
        "github" => ClaimerRecipient::Github(value.to_string()),
        other => return Err(format!("unknown fee claimer kind '{}'", other)),
    };
    Ok(FeeClaimer { recipient, bps })
}

fn load_image(path: &PathBuf) -> Result<ImageAsset, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let content_type = sniff_content_type(&bytes, path.to_str());
    Ok(ImageAsset::new(bytes, content_type))
}

/// The CLI has no external wallet to delegate to; launches sign locally
/// with the configured key.
fn resolve_wallet(settings: &Settings) -> Result<WalletState, String> {
    if !settings.autosign_enabled {
        return Err(
            "the CLI signs locally: set autosign_enabled = true and wallet_private_key in settings"
                .to_string(),
        );
    }
    let key = settings
        .wallet_private_key
        .as_deref()
        .ok_or("autosign_enabled is set but wallet_private_key is missing")?;
    let bytes = parse_private_key_string(key).map_err(|e| e.to_string())?;
    let keypair = Keypair::from_bytes(&bytes).map_err(|e| format!("invalid wallet key: {}", e))?;
    Ok(WalletState::connected(keypair.pubkey().to_string()))
}

fn token_page(platform: Platform, mint: &str) -> String {
    match platform {
        Platform::Pump => format!("https://pump.fun/coin/{}", mint),
        Platform::Bonk => format!("https://bonk.fun/coin/{}", mint),
        Platform::Bags => format!("https://bags.fm/token/{}", mint),
    }
}

// Transport traits are ?Send, so everything runs on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let platform = Platform::from(cli.platform);

    let settings = match &cli.config {
        Some(path) => match Settings::from_file(&path.to_string_lossy()) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("error: failed to load {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => {
            warn!("No --config given, using built-in defaults");
            Settings::default()
        }
    };
    if let Err(e) = settings.validate() {
        eprintln!("error: invalid settings: {}", e);
        process::exit(1);
    }

    let wallet = match resolve_wallet(&settings) {
        Ok(wallet) => wallet,
        Err(message) => {
            eprintln!("error: {}", message);
            process::exit(1);
        }
    };

    let image = match &cli.image {
        Some(path) => match load_image(path) {
            Ok(image) => Some(image),
            Err(message) => {
                eprintln!("error: {}", message);
                process::exit(1);
            }
        },
        None => None,
    };

    let request = LaunchRequest {
        metadata: TokenMetadata {
            name: cli.name.clone(),
            ticker: cli.ticker.clone(),
            description: cli.description.clone(),
            image_url: cli.image_url.clone(),
            twitter: cli.twitter.clone(),
            telegram: cli.telegram.clone(),
            website: cli.website.clone(),
        },
        image,
        buy_amount_sol: cli.buy,
        slippage: cli.slippage.unwrap_or(settings.default_slippage),
        fee_claimers: cli.fee_claimers.clone(),
    };

    let transport = match launchkit_core::NativeTransport::new() {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let transcoder = NativeTranscoder;
    let sink = LogStatusSink;
    let orchestrator = LaunchOrchestrator::new(&transport, &transcoder, &settings, None, &sink);

    info!("Launching '{}' ({}) on {}", cli.name, cli.ticker, platform);
    match orchestrator.launch(platform, &wallet, request).await {
        Ok(result) => {
            info!("Token page: {}", token_page(result.platform, &result.mint_address));
            info!("Transaction: https://solscan.io/tx/{}", result.signature);
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("error: failed to render result: {}", e),
            }
        }
        Err(e) => {
            eprintln!("error: {}", e.friendly_message());
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_requires_platform() {
        let result = Cli::try_parse_from(["launchkit", "--name", "T", "--ticker", "T"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_full_arg_set() {
        let cli = Cli::try_parse_from([
            "launchkit",
            "--platform", "bags",
            "--name", "Token",
            "--ticker", "TKN",
            "--buy", "0.5",
            "--fee-claimer", "twitter:@dev:5000",
            "--fee-claimer", "address:Addr111:2500",
        ])
        .unwrap();
        assert_eq!(cli.platform, PlatformArg::Bags);
        assert_eq!(cli.buy, 0.5);
        assert_eq!(cli.fee_claimers.len(), 2);
        assert_eq!(cli.fee_claimers[0].bps, 5000);
        assert!(matches!(
            cli.fee_claimers[1].recipient,
            ClaimerRecipient::Address(_)
        ));
    }

    #[test]
    fn parse_rejects_unknown_platform() {
        let result = Cli::try_parse_from([
            "launchkit", "--platform", "moon", "--name", "T", "--ticker", "T",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_claimer_rejects_unknown_kind() {
        assert!(parse_claimer("venmo:someone:100").is_err());
        assert!(parse_claimer("address:Abc123:100").is_ok());
    }
}
