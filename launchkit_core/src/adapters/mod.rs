// Platform adapters. Each target platform implements the same two-step
// contract: upload metadata, then obtain an unsigned launch transaction.

use crate::error::Result;
use crate::image::ImageTranscoder;
use crate::models::{
    BuildParams, ImageAsset, Platform, TokenMetadata, UnsignedLaunchTx, UploadOutcome,
};
use crate::settings::Settings;
use crate::transport::{MultipartPart, ProxyTransport};
use async_trait::async_trait;

mod bags;
mod bonk;
mod pump;

pub use bags::{validate_claimers, BagsAdapter, MAX_TOTAL_CLAIMER_BPS};
pub use bonk::{pool_state_for_mint, BonkAdapter};
pub use pump::PumpAdapter;

/// Shared handles the adapters operate through. Borrowed for the duration
/// of one launch.
pub struct AdapterContext<'a> {
    pub transport: &'a dyn ProxyTransport,
    pub transcoder: &'a dyn ImageTranscoder,
    pub settings: &'a Settings,
}

#[async_trait(?Send)]
pub trait PlatformAdapter {
    fn platform(&self) -> Platform;

    /// Whether the service fee applies to launches on this platform.
    fn fee_eligible(&self) -> bool;

    /// Push the image and metadata to the platform's storage, returning the
    /// metadata URI (and, for platforms that allocate one, the mint).
    async fn upload(
        &self,
        ctx: &AdapterContext<'_>,
        metadata: &TokenMetadata,
        image: ImageAsset,
    ) -> Result<UploadOutcome>;

    /// Obtain the unsigned launch transaction, either from the platform's
    /// builder API or assembled locally.
    async fn build_transaction(
        &self,
        ctx: &AdapterContext<'_>,
        params: &BuildParams,
    ) -> Result<UnsignedLaunchTx>;
}

pub fn adapter_for(platform: Platform) -> Box<dyn PlatformAdapter> {
    match platform {
        Platform::Pump => Box::new(PumpAdapter),
        Platform::Bonk => Box::new(BonkAdapter),
        Platform::Bags => Box::new(BagsAdapter),
    }
}

/// Optional social links as multipart fields, skipping empty ones.
fn social_parts(metadata: &TokenMetadata) -> Vec<MultipartPart> {
    let mut parts = Vec::new();
    for (key, value) in [
        ("twitter", &metadata.twitter),
        ("telegram", &metadata.telegram),
        ("website", &metadata.website),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            parts.push(MultipartPart::text(key, value));
        }
    }
    parts
}

/// Platforms reject empty descriptions; fall back to a minimal one.
fn effective_description(metadata: &TokenMetadata) -> String {
    let trimmed = metadata.description.trim();
    if trimmed.is_empty() {
        format!("{} token", metadata.name)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            name: "Test".to_string(),
            ticker: "TST".to_string(),
            description: String::new(),
            image_url: None,
            twitter: Some("@test".to_string()),
            telegram: None,
            website: Some(String::new()),
        }
    }

    #[test]
    fn social_parts_skip_missing_and_empty() {
        let parts = social_parts(&metadata());
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "twitter");
    }

    #[test]
    fn empty_description_gets_fallback() {
        assert_eq!(effective_description(&metadata()), "Test token");
        let mut m = metadata();
        m.description = "  real words  ".to_string();
        assert_eq!(effective_description(&m), "real words");
    }

    #[test]
    fn adapter_dispatch_matches_platform() {
        for platform in [Platform::Pump, Platform::Bonk, Platform::Bags] {
            assert_eq!(adapter_for(platform).platform(), platform);
        }
    }

    #[test]
    fn fee_applies_to_pump_only() {
        assert!(adapter_for(Platform::Pump).fee_eligible());
        assert!(!adapter_for(Platform::Bonk).fee_eligible());
        assert!(!adapter_for(Platform::Bags).fee_eligible());
    }
}
