// Bonk.fun adapter. Storage is a two-step worker upload (image, then
// metadata JSON); the launch transaction is normally assembled locally
// against Raydium Launchpad, with the portal API as a fallback.

use super::{effective_description, AdapterContext, PlatformAdapter};
use crate::error::{LaunchError, Result};
use crate::image::ensure_png;
use crate::models::{
    BuildParams, ImageAsset, Platform, TokenMetadata, UnsignedLaunchTx, UploadOutcome,
};
use crate::transport::{MultipartPart, ProxyRequest, ResponseFormat};
use crate::tx_builder::{self, truncate_utf8, MAX_NAME_BYTES, MAX_SYMBOL_BYTES};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

const MAX_DESCRIPTION_BYTES: usize = 1_000;

pub struct BonkAdapter;

#[async_trait(?Send)]
impl PlatformAdapter for BonkAdapter {
    fn platform(&self) -> Platform {
        Platform::Bonk
    }

    fn fee_eligible(&self) -> bool {
        false
    }

    async fn upload(
        &self,
        ctx: &AdapterContext<'_>,
        metadata: &TokenMetadata,
        image: ImageAsset,
    ) -> Result<UploadOutcome> {
        // The worker rejects WebP
        let image = ensure_png(image, ctx.transcoder)?;

        let image_response = ctx
            .transport
            .request(ProxyRequest::post_multipart(
                &ctx.settings.bonk_image_upload_url,
                vec![MultipartPart::binary(
                    "image",
                    image.file_name(),
                    image.content_type.clone(),
                    image.bytes,
                )],
            ))
            .await?;
        if !image_response.ok {
            return Err(LaunchError::Upload {
                status: image_response.status,
                body: image_response.body_as_lossy_string(),
            });
        }
        let image_uri = image_response.text()?.to_string();
        debug!("Image uploaded: {}", image_uri);

        let description = effective_description(metadata);
        let mut payload = json!({
            "createdOn": "https://bonk.fun",
            "name": truncate_utf8(&metadata.name, MAX_NAME_BYTES),
            "symbol": truncate_utf8(&metadata.ticker.to_uppercase(), MAX_SYMBOL_BYTES),
            "description": truncate_utf8(&description, MAX_DESCRIPTION_BYTES),
            "image": image_uri,
        });
        for (key, value) in [
            ("website", &metadata.website),
            ("twitter", &metadata.twitter),
            ("telegram", &metadata.telegram),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                payload[key] = json!(value);
            }
        }

        let meta_response = ctx
            .transport
            .request(ProxyRequest::post_json(
                &ctx.settings.bonk_metadata_upload_url,
                &payload,
            ))
            .await?;
        if !meta_response.ok {
            return Err(LaunchError::Upload {
                status: meta_response.status,
                body: meta_response.body_as_lossy_string(),
            });
        }
        let metadata_uri = meta_response.text()?.to_string();
        info!("Metadata uploaded: {}", metadata_uri);

        Ok(UploadOutcome {
            metadata_uri,
            image_uri: Some(image_uri),
            server_mint: None,
        })
    }

    async fn build_transaction(
        &self,
        ctx: &AdapterContext<'_>,
        params: &BuildParams,
    ) -> Result<UnsignedLaunchTx> {
        if !ctx.settings.bonk_local_build {
            return super::pump::portal_transaction(ctx, params, "bonk").await;
        }

        let payer = Pubkey::from_str(&params.wallet_address)
            .map_err(|_| LaunchError::InvalidEncoding("invalid wallet address".to_string()))?;
        let mint = Pubkey::from_str(&params.mint_address)
            .map_err(|_| LaunchError::InvalidEncoding("invalid mint address".to_string()))?;
        let buy_lamports = (params.buy_amount_sol * 1e9).floor() as u64;

        let (instructions, addrs) = tx_builder::build_launch_instructions(
            &payer,
            &mint,
            &params.metadata.name,
            &params.metadata.ticker,
            &params.metadata_uri,
            buy_lamports,
        )?;
        debug!(
            "Built local launchpad transaction, pool state {}",
            addrs.pool_state
        );
        Ok(UnsignedLaunchTx::Instructions(instructions))
    }
}

/// Pool state address for a mint, recorded in the launch result so the
/// caller can link straight to the pool.
pub fn pool_state_for_mint(mint_address: &str) -> Option<String> {
    let mint = Pubkey::from_str(mint_address).ok()?;
    Some(tx_builder::derive_launch_addresses(&mint).pool_state.to_string())
}
