// Bags.fm adapter. The only platform with an authenticated API: every call
// carries an x-api-key header. Bags can allocate the mint server-side and
// supports splitting creator fees across recipients.

use super::{effective_description, social_parts, AdapterContext, PlatformAdapter};
use crate::error::{LaunchError, Result};
use crate::image::ensure_png;
use crate::models::{
    BuildParams, ImageAsset, Platform, TokenMetadata, UnsignedLaunchTx, UploadOutcome,
};
use crate::transport::{MultipartPart, ProxyRequest, ResponseFormat};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::{json, Value};

/// Fee shares are basis points and may not exceed the whole.
pub const MAX_TOTAL_CLAIMER_BPS: u32 = 10_000;

pub struct BagsAdapter;

fn api_key(ctx: &AdapterContext<'_>) -> Result<String> {
    ctx.settings
        .bags_api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
        .ok_or_else(|| LaunchError::Validation("Bags API key required".to_string()))
}

#[async_trait(?Send)]
impl PlatformAdapter for BagsAdapter {
    fn platform(&self) -> Platform {
        Platform::Bags
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
        let key = api_key(ctx)?;
        // Bags rejects WebP uploads
        let image = ensure_png(image, ctx.transcoder)?;

        let mut parts = vec![
            MultipartPart::binary("image", image.file_name(), image.content_type.clone(), image.bytes),
            MultipartPart::text("name", &metadata.name),
            MultipartPart::text("symbol", &metadata.ticker),
            // Bags requires a non-empty description
            MultipartPart::text("description", effective_description(metadata)),
        ];
        parts.extend(social_parts(metadata));

        let response = ctx
            .transport
            .request(
                ProxyRequest::post_multipart(&ctx.settings.bags_token_info_url, parts)
                    .with_header("x-api-key", &key),
            )
            .await?;
        if !response.ok {
            return Err(LaunchError::Upload {
                status: response.status,
                body: response.body_as_lossy_string(),
            });
        }

        let body = response.json()?;
        // Responses come as { success, response: {...} } or flat
        let inner = body.get("response").unwrap_or(body);
        let metadata_uri = ["tokenMetadata", "metadataUri", "uri"]
            .iter()
            .find_map(|k| inner.get(*k).and_then(|v| v.as_str()))
            .or_else(|| body.get("ipfs").and_then(|v| v.as_str()))
            .ok_or_else(|| {
                LaunchError::MalformedResponse("token info response missing IPFS URI".to_string())
            })?
            .to_string();
        let server_mint = inner
            .get("tokenMint")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        info!(
            "Token info created: {} (mint {})",
            metadata_uri,
            server_mint.as_deref().unwrap_or("local")
        );

        Ok(UploadOutcome {
            metadata_uri,
            image_uri: None,
            server_mint,
        })
    }

    async fn build_transaction(
        &self,
        ctx: &AdapterContext<'_>,
        params: &BuildParams,
    ) -> Result<UnsignedLaunchTx> {
        let key = api_key(ctx)?;
        validate_claimers(&params.fee_claimers)?;

        let mut payload = json!({
            "ipfs": params.metadata_uri,
            "tokenMint": params.mint_address,
            "wallet": params.wallet_address,
            "initialBuyLamports": (params.buy_amount_sol * 1e9).floor() as u64,
        });
        if !params.fee_claimers.is_empty() {
            let claimers: Vec<Value> =
                params.fee_claimers.iter().map(|c| c.to_api_value()).collect();
            payload["feeClaimers"] = Value::Array(claimers);
        }
        debug!("Requesting launch transaction for {}", params.mint_address);

        let response = ctx
            .transport
            .request(
                ProxyRequest::post_json(&ctx.settings.bags_launch_tx_url, &payload)
                    .with_header("x-api-key", &key)
                    .expecting(ResponseFormat::Bytes),
            )
            .await?;
        if !response.ok {
            return Err(LaunchError::TransactionBuild {
                status: response.status,
                body: response.body_as_lossy_string(),
            });
        }

        Ok(UnsignedLaunchTx::Serialized(response.bytes()?.to_vec()))
    }
}

pub fn validate_claimers(claimers: &[crate::models::FeeClaimer]) -> Result<()> {
    let total: u32 = claimers.iter().map(|c| c.bps as u32).sum();
    if total > MAX_TOTAL_CLAIMER_BPS {
        return Err(LaunchError::Validation(format!(
            "fee claimer shares total {} bps, maximum is {}",
            total, MAX_TOTAL_CLAIMER_BPS
        )));
    }
    if claimers.iter().any(|c| c.bps == 0) {
        return Err(LaunchError::Validation(
            "fee claimer share must be > 0 bps".to_string(),
        ));
    }
    Ok(())
}
