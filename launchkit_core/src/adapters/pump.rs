// Pump.fun adapter: IPFS upload via pump.fun, transaction via the
// PumpPortal local-build API.

use super::{effective_description, social_parts, AdapterContext, PlatformAdapter};
use crate::error::{LaunchError, Result};
use crate::models::{
    BuildParams, ImageAsset, Platform, TokenMetadata, UnsignedLaunchTx, UploadOutcome,
};
use crate::transport::{MultipartPart, ProxyRequest, ResponseFormat};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;

pub struct PumpAdapter;

#[async_trait(?Send)]
impl PlatformAdapter for PumpAdapter {
    fn platform(&self) -> Platform {
        Platform::Pump
    }

    fn fee_eligible(&self) -> bool {
        true
    }

    async fn upload(
        &self,
        ctx: &AdapterContext<'_>,
        metadata: &TokenMetadata,
        image: ImageAsset,
    ) -> Result<UploadOutcome> {
        let mut parts = vec![
            MultipartPart::binary("file", image.file_name(), image.content_type.clone(), image.bytes),
            MultipartPart::text("name", &metadata.name),
            MultipartPart::text("symbol", &metadata.ticker),
            MultipartPart::text("description", effective_description(metadata)),
            MultipartPart::text("showName", "true"),
        ];
        parts.extend(social_parts(metadata));

        let response = ctx
            .transport
            .request(ProxyRequest::post_multipart(
                &ctx.settings.pump_ipfs_url,
                parts,
            ))
            .await?;
        if !response.ok {
            return Err(LaunchError::Upload {
                status: response.status,
                body: response.body_as_lossy_string(),
            });
        }

        let body = response.json()?;
        let metadata_uri = body
            .get("metadataUri")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                LaunchError::MalformedResponse("IPFS response missing metadataUri".to_string())
            })?
            .to_string();
        let image_uri = body
            .pointer("/metadata/image")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        info!("Metadata uploaded: {}", metadata_uri);

        Ok(UploadOutcome {
            metadata_uri,
            image_uri,
            server_mint: None,
        })
    }

    async fn build_transaction(
        &self,
        ctx: &AdapterContext<'_>,
        params: &BuildParams,
    ) -> Result<UnsignedLaunchTx> {
        portal_transaction(ctx, params, "pump").await
    }
}

/// Ask PumpPortal for an unsigned create transaction. Shared with the Bonk
/// adapter, which passes a different pool.
pub(super) async fn portal_transaction(
    ctx: &AdapterContext<'_>,
    params: &BuildParams,
    pool: &str,
) -> Result<UnsignedLaunchTx> {
    let payload = json!({
        "publicKey": params.wallet_address,
        "action": "create",
        "tokenMetadata": {
            "name": params.metadata.name,
            "symbol": params.metadata.ticker,
            "uri": params.metadata_uri,
        },
        "mint": params.mint_address,
        "denominatedInSol": "true",
        "amount": params.buy_amount_sol,
        "slippage": params.slippage,
        "priorityFee": ctx.settings.priority_fee_sol,
        "pool": pool,
    });
    debug!("Requesting {} create transaction from portal", pool);

    let response = ctx
        .transport
        .request(
            ProxyRequest::post_json(&ctx.settings.pump_trade_url, &payload)
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
