// Transaction signing and submission. Two paths: autosign with a stored
// private key (sign locally, broadcast over RPC) or hand-off to an external
// wallet. The mint keypair always co-signs before the payer.

use crate::error::{LaunchError, Result};
use crate::keycodec;
use crate::models::{SigningContext, UnsignedLaunchTx};
use crate::rpc::{RpcClient, SendOptions};
use async_trait::async_trait;
use log::{debug, info};
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::str::FromStr;

/// External wallet seam. Implementations receive a partially signed
/// transaction, add the payer signature, and broadcast it themselves.
#[async_trait(?Send)]
pub trait WalletSigner {
    fn is_available(&self) -> bool;
    async fn sign_and_send(&self, transaction_bytes: &[u8]) -> Result<String>;
}

pub struct SigningService<'a> {
    context: &'a SigningContext,
    wallet: Option<&'a dyn WalletSigner>,
}

impl<'a> SigningService<'a> {
    pub fn new(context: &'a SigningContext, wallet: Option<&'a dyn WalletSigner>) -> Self {
        Self { context, wallet }
    }

    /// Resolve the payer keypair for autosign. Errors when autosign is on
    /// without a stored key, or when the key does not match the payer.
    fn payer_keypair(&self, payer_address: &str) -> Result<Keypair> {
        let raw = self
            .context
            .stored_private_key
            .as_deref()
            .ok_or_else(|| LaunchError::Signing("autosign enabled but no key stored".to_string()))?;
        let bytes = keycodec::parse_private_key_string(raw)?;
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| LaunchError::Signing(format!("invalid stored key: {}", e)))?;
        if keypair.pubkey().to_string() != payer_address {
            return Err(LaunchError::Signing(
                "stored key does not match the connected wallet".to_string(),
            ));
        }
        Ok(keypair)
    }

    /// Sign an unsigned launch transaction and submit it. `mint` co-signs
    /// first when present; the payer signature comes from the stored key or
    /// the external wallet.
    pub async fn sign_and_send(
        &self,
        transaction: UnsignedLaunchTx,
        mint: Option<&Keypair>,
        payer_address: &str,
        rpc: &RpcClient<'_>,
    ) -> Result<String> {
        match transaction {
            UnsignedLaunchTx::Serialized(bytes) => {
                self.sign_and_send_serialized(&bytes, mint, payer_address, rpc)
                    .await
            }
            UnsignedLaunchTx::Instructions(instructions) => {
                self.sign_and_send_instructions(instructions, mint, payer_address, rpc)
                    .await
            }
        }
    }

    async fn sign_and_send_serialized(
        &self,
        bytes: &[u8],
        mint: Option<&Keypair>,
        payer_address: &str,
        rpc: &RpcClient<'_>,
    ) -> Result<String> {
        let mut tx: VersionedTransaction = bincode::deserialize(bytes).map_err(|e| {
            LaunchError::MalformedResponse(format!("server transaction did not decode: {}", e))
        })?;
        let message_bytes = tx.message.serialize();

        if let Some(mint) = mint {
            slot_signature(&mut tx, &message_bytes, mint)?;
        }

        if self.context.autosign_enabled {
            let payer = self.payer_keypair(payer_address)?;
            slot_signature(&mut tx, &message_bytes, &payer)?;
            let wire = bincode::serialize(&tx)
                .map_err(|e| LaunchError::Signing(format!("transaction encode failed: {}", e)))?;
            debug!("Broadcasting autosigned transaction ({} bytes)", wire.len());
            rpc.send_raw_transaction(&wire, SendOptions::default()).await
        } else {
            let wallet = self.available_wallet()?;
            let wire = bincode::serialize(&tx)
                .map_err(|e| LaunchError::Signing(format!("transaction encode failed: {}", e)))?;
            info!("Handing transaction to external wallet for approval");
            wallet.sign_and_send(&wire).await
        }
    }

    async fn sign_and_send_instructions(
        &self,
        instructions: Vec<solana_sdk::instruction::Instruction>,
        mint: Option<&Keypair>,
        payer_address: &str,
        rpc: &RpcClient<'_>,
    ) -> Result<String> {
        let payer_pubkey = Pubkey::from_str(payer_address)
            .map_err(|_| LaunchError::InvalidEncoding("invalid payer address".to_string()))?;
        let latest = rpc.get_latest_blockhash().await?;
        let blockhash = Hash::from_str(&latest.blockhash)
            .map_err(|_| LaunchError::MalformedResponse("unparsable blockhash".to_string()))?;

        let message = Message::new_with_blockhash(&instructions, Some(&payer_pubkey), &blockhash);
        let mut tx = Transaction::new_unsigned(message);

        if self.context.autosign_enabled {
            let payer = self.payer_keypair(payer_address)?;
            let mut signers: Vec<&dyn Signer> = Vec::new();
            if let Some(mint) = mint {
                signers.push(mint);
            }
            signers.push(&payer);
            tx.try_sign(&signers, blockhash)
                .map_err(|e| LaunchError::Signing(format!("signing failed: {}", e)))?;
            let wire = bincode::serialize(&tx)
                .map_err(|e| LaunchError::Signing(format!("transaction encode failed: {}", e)))?;
            debug!("Broadcasting autosigned transaction ({} bytes)", wire.len());
            rpc.send_raw_transaction(&wire, SendOptions::default()).await
        } else {
            let wallet = self.available_wallet()?;
            if let Some(mint) = mint {
                tx.try_partial_sign(&[mint], blockhash)
                    .map_err(|e| LaunchError::Signing(format!("mint co-sign failed: {}", e)))?;
            }
            let wire = bincode::serialize(&tx)
                .map_err(|e| LaunchError::Signing(format!("transaction encode failed: {}", e)))?;
            info!("Handing transaction to external wallet for approval");
            wallet.sign_and_send(&wire).await
        }
    }

    fn available_wallet(&self) -> Result<&dyn WalletSigner> {
        match self.wallet {
            Some(wallet) if wallet.is_available() => Ok(wallet),
            _ => Err(LaunchError::WalletUnavailable(
                "no external wallet and autosign is off".to_string(),
            )),
        }
    }
}

/// Place a signature at the keypair's slot in a versioned transaction.
/// The signer must appear among the message's required signers.
fn slot_signature(
    tx: &mut VersionedTransaction,
    message_bytes: &[u8],
    keypair: &Keypair,
) -> Result<()> {
    let required = tx.message.header().num_required_signatures as usize;
    let position = tx
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == keypair.pubkey())
        .ok_or_else(|| {
            LaunchError::Signing(format!(
                "{} is not a required signer of this transaction",
                keypair.pubkey()
            ))
        })?;
    tx.signatures[position] = keypair.sign_message(message_bytes);
    Ok(())
}
