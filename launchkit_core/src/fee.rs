// Service fee policy. A flat cut of the dev buy is transferred in a separate
// transaction ahead of the launch; quotes below the dust floor are waived.

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;

pub const FEE_WALLET: Pubkey = pubkey!("3TS9UrUpwaBQctvtVeQg5HbUuArNqvoDELwcMXTGbBv1");

/// Fee rate applied to the dev-buy amount.
pub const FEE_RATE: f64 = 0.02;
/// Quotes under this many lamports are waived rather than sent.
pub const MIN_FEE_LAMPORTS: u64 = 1_000;

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeQuote {
    pub fee_lamports: u64,
    /// Buy amount remaining after the fee, in SOL.
    pub net_amount_sol: f64,
}

/// Quote the fee for a buy amount. Returns `None` when no fee is due:
/// fees disabled, nothing bought, or the quote falls under the dust floor.
pub fn compute_fee(buy_amount_sol: f64, enabled: bool) -> Option<FeeQuote> {
    if !enabled || buy_amount_sol <= 0.0 {
        return None;
    }
    let fee_lamports = (buy_amount_sol * FEE_RATE * LAMPORTS_PER_SOL).floor() as u64;
    if fee_lamports < MIN_FEE_LAMPORTS {
        return None;
    }
    Some(FeeQuote {
        fee_lamports,
        net_amount_sol: buy_amount_sol - fee_lamports as f64 / LAMPORTS_PER_SOL,
    })
}

/// System transfer of the quoted fee to the service wallet.
pub fn build_fee_transfer(payer: &Pubkey, fee_lamports: u64) -> Instruction {
    system_instruction::transfer(payer, &FEE_WALLET, fee_lamports)
}
