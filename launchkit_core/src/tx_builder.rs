// Raydium Launchpad instruction building for the locally constructed launch
// path. Byte order and account order are fixed by the on-chain program's ABI;
// any deviation produces a transaction the chain rejects.

use crate::error::{LaunchError, Result};
use borsh::BorshSerialize;
use solana_program::system_instruction;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account;

pub const LAUNCHPAD_PROGRAM: Pubkey = pubkey!("LanMV9sAd7wArD4vJFi2qDdfnVhFxYSUg6eADduJ3uj");
pub const LAUNCHPAD_AUTHORITY: Pubkey = pubkey!("WLHv2UAZm6z4KyaaELi5pjdbJh6RESMva1Rnn8pJVVh");
pub const GLOBAL_CONFIG: Pubkey = pubkey!("6s1xP3hpbAfFoNtUNF8mfHsjr2Bd97JxFJRWLbL6aHuX");
pub const PLATFORM_CONFIG: Pubkey = pubkey!("FfYek5vEz23cMkWsdJwG2oa6EphsvXSHrGpdALN4g6W1");
pub const EVENT_AUTHORITY: Pubkey = pubkey!("2DPAtwB8L12vrMRExbLuyGnC7n2J5LNoZQSejeQGpwkr");
pub const WSOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");
pub const METAPLEX_METADATA_PROGRAM: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
pub const COMPUTE_BUDGET_PROGRAM: Pubkey = pubkey!("ComputeBudget111111111111111111111111111111");

const POOL_SEED: &[u8] = b"pool";
const POOL_VAULT_SEED: &[u8] = b"pool_vault";
const METADATA_SEED: &[u8] = b"metadata";
const PLATFORM_CLAIM_FEE_SEED: &[u8] = b"platform_claim_fee";
const CREATOR_CLAIM_FEE_SEED: &[u8] = b"creator_claim_fee";

// initialize_v2 discriminator from the launchpad IDL (8 bytes)
pub const INITIALIZE_V2_DISCRIMINATOR: [u8; 8] = [0x43, 0x99, 0xaf, 0x27, 0xda, 0x10, 0x26, 0x20];
pub const BUY_EXACT_IN_DISCRIMINATOR: [u8; 8] = [250, 234, 13, 123, 213, 156, 19, 236];

pub const TOKEN_DECIMALS: u8 = 6;
pub const TOTAL_SUPPLY: u64 = 1_000_000_000_000_000;
pub const TOTAL_BASE_SELL: u64 = 793_100_000_000_000;
pub const TOTAL_QUOTE_FUND_RAISING: u64 = 85_000_000_000;
pub const COMPUTE_UNIT_LIMIT: u32 = 1_000_000;
pub const COMPUTE_UNIT_PRICE: u64 = 2_500_000;

pub const MAX_NAME_BYTES: usize = 31;
pub const MAX_SYMBOL_BYTES: usize = 7;

#[derive(BorshSerialize)]
struct MintParams {
    decimals: u8,
    name: String,
    symbol: String,
    uri: String,
}

// Borsh enum: 1-byte variant tag then fields
#[derive(BorshSerialize)]
enum CurveParams {
    Constant {
        supply: u64,
        total_base_sell: u64,
        total_quote_fund_raising: u64,
        migrate_type: u8,
    },
}

#[derive(BorshSerialize)]
struct VestingParams {
    total_locked_amount: u64,
    cliff_period: u64,
    unlock_period: u64,
}

#[derive(BorshSerialize)]
struct BuyExactInArgs {
    amount_in: u64,
    minimum_amount_out: u64,
    share_fee_rate: u64,
}

/// Addresses derived for one pool. Pure function of the mint and the
/// program constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAddresses {
    pub pool_state: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub metadata: Pubkey,
}

pub fn derive_launch_addresses(mint: &Pubkey) -> LaunchAddresses {
    let (pool_state, _) = Pubkey::find_program_address(
        &[POOL_SEED, mint.as_ref(), WSOL_MINT.as_ref()],
        &LAUNCHPAD_PROGRAM,
    );
    let (base_vault, _) = Pubkey::find_program_address(
        &[POOL_VAULT_SEED, pool_state.as_ref(), mint.as_ref()],
        &LAUNCHPAD_PROGRAM,
    );
    let (quote_vault, _) = Pubkey::find_program_address(
        &[POOL_VAULT_SEED, pool_state.as_ref(), WSOL_MINT.as_ref()],
        &LAUNCHPAD_PROGRAM,
    );
    let (metadata, _) = Pubkey::find_program_address(
        &[
            METADATA_SEED,
            METAPLEX_METADATA_PROGRAM.as_ref(),
            mint.as_ref(),
        ],
        &METAPLEX_METADATA_PROGRAM,
    );
    LaunchAddresses {
        pool_state,
        base_vault,
        quote_vault,
        metadata,
    }
}

/// Truncate to a byte budget without splitting a UTF-8 character.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Encode the pool-creation instruction data: discriminator, mint params
/// (length-prefixed strings), constant-curve params, zeroed vesting, and the
/// trailing creator-fee flag.
pub fn encode_initialize_data(name: &str, symbol: &str, uri: &str) -> Result<Vec<u8>> {
    let mint_params = MintParams {
        decimals: TOKEN_DECIMALS,
        name: truncate_utf8(name, MAX_NAME_BYTES).to_string(),
        symbol: truncate_utf8(&symbol.to_uppercase(), MAX_SYMBOL_BYTES).to_string(),
        uri: uri.to_string(),
    };
    let curve_params = CurveParams::Constant {
        supply: TOTAL_SUPPLY,
        total_base_sell: TOTAL_BASE_SELL,
        total_quote_fund_raising: TOTAL_QUOTE_FUND_RAISING,
        migrate_type: 1,
    };
    let vesting_params = VestingParams {
        total_locked_amount: 0,
        cliff_period: 0,
        unlock_period: 0,
    };

    let mut data = INITIALIZE_V2_DISCRIMINATOR.to_vec();
    data.extend(
        borsh::to_vec(&mint_params)
            .map_err(|e| LaunchError::Validation(format!("encode mint params failed: {}", e)))?,
    );
    data.extend(
        borsh::to_vec(&curve_params)
            .map_err(|e| LaunchError::Validation(format!("encode curve params failed: {}", e)))?,
    );
    data.extend(
        borsh::to_vec(&vesting_params)
            .map_err(|e| LaunchError::Validation(format!("encode vesting params failed: {}", e)))?,
    );
    // cpmm creator fee switch, off
    data.push(0);
    Ok(data)
}

/// Build the pool-creation instruction with its 18-entry account list.
pub fn build_initialize_instruction(
    payer: &Pubkey,
    mint: &Pubkey,
    name: &str,
    symbol: &str,
    uri: &str,
) -> Result<(Instruction, LaunchAddresses)> {
    let addrs = derive_launch_addresses(mint);
    let data = encode_initialize_data(name, symbol, uri)?;

    let accounts = vec![
        AccountMeta::new(*payer, true),                                // 0: payer
        AccountMeta::new_readonly(*payer, false),                      // 1: creator
        AccountMeta::new_readonly(GLOBAL_CONFIG, false),               // 2: global config
        AccountMeta::new_readonly(PLATFORM_CONFIG, false),             // 3: platform config
        AccountMeta::new_readonly(LAUNCHPAD_AUTHORITY, false),         // 4: authority
        AccountMeta::new(addrs.pool_state, false),                     // 5: pool state
        AccountMeta::new(*mint, true),                                 // 6: base mint (new token)
        AccountMeta::new_readonly(WSOL_MINT, false),                   // 7: quote mint
        AccountMeta::new(addrs.base_vault, false),                     // 8: base vault
        AccountMeta::new(addrs.quote_vault, false),                    // 9: quote vault
        AccountMeta::new(addrs.metadata, false),                       // 10: metadata
        AccountMeta::new_readonly(spl_token::id(), false),             // 11: base token program
        AccountMeta::new_readonly(spl_token::id(), false),             // 12: quote token program
        AccountMeta::new_readonly(METAPLEX_METADATA_PROGRAM, false),   // 13: metadata program
        AccountMeta::new_readonly(solana_program::system_program::id(), false), // 14: system program
        AccountMeta::new_readonly(solana_program::sysvar::rent::id(), false),   // 15: rent sysvar
        AccountMeta::new_readonly(EVENT_AUTHORITY, false),             // 16: event authority
        AccountMeta::new_readonly(LAUNCHPAD_PROGRAM, false),           // 17: launchpad program
    ];

    Ok((
        Instruction {
            program_id: LAUNCHPAD_PROGRAM,
            accounts,
            data,
        },
        addrs,
    ))
}

/// Compute budget prelude: unit limit then unit price, ahead of every
/// locally built launch transaction.
pub fn compute_budget_instructions() -> Vec<Instruction> {
    let mut limit_data = vec![2u8];
    limit_data.extend_from_slice(&COMPUTE_UNIT_LIMIT.to_le_bytes());
    let mut price_data = vec![3u8];
    price_data.extend_from_slice(&COMPUTE_UNIT_PRICE.to_le_bytes());

    vec![
        Instruction {
            program_id: COMPUTE_BUDGET_PROGRAM,
            accounts: vec![],
            data: limit_data,
        },
        Instruction {
            program_id: COMPUTE_BUDGET_PROGRAM,
            accounts: vec![],
            data: price_data,
        },
    ]
}

/// Same-transaction dev buy: create the token and WSOL ATAs, wrap the buy
/// amount, buy, then close the WSOL account to reclaim rent. Order is fixed.
pub fn build_dev_buy_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    addrs: &LaunchAddresses,
    buy_amount_lamports: u64,
) -> Result<Vec<Instruction>> {
    let user_token_account = get_associated_token_address(payer, mint);
    let user_wsol_account = get_associated_token_address(payer, &WSOL_MINT);

    let (platform_claim_fee_vault, _) = Pubkey::find_program_address(
        &[PLATFORM_CLAIM_FEE_SEED, addrs.pool_state.as_ref()],
        &LAUNCHPAD_PROGRAM,
    );
    let (creator_claim_fee_vault, _) = Pubkey::find_program_address(
        &[CREATOR_CLAIM_FEE_SEED, addrs.pool_state.as_ref()],
        &LAUNCHPAD_PROGRAM,
    );

    let mut data = BUY_EXACT_IN_DISCRIMINATOR.to_vec();
    data.extend(
        borsh::to_vec(&BuyExactInArgs {
            amount_in: buy_amount_lamports,
            // accept any fill; slippage is bounded by the amount in
            minimum_amount_out: 1,
            share_fee_rate: 0,
        })
        .map_err(|e| LaunchError::Validation(format!("encode buy args failed: {}", e)))?,
    );

    let buy_accounts = vec![
        AccountMeta::new(*payer, true),                              // 0: owner
        AccountMeta::new_readonly(LAUNCHPAD_AUTHORITY, false),       // 1: authority
        AccountMeta::new_readonly(GLOBAL_CONFIG, false),             // 2: global config
        AccountMeta::new_readonly(PLATFORM_CONFIG, false),           // 3: platform config
        AccountMeta::new(addrs.pool_state, false),                   // 4: pool state
        AccountMeta::new(user_token_account, false),                 // 5: user base ATA
        AccountMeta::new(user_wsol_account, false),                  // 6: user quote ATA
        AccountMeta::new(addrs.base_vault, false),                   // 7: base vault
        AccountMeta::new(addrs.quote_vault, false),                  // 8: quote vault
        AccountMeta::new_readonly(*mint, false),                     // 9: base mint
        AccountMeta::new_readonly(WSOL_MINT, false),                 // 10: quote mint
        AccountMeta::new_readonly(spl_token::id(), false),           // 11: base token program
        AccountMeta::new_readonly(spl_token::id(), false),           // 12: quote token program
        AccountMeta::new_readonly(EVENT_AUTHORITY, false),           // 13: event authority
        AccountMeta::new_readonly(LAUNCHPAD_PROGRAM, false),         // 14: launchpad program
        AccountMeta::new_readonly(solana_program::system_program::id(), false), // 15: system program
        AccountMeta::new(platform_claim_fee_vault, false),           // 16: platform claim fee vault
        AccountMeta::new(creator_claim_fee_vault, false),            // 17: creator claim fee vault
    ];

    let sync_native = spl_token::instruction::sync_native(&spl_token::id(), &user_wsol_account)
        .map_err(|e| LaunchError::Validation(format!("sync_native build failed: {}", e)))?;
    let close_wsol = spl_token::instruction::close_account(
        &spl_token::id(),
        &user_wsol_account,
        payer,
        payer,
        &[],
    )
    .map_err(|e| LaunchError::Validation(format!("close_account build failed: {}", e)))?;

    Ok(vec![
        create_associated_token_account(payer, payer, mint, &spl_token::id()),
        create_associated_token_account(payer, payer, &WSOL_MINT, &spl_token::id()),
        system_instruction::transfer(payer, &user_wsol_account, buy_amount_lamports),
        sync_native,
        Instruction {
            program_id: LAUNCHPAD_PROGRAM,
            accounts: buy_accounts,
            data,
        },
        close_wsol,
    ])
}

/// Full local launch instruction list: compute budget prelude, pool
/// creation, then the optional dev buy.
pub fn build_launch_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    name: &str,
    symbol: &str,
    uri: &str,
    buy_amount_lamports: u64,
) -> Result<(Vec<Instruction>, LaunchAddresses)> {
    let mut instructions = compute_budget_instructions();
    let (initialize, addrs) = build_initialize_instruction(payer, mint, name, symbol, uri)?;
    instructions.push(initialize);

    if buy_amount_lamports > 0 {
        instructions.extend(build_dev_buy_instructions(
            payer,
            mint,
            &addrs,
            buy_amount_lamports,
        )?);
        log::debug!(
            "Added dev buy instructions for {} lamports",
            buy_amount_lamports
        );
    }

    Ok((instructions, addrs))
}
