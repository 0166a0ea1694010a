// Base58 codec and private-key parsing

use crate::error::LaunchError;
use solana_sdk::signature::Keypair;

/// Encode bytes as base58 (Bitcoin alphabet). Leading zero bytes become
/// leading '1' characters.
pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a base58 string. Fails on any character outside the 58-symbol
/// alphabet.
pub fn decode_base58(s: &str) -> Result<Vec<u8>, LaunchError> {
    bs58::decode(s)
        .into_vec()
        .map_err(|e| LaunchError::InvalidEncoding(format!("base58 decode failed: {}", e)))
}

/// Load a keypair from a base58-encoded 64-byte secret key (the standard
/// wallet export format).
pub fn keypair_from_base58(s: &str) -> Result<Keypair, LaunchError> {
    let bytes = decode_base58(s.trim())?;
    Keypair::from_bytes(&bytes)
        .map_err(|e| LaunchError::Signing(format!("invalid keypair bytes: {}", e)))
}

/// Parse a private key string in the formats users paste in:
/// - Base58 (standard Solana format, ~88 chars)
/// - JSON array string like "[1,2,3,...]"
/// - Comma-separated bytes like "1,2,3,..."
pub fn parse_private_key_string(s: &str) -> Result<Vec<u8>, LaunchError> {
    let trimmed = s.trim();

    // Base58 first (most common format)
    if trimmed.len() >= 80 && !trimmed.starts_with('[') && !trimmed.contains(',') {
        return decode_base58(trimmed);
    }

    // JSON array format: [1,2,3,...]
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<u8>>(trimmed)
            .map_err(|e| LaunchError::InvalidEncoding(format!("JSON parse failed: {}", e)));
    }

    // Comma-separated format: 1,2,3,...
    if trimmed.contains(',') {
        let parts: Result<Vec<u8>, _> = trimmed
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect();
        return parts.map_err(|e| LaunchError::InvalidEncoding(format!("CSV parse failed: {}", e)));
    }

    Err(LaunchError::InvalidEncoding(
        "unrecognized private key format; expected base58, JSON array, or comma-separated bytes"
            .to_string(),
    ))
}
