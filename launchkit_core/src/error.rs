use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image download failed: {0}")]
    ImageDownload(String),

    #[error("Upload failed ({status}): {body}")]
    Upload { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transaction build failed ({status}): {body}")]
    TransactionBuild { status: u16, body: String },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC rate limited ({status}). Configure an authenticated RPC endpoint (e.g. a Helius API key, free tier available)")]
    RateLimited { status: u16 },

    #[error("No wallet available: {0}")]
    WalletUnavailable(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[cfg(feature = "native")]
    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, LaunchError>;

impl LaunchError {
    /// Map well-known node failures to text the caller can show directly.
    /// The underlying error value is left unchanged; this is display-only.
    pub fn friendly_message(&self) -> String {
        let raw = self.to_string();
        let lower = raw.to_lowercase();
        if lower.contains("insufficient lamports") || lower.contains("insufficient funds") {
            return "Insufficient SOL balance to cover the launch and fees".to_string();
        }
        if lower.contains("blockhash not found") || lower.contains("blockhash expired") {
            return "Network was too slow (blockhash expired). Try again".to_string();
        }
        if matches!(self, LaunchError::RateLimited { .. }) {
            return "RPC rate limited. Configure a Helius API key in settings (free tier available)".to_string();
        }
        raw
    }
}

#[cfg(feature = "native")]
impl From<std::io::Error> for LaunchError {
    fn from(err: std::io::Error) -> Self {
        LaunchError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for LaunchError {
    fn from(err: config::ConfigError) -> Self {
        LaunchError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LaunchError {
    fn from(err: toml::ser::Error) -> Self {
        LaunchError::TomlSerialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_message_maps_insufficient_funds() {
        let err = LaunchError::Rpc("Transfer: insufficient lamports 100, need 200".to_string());
        assert!(err.friendly_message().contains("Insufficient SOL"));
    }

    #[test]
    fn friendly_message_maps_rate_limit() {
        let err = LaunchError::RateLimited { status: 403 };
        assert!(err.friendly_message().contains("Helius"));
    }

    #[test]
    fn friendly_message_passes_unknown_through() {
        let err = LaunchError::Validation("name required".to_string());
        assert_eq!(err.friendly_message(), "Validation error: name required");
    }
}
