// Launchkit Core Library
// Platform-agnostic token launch pipeline

pub mod adapters;
pub mod error;
pub mod fee;
pub mod image;
pub mod keycodec;
pub mod launch;
pub mod models;
pub mod relay;
pub mod rpc;
pub mod settings;
pub mod signing;
pub mod transport;
pub mod tx_builder;

#[cfg(feature = "native")]
pub mod native;

// Re-exports
pub use adapters::{adapter_for, AdapterContext, PlatformAdapter};
pub use error::{LaunchError, Result};
pub use launch::{LaunchOrchestrator, LaunchState, LogStatusSink, StatusSink};
pub use models::*;
pub use rpc::RpcClient;
pub use settings::Settings;
pub use signing::{SigningService, WalletSigner};
pub use transport::{ProxyRequest, ProxyResponse, ProxyTransport};

#[cfg(feature = "native")]
pub use native::NativeTransport;
