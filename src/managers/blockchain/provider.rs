use std::sync::Arc;

use alloy::{
    network::{Ethereum, EthereumWallet},
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    transports::http::reqwest::Url,
};

use super::error::BlockchainError;

/// Use Arc<DynProvider> for thread-safe sharing.
pub(crate) type BlockchainProvider = Arc<DynProvider<Ethereum>>;

/// Open a streaming (WebSocket) provider. Used by the listener's transport;
/// carries no wallet because the subscription side never signs.
pub(crate) async fn initialize_streaming_provider(
    ws_endpoint: &str,
) -> Result<BlockchainProvider, BlockchainError> {
    let ws = WsConnect::new(ws_endpoint);
    let provider = ProviderBuilder::new()
        .connect_ws(ws)
        .await
        .map_err(|e| BlockchainError::ProviderInit {
            reason: format!("WebSocket connect to '{}' failed: {}", ws_endpoint, e),
        })?;

    Ok(Arc::new(provider.erased()))
}

/// Build the responder's JSON-RPC provider with the signing wallet attached.
/// Construction is purely local; call [`verify_connectivity`] at bootstrap so
/// a misconfigured endpoint fails at boot rather than at first spend.
pub(crate) fn initialize_rpc_provider(
    rpc_endpoint: &str,
    wallet: EthereumWallet,
) -> Result<BlockchainProvider, BlockchainError> {
    let url: Url = rpc_endpoint
        .parse()
        .map_err(|e| BlockchainError::ProviderInit {
            reason: format!("Invalid RPC URL '{}': {}", rpc_endpoint, e),
        })?;

    let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

    Ok(Arc::new(provider.erased()))
}

/// Probe the provider with a block-number query.
pub(crate) async fn verify_connectivity(
    provider: &BlockchainProvider,
) -> Result<u64, BlockchainError> {
    provider
        .get_block_number()
        .await
        .map_err(BlockchainError::get_block_number)
}
