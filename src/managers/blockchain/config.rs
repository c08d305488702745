use std::time::Duration;

use serde::Deserialize;

/// Chain configuration shared by the listener transport and the responder.
///
/// The streaming endpoint feeds the event subscription; the JSON-RPC
/// endpoint carries the responder's signed transactions. They are
/// deliberately independent connections.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockchainConfig {
    pub chain_id: u64,
    pub rpc_endpoint: String,
    pub ws_endpoint: String,
    pub launchpad_address: String,
    pub operational_wallet_private_key: String,
    pub tx_confirmations: u64,
    pub tx_receipt_timeout_secs: u64,
}

impl BlockchainConfig {
    pub fn tx_receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_receipt_timeout_secs)
    }
}
