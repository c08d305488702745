use alloy::{
    contract::Error as ContractError,
    primitives::Address,
    signers::local::LocalSignerError,
    transports::{RpcError, TransportErrorKind},
};

#[derive(Debug, thiserror::Error)]
pub enum BlockchainError {
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Invalid request hash '{hash}': expected a 0x-prefixed 32-byte hex string")]
    InvalidRequestHash { hash: String },

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("Invalid private key (length: {key_length})")]
    InvalidPrivateKey {
        key_length: usize,
        #[source]
        source: LocalSignerError,
    },

    #[error("Invalid call data: {reason}")]
    InvalidCallData { reason: String },

    #[error("Invalid value '{value}': expected a decimal or 0x-prefixed integer string")]
    InvalidValue { value: String },

    #[error("Signer {signer} is not the authorized responder (avs: {avs})")]
    NotAuthorized { signer: Address, avs: Address },

    #[error("Provider initialization failed: {reason}")]
    ProviderInit { reason: String },

    #[error("Failed to get block number: {reason}")]
    GetBlockNumber {
        reason: String,
        #[source]
        source: Option<RpcError<TransportErrorKind>>,
    },

    #[error("Failed to get logs: {reason}")]
    GetLogs {
        reason: String,
        #[source]
        source: Option<RpcError<TransportErrorKind>>,
    },

    #[error("Event subscription failed: {reason}")]
    Subscribe {
        reason: String,
        #[source]
        source: Option<RpcError<TransportErrorKind>>,
    },

    #[error("Gas estimation failed for {function}: {source}")]
    GasEstimation {
        function: &'static str,
        #[source]
        source: ContractError,
    },

    #[error("Transaction submission failed for {function}: {source}")]
    Submission {
        function: &'static str,
        #[source]
        source: ContractError,
    },

    #[error("Transaction receipt failed: {reason}")]
    ReceiptFailed { reason: String },

    #[error("Reconnect attempts exhausted after {attempts} consecutive failures")]
    ReconnectExhausted { attempts: u32 },

    #[error("{0}")]
    Custom(String),
}

impl BlockchainError {
    /// Create a GetLogs error with the underlying RPC error
    pub(crate) fn get_logs(err: RpcError<TransportErrorKind>) -> Self {
        Self::GetLogs {
            reason: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a GetBlockNumber error with the underlying RPC error
    pub(crate) fn get_block_number(err: RpcError<TransportErrorKind>) -> Self {
        Self::GetBlockNumber {
            reason: err.to_string(),
            source: Some(err),
        }
    }

    pub(crate) fn subscribe(err: RpcError<TransportErrorKind>) -> Self {
        Self::Subscribe {
            reason: err.to_string(),
            source: Some(err),
        }
    }
}
