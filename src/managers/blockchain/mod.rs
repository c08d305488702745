mod config;
mod contracts;
mod error;
mod events;
mod gas;
mod listener;
mod provider;
mod responder;
mod transport;
mod wallets;

pub use config::BlockchainConfig;
pub use contracts::AgentLaunchpad;
pub use error::BlockchainError;
pub use events::{
    ActionRequestEvent, EventDecodeError, PreDecodedArgs, RawOccurrence, decode_occurrence,
};
pub use listener::{ActionRequestHandler, EventListener, HandlerError, ListenerConfig};
pub use responder::{
    ActionPayload, ActionRequest, RequestRecord, Responder, TransactionResult, UpgradeRequest,
    ValueArg,
};
pub use transport::{ConnectionState, EventSession, EventTransport, WsTransport};

// Re-export the primitive chain types consumers need alongside the API.
pub use alloy::primitives::{Address, B256, U256};

