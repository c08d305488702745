//! Streaming transport for the launchpad event subscription.
//!
//! The transport owns a single persistent WebSocket connection and nothing
//! else: a connect yields a [`EventSession`], the session can subscribe to
//! the `AgentActionRequest` filter, surface live occurrences, answer raw
//! block-number queries and fetch past occurrences for backfill. All
//! reconnection policy lives in the listener.

use std::cmp;

use alloy::{
    primitives::Address,
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};

use super::{
    contracts::AgentLaunchpad,
    error::BlockchainError,
    events::RawOccurrence,
    provider::{BlockchainProvider, initialize_streaming_provider},
};

/// Maximum block span per `eth_getLogs` request during backfill.
const MAX_BLOCKS_PER_LOG_FETCH: u64 = 50;

/// Connection state of the listener/transport pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal; entered only via an explicit stop.
    Stopped,
}

/// One live connection. Dropping the session closes the connection and any
/// subscription installed on it.
#[async_trait]
pub trait EventSession: Send + Sync {
    /// Install the event subscription on this connection. Must be called
    /// before [`next_occurrence`](Self::next_occurrence) yields anything.
    async fn subscribe(&mut self) -> Result<(), BlockchainError>;

    /// Next raw occurrence, or `None` once the connection is lost.
    async fn next_occurrence(&mut self) -> Option<RawOccurrence>;

    /// Raw block-number query on this connection.
    async fn block_number(&self) -> Result<u64, BlockchainError>;

    /// Fetch past occurrences of the subscribed event for a block range.
    async fn past_occurrences(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawOccurrence>, BlockchainError>;
}

#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn EventSession>, BlockchainError>;
}

/// WebSocket transport bound to one launchpad contract address.
pub struct WsTransport {
    ws_endpoint: String,
    contract_address: Address,
}

impl WsTransport {
    pub fn new(ws_endpoint: impl Into<String>, contract_address: Address) -> Self {
        Self {
            ws_endpoint: ws_endpoint.into(),
            contract_address,
        }
    }

    fn filter(&self) -> Filter {
        Filter::new()
            .address(self.contract_address)
            .event_signature(AgentLaunchpad::AgentActionRequest::SIGNATURE_HASH)
    }
}

#[async_trait]
impl EventTransport for WsTransport {
    async fn connect(&self) -> Result<Box<dyn EventSession>, BlockchainError> {
        let provider = initialize_streaming_provider(&self.ws_endpoint).await?;

        // Connectivity probe; a socket that dials but cannot answer is not
        // a usable session.
        let block = provider
            .get_block_number()
            .await
            .map_err(BlockchainError::get_block_number)?;

        tracing::info!(
            endpoint = %self.ws_endpoint,
            block,
            "Streaming provider connected"
        );

        Ok(Box::new(WsEventSession {
            provider,
            filter: self.filter(),
            stream: None,
        }))
    }
}

struct WsEventSession {
    provider: BlockchainProvider,
    filter: Filter,
    stream: Option<Box<dyn Stream<Item = Log> + Send + Sync + Unpin>>,
}

#[async_trait]
impl EventSession for WsEventSession {
    async fn subscribe(&mut self) -> Result<(), BlockchainError> {
        let subscription = self
            .provider
            .subscribe_logs(&self.filter)
            .await
            .map_err(BlockchainError::subscribe)?;

        self.stream = Some(Box::new(subscription.into_stream()));
        Ok(())
    }

    async fn next_occurrence(&mut self) -> Option<RawOccurrence> {
        let stream = self.stream.as_mut()?;
        stream.next().await.map(RawOccurrence::from_subscription_log)
    }

    async fn block_number(&self) -> Result<u64, BlockchainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(BlockchainError::get_block_number)
    }

    async fn past_occurrences(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawOccurrence>, BlockchainError> {
        let mut occurrences = Vec::new();

        let mut block = from_block;
        while block <= to_block {
            let chunk_end = cmp::min(block + MAX_BLOCKS_PER_LOG_FETCH - 1, to_block);
            let filter = self.filter.clone().from_block(block).to_block(chunk_end);

            let logs = self
                .provider
                .get_logs(&filter)
                .await
                .map_err(BlockchainError::get_logs)?;

            for log in logs {
                if log.topic0().is_some() {
                    occurrences.push(RawOccurrence::from_subscription_log(log));
                }
            }

            block = chunk_end + 1;
        }

        Ok(occurrences)
    }
}
