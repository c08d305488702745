//! Launchpad event listener: one subscription, survived across transport
//! drops by an explicit reconnection state machine.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{
    error::BlockchainError,
    events::{ActionRequestEvent, RawOccurrence, decode_occurrence},
    transport::{ConnectionState, EventSession, EventTransport},
};
use crate::observability;

/// Linear back-off unit: retry N waits N × this delay.
const BASE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Consecutive failed reconnect attempts before giving up permanently.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Settle time between a reconnect and re-issuing the subscription.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// Maximum number of blocks recovered after a reconnect. Beyond this the
/// missed range is skipped (extended downtime).
const MAX_BLOCKS_TO_BACKFILL: u64 = 300;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Business logic invoked once per decoded occurrence. Errors are logged at
/// the subscription boundary and never affect subscription health.
#[async_trait]
pub trait ActionRequestHandler: Send + Sync + 'static {
    async fn handle(&self, event: ActionRequestEvent) -> Result<(), HandlerError>;
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub base_retry_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub resubscribe_delay: Duration,
    pub max_backfill_blocks: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            base_retry_delay: BASE_RETRY_DELAY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            resubscribe_delay: RESUBSCRIBE_DELAY,
            max_backfill_blocks: MAX_BLOCKS_TO_BACKFILL,
        }
    }
}

/// Per-start subscription state. Dropping the task drops the session and the
/// stored handler with it, so a stale reconnect cannot resume delivering
/// events after an intentional stop.
struct ActiveSubscription {
    cancel: CancellationToken,
    done: CancellationToken,
    terminal: Arc<Mutex<Option<BlockchainError>>>,
    task: JoinHandle<()>,
}

pub struct EventListener {
    transport: Arc<dyn EventTransport>,
    config: ListenerConfig,
    state_tx: watch::Sender<ConnectionState>,
    active: Mutex<Option<ActiveSubscription>>,
}

impl EventListener {
    pub fn new(transport: Arc<dyn EventTransport>, config: ListenerConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            config,
            state_tx,
            active: Mutex::new(None),
        }
    }

    /// Start the subscription supervisor and wait until the first
    /// connection is established, so "subscribed" holds as a post-condition
    /// of a successful return. If reconnect attempts exhaust before the
    /// first connection, the terminal error is returned here instead.
    pub async fn start(
        &self,
        handler: Arc<dyn ActionRequestHandler>,
    ) -> Result<(), BlockchainError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(BlockchainError::Custom(
                "event listener is already started".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let terminal: Arc<Mutex<Option<BlockchainError>>> = Arc::new(Mutex::new(None));

        let task = tokio::spawn({
            let transport = Arc::clone(&self.transport);
            let state_tx = self.state_tx.clone();
            let cancel = cancel.clone();
            let done = done.clone();
            let terminal = Arc::clone(&terminal);
            let config = self.config.clone();
            async move {
                if let Err(error) = supervise(transport, handler, state_tx, cancel, config).await {
                    *terminal.lock().await = Some(error);
                }
                done.cancel();
            }
        });

        let mut state_rx = self.state_tx.subscribe();
        tokio::select! {
            result = state_rx.wait_for(|state| *state == ConnectionState::Connected) => {
                result.map_err(|_| {
                    BlockchainError::Custom("listener state channel closed".to_string())
                })?;
            }
            _ = done.cancelled() => {
                let _ = task.await;
                let error = terminal.lock().await.take().unwrap_or_else(|| {
                    BlockchainError::Custom("listener terminated before connecting".to_string())
                });
                return Err(error);
            }
        }

        *active = Some(ActiveSubscription {
            cancel,
            done,
            terminal,
            task,
        });
        Ok(())
    }

    /// Tear down the subscription, close the transport and clear all
    /// internal state including the stored handler.
    pub async fn stop(&self) {
        let Some(active) = self.active.lock().await.take() else {
            self.state_tx.send_replace(ConnectionState::Stopped);
            return;
        };

        active.cancel.cancel();
        let _ = active.task.await;
        self.state_tx.send_replace(ConnectionState::Stopped);
        tracing::info!("Event listener stopped");
    }

    /// Wait for the supervisor to terminate. Returns the terminal error
    /// when reconnect attempts exhausted, `Ok` after a graceful stop.
    pub async fn join(&self) -> Result<(), BlockchainError> {
        let (done, terminal) = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(active) => (active.done.clone(), Arc::clone(&active.terminal)),
                None => return Ok(()),
            }
        };

        done.cancelled().await;
        match terminal.lock().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}

async fn supervise(
    transport: Arc<dyn EventTransport>,
    handler: Arc<dyn ActionRequestHandler>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    config: ListenerConfig,
) -> Result<(), BlockchainError> {
    let mut attempt: u32 = 0;
    let mut reconnecting = false;
    let mut last_seen_block: Option<u64> = None;

    loop {
        state_tx.send_replace(ConnectionState::Connecting);

        match transport.connect().await {
            Ok(mut session) => {
                attempt = 0;
                state_tx.send_replace(ConnectionState::Connected);

                if reconnecting {
                    // Give a freshly reopened socket a moment to settle
                    // before re-issuing the subscription.
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(config.resubscribe_delay) => {}
                    }
                }

                match session.subscribe().await {
                    Ok(()) => {
                        if reconnecting {
                            if let Err(error) = recover_missed_occurrences(
                                session.as_ref(),
                                &handler,
                                &config,
                                &mut last_seen_block,
                            )
                            .await
                            {
                                tracing::warn!(
                                    error = %error,
                                    "Backfill of missed events failed; continuing with live stream"
                                );
                            }
                        }

                        loop {
                            tokio::select! {
                                _ = cancel.cancelled() => return Ok(()),
                                occurrence = session.next_occurrence() => match occurrence {
                                    Some(raw) => deliver(raw, &handler, &mut last_seen_block).await,
                                    None => break,
                                }
                            }
                        }

                        tracing::warn!("Event subscription stream ended; connection lost");
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "Failed to install event subscription");
                    }
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "Failed to open streaming transport");
            }
        }

        state_tx.send_replace(ConnectionState::Disconnected);
        reconnecting = true;

        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            tracing::error!(
                attempts = config.max_reconnect_attempts,
                "Reconnect attempts exhausted; giving up on the event subscription"
            );
            return Err(BlockchainError::ReconnectExhausted {
                attempts: config.max_reconnect_attempts,
            });
        }

        let delay = config.base_retry_delay * attempt;
        observability::record_reconnect_attempt(attempt);
        tracing::info!(
            attempt,
            max_attempts = config.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Decode one occurrence and hand it to the handler. Decode and handler
/// failures are confined to this occurrence.
async fn deliver(
    raw: RawOccurrence,
    handler: &Arc<dyn ActionRequestHandler>,
    last_seen_block: &mut Option<u64>,
) {
    match decode_occurrence(raw) {
        Ok(event) => {
            observability::record_occurrence("decoded");
            if let Some(block) = event.block_number {
                *last_seen_block = Some(last_seen_block.map_or(block, |seen| seen.max(block)));
            }

            let hash = event.hash;
            tracing::debug!(
                hash = %hash,
                agent = %event.agent_address,
                action_id = %event.action_id,
                block = ?event.block_number,
                "Action request received"
            );

            if let Err(error) = handler.handle(event).await {
                observability::record_occurrence("handler_failed");
                tracing::error!(hash = %hash, error = %error, "Action request handler failed");
            }
        }
        Err(error) => {
            observability::record_occurrence("decode_failed");
            tracing::warn!(error = %error, "Failed to decode event occurrence; skipping");
        }
    }
}

/// Fetch and deliver occurrences missed while disconnected, bounded by the
/// configured backfill window.
async fn recover_missed_occurrences(
    session: &dyn EventSession,
    handler: &Arc<dyn ActionRequestHandler>,
    config: &ListenerConfig,
    last_seen_block: &mut Option<u64>,
) -> Result<(), BlockchainError> {
    let Some(seen) = *last_seen_block else {
        return Ok(());
    };

    let current_block = session.block_number().await?;
    let from_block = seen + 1;
    if from_block > current_block {
        return Ok(());
    }

    let blocks_behind = current_block - seen;
    if blocks_behind > config.max_backfill_blocks {
        tracing::warn!(
            blocks_behind,
            max_blocks = config.max_backfill_blocks,
            "Extended downtime detected; skipping missed events"
        );
        *last_seen_block = Some(current_block);
        return Ok(());
    }

    let occurrences = session.past_occurrences(from_block, current_block).await?;
    observability::record_backfill(blocks_behind, occurrences.len());
    tracing::info!(
        from_block,
        to_block = current_block,
        count = occurrences.len(),
        "Recovered occurrences missed while disconnected"
    );

    for raw in occurrences {
        deliver(raw, handler, last_seen_block).await;
    }

    if last_seen_block.is_none_or(|seen| seen < current_block) {
        *last_seen_block = Some(current_block);
    }

    Ok(())
}
