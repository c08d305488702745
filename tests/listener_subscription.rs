//! Listener behavior against a scripted transport: reconnection, state
//! transitions, re-subscription, backfill and terminal failure.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use launchpad_avs_node::managers::blockchain::{
    ActionRequestEvent, ActionRequestHandler, AgentLaunchpad, BlockchainError, ConnectionState,
    EventListener, EventSession, EventTransport, HandlerError, ListenerConfig, RawOccurrence, U256,
};

const REQUEST_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
const AGENT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn test_config() -> ListenerConfig {
    ListenerConfig {
        base_retry_delay: Duration::from_millis(20),
        max_reconnect_attempts: 3,
        resubscribe_delay: Duration::from_millis(5),
        max_backfill_blocks: 300,
    }
}

fn bare_log_occurrence(action_id: u64, block_number: u64) -> RawOccurrence {
    let topic0 = format!("{:?}", AgentLaunchpad::AgentActionRequest::SIGNATURE_HASH);
    let payload = json!({
        "address": "0x4444444444444444444444444444444444444444",
        "topics": [
            topic0,
            REQUEST_HASH,
            "0x000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        ],
        "data": format!("0x{:064x}", action_id),
        "blockNumber": format!("0x{:x}", block_number),
        "blockHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
        "transactionHash": "0x3333333333333333333333333333333333333333333333333333333333333333",
        "transactionIndex": "0x0",
        "logIndex": "0x0",
        "removed": false,
    });
    RawOccurrence::classify(payload).expect("valid occurrence payload")
}

struct MockSession {
    occurrences: mpsc::UnboundedReceiver<RawOccurrence>,
    backfill: Vec<RawOccurrence>,
    head_block: u64,
    subscribed: bool,
}

impl MockSession {
    fn new(
        occurrences: mpsc::UnboundedReceiver<RawOccurrence>,
        backfill: Vec<RawOccurrence>,
        head_block: u64,
    ) -> Self {
        Self {
            occurrences,
            backfill,
            head_block,
            subscribed: false,
        }
    }
}

#[async_trait]
impl EventSession for MockSession {
    async fn subscribe(&mut self) -> Result<(), BlockchainError> {
        self.subscribed = true;
        Ok(())
    }

    async fn next_occurrence(&mut self) -> Option<RawOccurrence> {
        if !self.subscribed {
            return None;
        }
        self.occurrences.recv().await
    }

    async fn block_number(&self) -> Result<u64, BlockchainError> {
        Ok(self.head_block)
    }

    async fn past_occurrences(
        &self,
        _from_block: u64,
        _to_block: u64,
    ) -> Result<Vec<RawOccurrence>, BlockchainError> {
        Ok(self.backfill.clone())
    }
}

struct MockTransport {
    sessions: Mutex<VecDeque<MockSession>>,
    connect_attempts: AtomicU32,
}

impl MockTransport {
    fn with_sessions(sessions: Vec<MockSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            connect_attempts: AtomicU32::new(0),
        }
    }

    fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventTransport for MockTransport {
    async fn connect(&self) -> Result<Box<dyn EventSession>, BlockchainError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        // Small dial latency so state observers can see `Connecting`.
        tokio::time::sleep(Duration::from_millis(1)).await;

        match self.sessions.lock().unwrap().pop_front() {
            Some(session) => Ok(Box::new(session) as Box<dyn EventSession>),
            None => Err(BlockchainError::ProviderInit {
                reason: "scripted connection failure".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct CollectingHandler {
    events: Mutex<Vec<ActionRequestEvent>>,
}

impl CollectingHandler {
    fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    fn events(&self) -> Vec<ActionRequestEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionRequestHandler for CollectingHandler {
    async fn handle(&self, event: ActionRequestEvent) -> Result<(), HandlerError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

fn spawn_state_collector(listener: &EventListener) -> Arc<Mutex<Vec<ConnectionState>>> {
    let states = Arc::new(Mutex::new(Vec::new()));
    let mut rx = listener.subscribe_state();
    let collected = Arc::clone(&states);
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            collected.lock().unwrap().push(state);
        }
    });
    states
}

async fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[tokio::test]
async fn test_reconnect_reestablishes_subscription() {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    let transport = Arc::new(MockTransport::with_sessions(vec![
        MockSession::new(rx_a, Vec::new(), 16),
        MockSession::new(rx_b, Vec::new(), 16),
    ]));
    let listener = EventListener::new(
        Arc::clone(&transport) as Arc<dyn EventTransport>,
        test_config(),
    );
    let states = spawn_state_collector(&listener);
    let handler = Arc::new(CollectingHandler::default());

    listener.start(handler.clone()).await.unwrap();

    tx_a.send(bare_log_occurrence(1, 16)).unwrap();
    assert!(wait_until(|| handler.count() == 1, Duration::from_secs(2)).await);

    // Connection lost; the listener must reconnect and re-subscribe.
    drop(tx_a);
    assert!(wait_until(|| transport.connect_attempts() == 2, Duration::from_secs(2)).await);
    assert!(
        wait_until(
            || listener.state() == ConnectionState::Connected,
            Duration::from_secs(2)
        )
        .await
    );

    // An event injected after the reconnect still reaches the handler.
    tx_b.send(bare_log_occurrence(2, 17)).unwrap();
    assert!(wait_until(|| handler.count() == 2, Duration::from_secs(2)).await);

    let observed = states.lock().unwrap().clone();
    assert_eq!(
        observed[..5].to_vec(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );

    listener.stop().await;
    assert_eq!(listener.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn test_missed_occurrences_are_backfilled_on_reconnect() {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    let transport = Arc::new(MockTransport::with_sessions(vec![
        MockSession::new(rx_a, Vec::new(), 16),
        // Block 17 was emitted while disconnected.
        MockSession::new(rx_b, vec![bare_log_occurrence(2, 17)], 18),
    ]));
    let listener = EventListener::new(
        Arc::clone(&transport) as Arc<dyn EventTransport>,
        test_config(),
    );
    let handler = Arc::new(CollectingHandler::default());

    listener.start(handler.clone()).await.unwrap();

    tx_a.send(bare_log_occurrence(1, 16)).unwrap();
    assert!(wait_until(|| handler.count() == 1, Duration::from_secs(2)).await);

    drop(tx_a);
    assert!(
        wait_until(
            || listener.state() == ConnectionState::Connected && transport.connect_attempts() == 2,
            Duration::from_secs(2)
        )
        .await
    );

    tx_b.send(bare_log_occurrence(3, 18)).unwrap();
    assert!(wait_until(|| handler.count() == 3, Duration::from_secs(2)).await);

    // Backfilled occurrence arrives before the live one from the new session.
    let events = handler.events();
    assert_eq!(events[1].action_id, U256::from(2u64));
    assert_eq!(events[1].block_number, Some(17));
    assert_eq!(events[2].action_id, U256::from(3u64));

    listener.stop().await;
}

#[tokio::test]
async fn test_exhausted_reconnects_report_a_single_terminal_failure() {
    let transport = Arc::new(MockTransport::with_sessions(Vec::new()));
    let listener = EventListener::new(
        Arc::clone(&transport) as Arc<dyn EventTransport>,
        test_config(),
    );
    let handler = Arc::new(CollectingHandler::default());

    let result = listener.start(handler).await;
    assert!(matches!(
        result,
        Err(BlockchainError::ReconnectExhausted { attempts: 3 })
    ));

    // Initial attempt plus the three scheduled retries, then nothing more.
    assert_eq!(transport.connect_attempts(), 4);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.connect_attempts(), 4);

    assert_eq!(listener.state(), ConnectionState::Disconnected);
    assert!(listener.join().await.is_ok());
}

#[tokio::test]
async fn test_identical_occurrences_are_delivered_independently() {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(MockTransport::with_sessions(vec![MockSession::new(
        rx,
        Vec::new(),
        16,
    )]));
    let listener = EventListener::new(
        Arc::clone(&transport) as Arc<dyn EventTransport>,
        test_config(),
    );
    let handler = Arc::new(CollectingHandler::default());

    listener.start(handler.clone()).await.unwrap();

    tx.send(bare_log_occurrence(1, 16)).unwrap();
    tx.send(bare_log_occurrence(1, 16)).unwrap();
    assert!(wait_until(|| handler.count() == 2, Duration::from_secs(2)).await);

    let events = handler.events();
    assert_eq!(events[0], events[1]);
    assert_eq!(events[0].hash, REQUEST_HASH.parse::<alloy::primitives::B256>().unwrap());
    assert_eq!(
        events[0].agent_address,
        AGENT.parse::<alloy::primitives::Address>().unwrap()
    );
    assert_eq!(events[0].action_id, U256::from(1u64));

    listener.stop().await;
}

#[tokio::test]
async fn test_stop_tears_down_the_subscription() {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(MockTransport::with_sessions(vec![MockSession::new(
        rx,
        Vec::new(),
        16,
    )]));
    let listener = EventListener::new(
        Arc::clone(&transport) as Arc<dyn EventTransport>,
        test_config(),
    );
    let handler = Arc::new(CollectingHandler::default());

    listener.start(handler).await.unwrap();
    listener.stop().await;

    assert_eq!(listener.state(), ConnectionState::Stopped);
    // The session (and with it the stored handler) is gone; nothing can be
    // delivered after an intentional stop.
    assert!(tx.send(bare_log_occurrence(1, 16)).is_err());
}

#[tokio::test]
async fn test_undecodable_occurrence_does_not_stall_the_stream() {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(MockTransport::with_sessions(vec![MockSession::new(
        rx,
        Vec::new(),
        16,
    )]));
    let listener = EventListener::new(
        Arc::clone(&transport) as Arc<dyn EventTransport>,
        test_config(),
    );
    let handler = Arc::new(CollectingHandler::default());

    listener.start(handler.clone()).await.unwrap();

    // A log carrying a foreign event signature decodes to an error and is
    // skipped; the occurrence after it is still delivered.
    let undecodable = RawOccurrence::classify(json!({
        "address": "0x4444444444444444444444444444444444444444",
        "topics": ["0x9999999999999999999999999999999999999999999999999999999999999999"],
        "data": "0x",
        "blockNumber": "0x10",
        "removed": false,
    }))
    .unwrap();

    tx.send(undecodable).unwrap();
    tx.send(bare_log_occurrence(7, 16)).unwrap();

    assert!(wait_until(|| handler.count() == 1, Duration::from_secs(2)).await);
    assert_eq!(handler.events()[0].action_id, U256::from(7u64));

    listener.stop().await;
}
