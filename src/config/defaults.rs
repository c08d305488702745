//! Compile-time defaults. The launchpad address and the operational wallet
//! key have no sensible defaults and must be supplied via config file or
//! environment.

pub(crate) const DEFAULT_LOG_LEVEL: &str = "launchpad_avs_node=info";

/// BNB Smart Chain mainnet.
pub(crate) const DEFAULT_CHAIN_ID: u64 = 56;

pub(crate) const DEFAULT_RPC_ENDPOINT: &str = "https://bsc-dataseed.binance.org";

pub(crate) const DEFAULT_WS_ENDPOINT: &str = "wss://bsc-ws-node.nariox.org:443";

pub(crate) const DEFAULT_TX_CONFIRMATIONS: u64 = 1;

pub(crate) const DEFAULT_TX_RECEIPT_TIMEOUT_SECS: u64 = 300;

pub(crate) const DEFAULT_METRICS_PORT: u16 = 9464;
