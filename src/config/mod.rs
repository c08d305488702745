mod defaults;
mod error;

use config::{Environment, File};
use serde::Deserialize;

pub use error::ConfigError;

use crate::managers::blockchain::BlockchainConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub logger: LoggerConfig,
    pub metrics: MetricsConfig,
    pub managers: ManagersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManagersConfig {
    pub blockchain: BlockchainConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

/// Build the configuration from typed defaults, an optional JSON file
/// (`--config <FILE>`, else `./config.json` if present) and `AVS_NODE_*`
/// environment overrides, in that precedence order.
pub fn initialize_configuration() -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("logger.level", defaults::DEFAULT_LOG_LEVEL)?
        .set_default("logger.format", "pretty")?
        .set_default("metrics.enabled", false)?
        .set_default("metrics.port", defaults::DEFAULT_METRICS_PORT)?
        .set_default("managers.blockchain.chain_id", defaults::DEFAULT_CHAIN_ID)?
        .set_default(
            "managers.blockchain.rpc_endpoint",
            defaults::DEFAULT_RPC_ENDPOINT,
        )?
        .set_default(
            "managers.blockchain.ws_endpoint",
            defaults::DEFAULT_WS_ENDPOINT,
        )?
        .set_default("managers.blockchain.launchpad_address", "")?
        .set_default("managers.blockchain.operational_wallet_private_key", "")?
        .set_default(
            "managers.blockchain.tx_confirmations",
            defaults::DEFAULT_TX_CONFIRMATIONS,
        )?
        .set_default(
            "managers.blockchain.tx_receipt_timeout_secs",
            defaults::DEFAULT_TX_RECEIPT_TIMEOUT_SECS,
        )?;

    // Parse CLI arguments for a custom config file
    let matches = clap::Command::new("launchpad-avs-node")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file"),
        )
        .get_matches();

    if let Some(config_path) = matches.get_one::<String>("config") {
        builder = builder.add_source(File::with_name(config_path));
    } else if std::path::Path::new("config.json").exists() {
        builder = builder.add_source(File::with_name("config.json"));
    }

    // Environment overrides, e.g.
    // AVS_NODE_MANAGERS__BLOCKCHAIN__OPERATIONAL_WALLET_PRIVATE_KEY
    builder = builder.add_source(Environment::with_prefix("AVS_NODE").separator("__"));

    let config = builder.build()?.try_deserialize::<Config>()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let blockchain = &config.managers.blockchain;

    if blockchain.launchpad_address.is_empty() {
        return Err(ConfigError::MissingValue(
            "managers.blockchain.launchpad_address",
        ));
    }
    if blockchain.operational_wallet_private_key.is_empty() {
        return Err(ConfigError::MissingValue(
            "managers.blockchain.operational_wallet_private_key",
        ));
    }

    Ok(())
}
