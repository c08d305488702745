pub mod config;
pub mod error;
pub mod handlers;
mod logger;
pub mod managers;
mod observability;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal::unix::{SignalKind, signal};

use crate::{
    config::Config,
    error::NodeError,
    handlers::PendingRequestHandler,
    managers::blockchain::{
        Address, BlockchainError, EventListener, ListenerConfig, Responder, WsTransport,
    },
};

pub async fn run() {
    // Install rustls crypto provider before any TLS connections
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    let config = match config::initialize_configuration() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load configuration: {error}");
            return;
        }
    };

    logger::initialize(&config.logger);
    display_banner();

    // Initialize Prometheus metrics exporter if enabled
    if config.metrics.enabled {
        let metrics_port = config.metrics.port;
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], metrics_port))
            .install()
            .expect("Failed to install Prometheus metrics exporter");
        tracing::info!("Metrics endpoint enabled on port {}", metrics_port);
    }

    if let Err(error) = serve(&config).await {
        tracing::error!(error = %error, "Node terminated with error");
    }
}

async fn serve(config: &Config) -> Result<(), NodeError> {
    let blockchain_config = &config.managers.blockchain;

    let launchpad_address: Address =
        blockchain_config
            .launchpad_address
            .parse()
            .map_err(|_| BlockchainError::InvalidAddress {
                address: blockchain_config.launchpad_address.clone(),
            })?;

    let responder = Arc::new(Responder::new(blockchain_config)?);
    responder.verify_connectivity().await?;

    // Surface a misconfigured key immediately instead of at first spend.
    if responder.is_authorized().await {
        tracing::info!(
            signer = %responder.signer_address(),
            "Signer is the contract's authorized responder"
        );
    } else {
        tracing::warn!(
            signer = %responder.signer_address(),
            "Signer is NOT the authorized responder; requests will be observed but cannot be answered"
        );
    }

    let transport = Arc::new(WsTransport::new(
        blockchain_config.ws_endpoint.clone(),
        launchpad_address,
    ));
    let listener = EventListener::new(transport, ListenerConfig::default());
    let handler = Arc::new(PendingRequestHandler::new(Arc::clone(&responder)));

    listener.start(handler).await?;

    tracing::info!(
        chain_id = blockchain_config.chain_id,
        launchpad = %launchpad_address,
        "Listening for action requests"
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT; shutting down");
            Ok(())
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM; shutting down");
            Ok(())
        }
        result = listener.join() => result.map_err(NodeError::from),
    };

    listener.stop().await;
    result
}

fn display_banner() {
    tracing::info!("======================================================");
    tracing::info!(
        "          Launchpad AVS Node v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("======================================================");
}
