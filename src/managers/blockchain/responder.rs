//! Response-transaction submission for pending action requests.
//!
//! The responder owns its own JSON-RPC connection and signing identity,
//! independent of the listener's streaming transport. Every respond
//! operation validates its input before any network round-trip, re-verifies
//! that the signer is the contract's current authorized responder, then
//! runs the estimate → buffer → submit → await-receipt pipeline.

use std::{str::FromStr, time::Duration};

use alloy::{
    contract::{CallBuilder, CallDecoder},
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256, Bytes, U256, hex},
    rpc::types::TransactionReceipt,
};

use super::{
    config::BlockchainConfig,
    contracts::AgentLaunchpad,
    error::BlockchainError,
    gas::apply_gas_buffer,
    provider::{self, BlockchainProvider, initialize_rpc_provider},
    wallets::signer_from_private_key,
};
use crate::observability;

/// Call payload for an action response, in whichever form the caller holds
/// it. Hex payloads must carry the `0x` prefix; plain text is sent as its
/// UTF-8 bytes.
#[derive(Debug, Clone)]
pub enum ActionPayload {
    Hex(String),
    Text(String),
    Raw(Vec<u8>),
}

impl ActionPayload {
    fn into_bytes(self) -> Result<Bytes, BlockchainError> {
        match self {
            ActionPayload::Hex(payload) => {
                let digits = payload.strip_prefix("0x").ok_or_else(|| {
                    BlockchainError::InvalidCallData {
                        reason: format!("hex payload missing 0x prefix: '{}'", payload),
                    }
                })?;
                let bytes =
                    hex::decode(digits).map_err(|e| BlockchainError::InvalidCallData {
                        reason: e.to_string(),
                    })?;
                Ok(Bytes::from(bytes))
            }
            ActionPayload::Text(text) => Ok(Bytes::from(text.into_bytes())),
            ActionPayload::Raw(bytes) => Ok(Bytes::from(bytes)),
        }
    }
}

/// Native value attached to an action response; decimal or 0x-prefixed
/// strings are accepted alongside plain integers.
#[derive(Debug, Clone)]
pub enum ValueArg {
    Text(String),
    Wei(u128),
}

impl ValueArg {
    fn into_wei(self) -> Result<U256, BlockchainError> {
        match self {
            ValueArg::Text(value) => match U256::from_str(&value) {
                Ok(wei) => Ok(wei),
                Err(_) => Err(BlockchainError::InvalidValue { value }),
            },
            ValueArg::Wei(wei) => Ok(U256::from(wei)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub hash: String,
    pub to: String,
    pub data: ActionPayload,
    pub value: Option<ValueArg>,
}

#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    pub hash: String,
    pub memory: String,
}

/// Outcome of a submitted response transaction; ephemeral, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub status: Option<bool>,
}

impl TransactionResult {
    fn from_receipt(receipt: &TransactionReceipt) -> Self {
        Self {
            hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: Some(receipt.gas_used),
            status: Some(receipt.status()),
        }
    }
}

/// On-chain request record, returned untranslated: `status` and `action_id`
/// keep their raw contract values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub agent: Address,
    pub status: u8,
    pub action_id: u8,
}

impl RequestRecord {
    pub const STATUS_UNREGISTERED: u8 = 0;
    pub const STATUS_PENDING: u8 = 1;
    pub const STATUS_COMPLETED: u8 = 2;

    pub const ACTION_KIND_ACTION: u8 = 0;
    pub const ACTION_KIND_UPGRADE: u8 = 1;

    /// A zero agent address is the chain's convention for "no such entry".
    pub fn from_raw(agent: Address, status: u8, action_id: u8) -> Option<Self> {
        if agent.is_zero() {
            return None;
        }

        Some(Self {
            agent,
            status,
            action_id,
        })
    }
}

pub struct Responder {
    contract: AgentLaunchpad::AgentLaunchpadInstance<BlockchainProvider>,
    signer_address: Address,
    tx_confirmations: u64,
    tx_receipt_timeout: Duration,
}

impl Responder {
    /// Construction is purely local (key parsing, address parsing, provider
    /// wiring); call [`verify_connectivity`](Self::verify_connectivity) at
    /// bootstrap to catch a dead endpoint before the first spend.
    pub fn new(config: &BlockchainConfig) -> Result<Self, BlockchainError> {
        let signer = signer_from_private_key(&config.operational_wallet_private_key)?;
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let launchpad_address = config.launchpad_address.parse::<Address>().map_err(|_| {
            BlockchainError::InvalidAddress {
                address: config.launchpad_address.clone(),
            }
        })?;

        let provider = initialize_rpc_provider(&config.rpc_endpoint, wallet)?;

        Ok(Self {
            contract: AgentLaunchpad::new(launchpad_address, provider),
            signer_address,
            tx_confirmations: config.tx_confirmations,
            tx_receipt_timeout: config.tx_receipt_timeout(),
        })
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    pub async fn verify_connectivity(&self) -> Result<u64, BlockchainError> {
        let block = provider::verify_connectivity(self.contract.provider()).await?;
        tracing::info!(
            block,
            signer = %self.signer_address,
            launchpad = %self.contract.address(),
            "Responder provider connected"
        );
        Ok(block)
    }

    /// Whether the configured signer is the contract's current authorized
    /// responder. Returns `false`, not an error, when the read fails; this
    /// is the advisory pre-check, meant for gating before spending gas.
    pub async fn is_authorized(&self) -> bool {
        match self.get_avs_address().await {
            Ok(avs) => avs == self.signer_address,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Failed to read authorized responder address; treating signer as unauthorized"
                );
                false
            }
        }
    }

    /// Raw passthrough read of the contract's authority field; errors
    /// propagate since callers use this to gate spending.
    pub async fn get_avs_address(&self) -> Result<Address, BlockchainError> {
        Ok(self.contract.avs().call().await?)
    }

    /// Read the request mapping; `None` when the agent is the zero address.
    pub async fn get_request(&self, hash: B256) -> Result<Option<RequestRecord>, BlockchainError> {
        let raw = self.contract.requests(hash).call().await?;
        Ok(RequestRecord::from_raw(raw.agent, raw.status, raw.actionId))
    }

    /// Answer a pending request by executing an arbitrary call through the
    /// launchpad contract.
    pub async fn respond_with_action(
        &self,
        request: ActionRequest,
    ) -> Result<TransactionResult, BlockchainError> {
        let hash = parse_request_hash(&request.hash)?;
        let to = request
            .to
            .parse::<Address>()
            .map_err(|_| BlockchainError::InvalidAddress {
                address: request.to.clone(),
            })?;
        let data = request.data.into_bytes()?;
        let value = match request.value {
            Some(value) => value.into_wei()?,
            None => U256::ZERO,
        };

        self.ensure_authorized().await?;

        let call = self.contract.respondWithAction(hash, to, data, value);
        self.submit("respondWithAction", call).await
    }

    /// Answer a pending request by storing a memory string against it.
    pub async fn respond_with_upgrade(
        &self,
        request: UpgradeRequest,
    ) -> Result<TransactionResult, BlockchainError> {
        let hash = parse_request_hash(&request.hash)?;

        self.ensure_authorized().await?;

        let call = self.contract.respondWithUpgrade(hash, request.memory);
        self.submit("respondWithUpgrade", call).await
    }

    /// Re-verify the authorization invariant before spending gas. Unlike
    /// [`is_authorized`](Self::is_authorized), a failed `avs()` read is
    /// reported as the read error it is, not as "not authorized".
    async fn ensure_authorized(&self) -> Result<(), BlockchainError> {
        let avs = self.get_avs_address().await?;
        if avs != self.signer_address {
            return Err(BlockchainError::NotAuthorized {
                signer: self.signer_address,
                avs,
            });
        }
        Ok(())
    }

    /// Estimate → buffer → submit → await one confirmation.
    async fn submit<'a, D: CallDecoder>(
        &self,
        function: &'static str,
        call: CallBuilder<&'a BlockchainProvider, D, Ethereum>,
    ) -> Result<TransactionResult, BlockchainError> {
        let started = std::time::Instant::now();

        let estimate =
            call.estimate_gas()
                .await
                .map_err(|source| BlockchainError::GasEstimation { function, source })?;
        let gas_limit = apply_gas_buffer(estimate);

        tracing::debug!(function, estimate, gas_limit, "Estimated response gas");

        let pending = call
            .gas(gas_limit)
            .send()
            .await
            .map_err(|source| BlockchainError::Submission { function, source })?;

        let receipt = pending
            .with_required_confirmations(self.tx_confirmations)
            .with_timeout(Some(self.tx_receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| BlockchainError::ReceiptFailed {
                reason: e.to_string(),
            })?;

        let status = receipt.status();
        observability::record_response_transaction(
            function,
            if status { "confirmed" } else { "reverted" },
            started.elapsed(),
        );
        tracing::info!(
            function,
            tx = %receipt.transaction_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            status,
            "Response transaction confirmed"
        );

        Ok(TransactionResult::from_receipt(&receipt))
    }
}

/// A request hash must be exactly a 0x-prefixed 32-byte hex string
/// (66 characters in total).
fn parse_request_hash(hash: &str) -> Result<B256, BlockchainError> {
    if hash.len() != 66 || !hash.starts_with("0x") {
        return Err(BlockchainError::InvalidRequestHash {
            hash: hash.to_string(),
        });
    }

    hash.parse::<B256>()
        .map_err(|_| BlockchainError::InvalidRequestHash {
            hash: hash.to_string(),
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const VALID_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    /// Well-known development key; never funded on any real network.
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_responder() -> Responder {
        // Unroutable endpoint: any test that reaches the network fails fast
        // with a transport error instead of a validation error.
        let config = BlockchainConfig {
            chain_id: 56,
            rpc_endpoint: "http://127.0.0.1:9".to_string(),
            ws_endpoint: "ws://127.0.0.1:9".to_string(),
            launchpad_address: "0x4444444444444444444444444444444444444444".to_string(),
            operational_wallet_private_key: TEST_PRIVATE_KEY.to_string(),
            tx_confirmations: 1,
            tx_receipt_timeout_secs: 300,
        };
        Responder::new(&config).unwrap()
    }

    fn action_request(hash: &str, to: &str) -> ActionRequest {
        ActionRequest {
            hash: hash.to_string(),
            to: to.to_string(),
            data: ActionPayload::Hex("0xdeadbeef".to_string()),
            value: None,
        }
    }

    #[test]
    fn test_request_hash_validation() {
        assert!(parse_request_hash(VALID_HASH).is_ok());

        for bad in [
            "",
            "0x1111",
            // 64 hex chars but no prefix
            "1111111111111111111111111111111111111111111111111111111111111111",
            // correct length, invalid hex
            "0xzz11111111111111111111111111111111111111111111111111111111111111",
        ] {
            assert!(matches!(
                parse_request_hash(bad),
                Err(BlockchainError::InvalidRequestHash { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_respond_with_action_rejects_bad_hash_before_any_network_call() {
        let responder = test_responder();

        let result = responder
            .respond_with_action(action_request(
                "0x1234",
                "0x4444444444444444444444444444444444444444",
            ))
            .await;

        assert!(matches!(
            result,
            Err(BlockchainError::InvalidRequestHash { .. })
        ));
    }

    #[tokio::test]
    async fn test_respond_with_action_rejects_malformed_target_address() {
        let responder = test_responder();

        let result = responder
            .respond_with_action(action_request(VALID_HASH, "not-an-address"))
            .await;

        assert!(matches!(
            result,
            Err(BlockchainError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_respond_with_upgrade_rejects_bad_hash_before_any_network_call() {
        let responder = test_responder();

        let result = responder
            .respond_with_upgrade(UpgradeRequest {
                hash: "0xshort".to_string(),
                memory: "remember this".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(BlockchainError::InvalidRequestHash { .. })
        ));
    }

    #[tokio::test]
    async fn test_is_authorized_is_false_when_the_authority_read_fails() {
        let responder = test_responder();

        assert!(!responder.is_authorized().await);
    }

    #[test]
    fn test_action_payload_coercion() {
        let bytes = ActionPayload::Hex("0xdeadbeef".to_string())
            .into_bytes()
            .unwrap();
        assert_eq!(bytes.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);

        let bytes = ActionPayload::Text("hello".to_string()).into_bytes().unwrap();
        assert_eq!(bytes.as_ref(), b"hello");

        let bytes = ActionPayload::Raw(vec![1, 2, 3]).into_bytes().unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);

        assert!(matches!(
            ActionPayload::Hex("deadbeef".to_string()).into_bytes(),
            Err(BlockchainError::InvalidCallData { .. })
        ));
        assert!(matches!(
            ActionPayload::Hex("0xnothex".to_string()).into_bytes(),
            Err(BlockchainError::InvalidCallData { .. })
        ));
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(
            ValueArg::Text("1000".to_string()).into_wei().unwrap(),
            U256::from(1000u64)
        );
        assert_eq!(
            ValueArg::Text("0x10".to_string()).into_wei().unwrap(),
            U256::from(16u64)
        );
        assert_eq!(ValueArg::Wei(42).into_wei().unwrap(), U256::from(42u64));

        assert!(matches!(
            ValueArg::Text("not a number".to_string()).into_wei(),
            Err(BlockchainError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_request_record_zero_agent_means_absent() {
        assert_eq!(RequestRecord::from_raw(Address::ZERO, 1, 0), None);

        let agent: Address = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            .parse()
            .unwrap();
        let record = RequestRecord::from_raw(agent, 1, 0).unwrap();
        assert_eq!(record.agent, agent);
        assert_eq!(record.status, RequestRecord::STATUS_PENDING);
        assert_eq!(record.action_id, RequestRecord::ACTION_KIND_ACTION);
    }

    #[test]
    fn test_address_comparison_ignores_source_casing() {
        let lower: Address = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            .parse()
            .unwrap();
        let upper: Address = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
            .parse()
            .unwrap();
        assert_eq!(lower, upper);
    }
}
