use alloy::signers::local::{LocalSignerError, PrivateKeySigner};

use super::error::BlockchainError;

/// Parse the configured operational private key into a local signer.
/// The signer's address is the identity that must match the contract's
/// authorized responder before any response transaction is sent.
pub(crate) fn signer_from_private_key(
    private_key: &str,
) -> Result<PrivateKeySigner, BlockchainError> {
    private_key
        .parse()
        .map_err(|e: LocalSignerError| BlockchainError::InvalidPrivateKey {
            key_length: private_key.len(),
            source: e,
        })
}
