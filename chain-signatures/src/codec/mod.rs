//! Chain Transaction Codec
//!
//! Per chain family, two pure functions: `signing_payload` turns an abstract
//! intent into the exact bytes the MPC signer must sign, and `reconstruct`
//! attaches a raw signature to produce a broadcastable transaction. Both are
//! deterministic: identical intents always yield identical bytes, which is
//! what makes the MPC signer stateless and retried requests idempotent.

pub mod bitcoin;
pub mod evm;
pub mod solana;

use serde::{Deserialize, Serialize};

use crate::error::SignatureError;
use crate::intent::{SignatureScheme, TransactionIntent, VNormalization};

/// Payload produced for a signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    /// 32-byte digest forwarded to the MPC signer
    pub hash: [u8; 32],
    /// Full pre-image the digest was computed over (the sighash pre-image for
    /// Bitcoin, the encoded message for Solana, the RLP tuple for EVM)
    pub preimage: Vec<u8>,
    /// Scheme the signer must use
    pub scheme: SignatureScheme,
}

/// Context required to rebuild a signed transaction that the intent alone
/// does not carry.
#[derive(Debug, Clone, Default)]
pub struct ReconstructOptions {
    /// EVM recovery-byte normalization rule for the target chain
    pub v_normalization: Option<VNormalization>,
    /// Compressed SEC1 public key of the signer (required for Bitcoin
    /// scriptSig assembly)
    pub public_key: Option<Vec<u8>>,
}

/// Computes the chain-native signing payload for an intent.
pub fn signing_payload(intent: &TransactionIntent) -> Result<SigningPayload, SignatureError> {
    match intent {
        TransactionIntent::Evm { .. } => evm::signing_payload(intent),
        TransactionIntent::Bitcoin { .. } => bitcoin::signing_payload(intent),
        TransactionIntent::Solana { .. } => solana::signing_payload(intent),
    }
}

/// Rebuilds a broadcastable signed transaction from an intent and the raw
/// signature returned by the MPC signer.
///
/// Fails with `InvalidSignatureLength` when the signature does not have the
/// exact length the chain family requires; never truncates.
pub fn reconstruct(
    intent: &TransactionIntent,
    signature: &[u8],
    options: &ReconstructOptions,
) -> Result<Vec<u8>, SignatureError> {
    let expected = intent.expected_signature_len();
    if signature.len() != expected {
        return Err(SignatureError::InvalidSignatureLength {
            expected,
            actual: signature.len(),
        });
    }
    match intent {
        TransactionIntent::Evm { .. } => evm::reconstruct(intent, signature, options),
        TransactionIntent::Bitcoin { .. } => bitcoin::reconstruct(intent, signature, options),
        TransactionIntent::Solana { .. } => solana::reconstruct(intent, signature),
    }
}
