//! Error types for the chain-signature subsystem.
//!
//! The taxonomy separates input validation failures (never retried) from
//! remote/transient failures (retried within a bounded budget, then surfaced
//! with the timeout/rejection distinction preserved).

use thiserror::Error;

use crate::intent::SignatureScheme;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Unsupported chain: {chain_id}")]
    UnsupportedChain { chain_id: u64 },

    #[error("Signature scheme mismatch for chain {chain_id}: chain expects {expected:?}, intent requires {actual:?}")]
    SchemeMismatch {
        chain_id: u64,
        expected: SignatureScheme,
        actual: SignatureScheme,
    },

    #[error("Invalid signature length: expected {expected} bytes, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    #[error("Invalid transaction intent: {reason}")]
    InvalidIntent { reason: String },

    #[error("MPC call failed for request {request_id}: {source}")]
    MpcCallFailed {
        request_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("MPC service rejected request {request_id}: {reason}")]
    MpcRejected { request_id: String, reason: String },

    #[error("Signature request {request_id} timed out after {timeout_ms}ms ({attempts} attempts)")]
    SignatureTimeout {
        request_id: String,
        timeout_ms: u64,
        attempts: u32,
    },

    #[error("Signature request {request_id} was abandoned before its response arrived")]
    RequestAbandoned { request_id: String },

    #[error("Invalid custody configuration: {reason}")]
    InvalidCustodyKey { reason: String },
}

impl SignatureError {
    /// Whether the error is transient and eligible for a retry with a fresh
    /// request id. Input validation and state errors are deterministic
    /// rejections and must never be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SignatureError::MpcCallFailed { .. } | SignatureError::SignatureTimeout { .. }
        )
    }
}
