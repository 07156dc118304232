//! Chain Signatures Library
//!
//! MPC-backed signing for destination-chain transactions: abstract intents,
//! per-chain transaction codecs, deterministic address derivation, and a
//! request manager with retries and rolling statistics.

pub mod codec;
pub mod config;
pub mod derivation;
pub mod error;
pub mod intent;
pub mod manager;
pub mod mpc;

// Re-export commonly used types
pub use codec::{ReconstructOptions, SigningPayload};
pub use config::{ChainEntry, ChainFamily, ChainSignaturesConfig, CustodyConfig, MpcConfig};
pub use derivation::{derive_address, DerivedAddress};
pub use error::SignatureError;
pub use intent::{
    BitcoinInput, BitcoinOutput, SignatureScheme, SolanaAccountMeta, SolanaInstruction,
    TransactionIntent, VNormalization,
};
pub use manager::{SignatureManager, SignatureResponse, SigningStatsSnapshot};
pub use mpc::{MpcClient, MpcOutcome, MpcSignRequest, MpcSignResponse};
