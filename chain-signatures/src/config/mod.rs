//! Configuration Management Module
//!
//! Loads and validates configuration for the chain-signature subsystem:
//! the MPC signer endpoint and retry budget, the custody identity the
//! per-chain addresses are derived from, and the table of supported chains.

use serde::{Deserialize, Serialize};

use crate::intent::{SignatureScheme, VNormalization};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Chain family, selecting the transaction codec and address rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// EVM-compatible chain (Ethereum, Sepolia, L2s)
    Evm,
    /// Bitcoin-family UTXO chain
    Bitcoin,
    /// Solana chain
    Solana,
    /// NEAR chain (implicit accounts from ed25519 keys)
    Near,
}

impl ChainFamily {
    /// Signature scheme the family requires.
    pub fn scheme(&self) -> SignatureScheme {
        match self {
            ChainFamily::Evm | ChainFamily::Bitcoin => SignatureScheme::Secp256k1,
            ChainFamily::Solana | ChainFamily::Near => SignatureScheme::Ed25519,
        }
    }
}

/// One supported destination chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Unique chain identifier
    pub chain_id: u64,
    /// Human-readable name for the chain
    pub name: String,
    /// Chain family (codec selection)
    pub family: ChainFamily,
    /// MPC key domain for this chain's scheme
    pub domain_id: u64,
    /// Recovery-byte normalization rule (EVM chains only)
    #[serde(default)]
    pub v_normalization: Option<VNormalization>,
}

/// Custody identity that per-chain addresses are derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyConfig {
    /// Identifier mixed into every derivation (the custody account name)
    pub custody_id: String,
    /// secp256k1 root public key, SEC1 hex (compressed or uncompressed)
    pub root_public_key_sec1_hex: String,
    /// ed25519 root public key, 32 bytes hex
    pub ed25519_root_hex: String,
}

/// MPC signer connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpcConfig {
    /// Base URL of the MPC signing service
    pub endpoint: String,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Retry budget (attempts, including the first)
    pub max_attempts: u32,
    /// Base backoff between attempts in milliseconds (doubled per attempt)
    pub retry_backoff_ms: u64,
}

/// Main configuration structure for the chain-signature subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSignaturesConfig {
    /// MPC signer connection settings
    pub mpc: MpcConfig,
    /// Custody identity for address derivation
    pub custody: CustodyConfig,
    /// Supported chains
    pub chains: Vec<ChainEntry>,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl ChainSignaturesConfig {
    /// Validates the configuration.
    ///
    /// Rejects duplicate chain ids and EVM entries without a v-normalization
    /// rule (the rule is deliberately per-chain configuration, never a
    /// hard-coded default, so an entry missing it is a configuration error).
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, entry) in self.chains.iter().enumerate() {
            for other in &self.chains[i + 1..] {
                if entry.chain_id == other.chain_id {
                    return Err(anyhow::anyhow!(
                        "Configuration error: duplicate chain ID {}. Each chain must have a unique chain ID.",
                        entry.chain_id
                    ));
                }
            }
            if entry.family == ChainFamily::Evm && entry.v_normalization.is_none() {
                return Err(anyhow::anyhow!(
                    "Configuration error: EVM chain {} has no v_normalization rule",
                    entry.chain_id
                ));
            }
            if entry.family != ChainFamily::Evm && entry.v_normalization.is_some() {
                return Err(anyhow::anyhow!(
                    "Configuration error: chain {} is not EVM but sets v_normalization",
                    entry.chain_id
                ));
            }
        }
        if self.mpc.max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: mpc.max_attempts must be at least 1"
            ));
        }
        Ok(())
    }

    /// Looks up a chain entry by id.
    pub fn chain(&self, chain_id: u64) -> Option<&ChainEntry> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// Loads configuration from the TOML file.
    ///
    /// The path defaults to `config/chain-signatures.toml` and can be
    /// overridden through `CHAIN_SIGNATURES_CONFIG_PATH` (used by tests).
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("CHAIN_SIGNATURES_CONFIG_PATH")
            .unwrap_or_else(|_| "config/chain-signatures.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: ChainSignaturesConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/chain-signatures.template.toml config/chain-signatures.toml\n\
                Then edit it with your MPC endpoint and custody keys.",
                config_path
            ))
        }
    }

    /// Creates a default configuration for local development and testing.
    ///
    /// The custody keys are well-known test vectors (the secp256k1 generator
    /// point and an all-ones ed25519 key); production deployments must
    /// replace them.
    pub fn default() -> Self {
        Self {
            mpc: MpcConfig {
                endpoint: "http://127.0.0.1:3030".to_string(),
                timeout_ms: 30_000,
                max_attempts: 3,
                retry_backoff_ms: 500,
            },
            custody: CustodyConfig {
                custody_id: "swap-custody.test".to_string(),
                // secp256k1 generator point, compressed
                root_public_key_sec1_hex:
                    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
                        .to_string(),
                ed25519_root_hex:
                    "0101010101010101010101010101010101010101010101010101010101010101"
                        .to_string(),
            },
            chains: vec![
                ChainEntry {
                    chain_id: 11155111,
                    name: "Ethereum Sepolia".to_string(),
                    family: ChainFamily::Evm,
                    domain_id: 0,
                    v_normalization: Some(VNormalization::Eip155),
                },
                ChainEntry {
                    chain_id: 1001,
                    name: "Bitcoin Testnet".to_string(),
                    family: ChainFamily::Bitcoin,
                    domain_id: 0,
                    v_normalization: None,
                },
                ChainEntry {
                    chain_id: 901,
                    name: "Solana Devnet".to_string(),
                    family: ChainFamily::Solana,
                    domain_id: 1,
                    v_normalization: None,
                },
                ChainEntry {
                    chain_id: 397,
                    name: "NEAR Testnet".to_string(),
                    family: ChainFamily::Near,
                    domain_id: 1,
                    v_normalization: None,
                },
            ],
        }
    }
}
