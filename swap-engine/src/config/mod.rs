//! Configuration Management Module
//!
//! Loads and validates configuration for the swap engine: the owner account,
//! the safety-deposit floor, the authorized-resolver list, and the table of
//! destination chains used to seed the adapter registry.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Destination chain family, selecting the adapter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// EVM-compatible chain (Ethereum, Sepolia, L2s)
    Evm,
    /// NEAR chain (named and implicit accounts)
    Near,
    /// Solana chain
    Solana,
    /// Bitcoin-family UTXO chain
    Bitcoin,
    /// Cosmos SDK chain (bech32 addresses)
    Cosmos,
}

/// One destination chain the engine accepts orders for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineChainEntry {
    /// Unique chain identifier
    pub chain_id: u64,
    /// Human-readable name for the chain
    pub name: String,
    /// Chain family (adapter selection)
    pub family: ChainFamily,
    /// Inactive chains are skipped when seeding the registry
    #[serde(default = "default_active")]
    pub active: bool,
    /// Per-chain safety-deposit floor override in basis points
    #[serde(default)]
    pub min_safety_deposit_bps: Option<u32>,
}

fn default_active() -> bool {
    true
}

/// Main configuration structure for the swap engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Owner account allowed to manage resolvers and registry entries
    pub owner: String,
    /// Default safety-deposit floor in basis points of the source amount
    pub min_safety_deposit_bps: u32,
    /// Resolver accounts allowed to match orders
    pub authorized_resolvers: Vec<String>,
    /// Destination chains
    pub chains: Vec<EngineChainEntry>,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl EngineConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_safety_deposit_bps == 0 || self.min_safety_deposit_bps > 10_000 {
            return Err(anyhow::anyhow!(
                "Configuration error: min_safety_deposit_bps must be within 1..=10000, got {}",
                self.min_safety_deposit_bps
            ));
        }
        if self.owner.is_empty() {
            return Err(anyhow::anyhow!("Configuration error: owner must be set"));
        }
        for (i, entry) in self.chains.iter().enumerate() {
            for other in &self.chains[i + 1..] {
                if entry.chain_id == other.chain_id {
                    return Err(anyhow::anyhow!(
                        "Configuration error: duplicate chain ID {}. Each chain must have a unique chain ID.",
                        entry.chain_id
                    ));
                }
            }
            if let Some(bps) = entry.min_safety_deposit_bps {
                if bps == 0 || bps > 10_000 {
                    return Err(anyhow::anyhow!(
                        "Configuration error: chain {} min_safety_deposit_bps must be within 1..=10000, got {}",
                        entry.chain_id,
                        bps
                    ));
                }
            }
        }
        Ok(())
    }

    /// Safety-deposit floor for a chain, falling back to the engine default.
    pub fn deposit_bps_for(&self, entry: &EngineChainEntry) -> u32 {
        entry
            .min_safety_deposit_bps
            .unwrap_or(self.min_safety_deposit_bps)
    }

    /// Loads configuration from the TOML file.
    ///
    /// The path defaults to `config/swap-engine.toml` and can be overridden
    /// through `SWAP_ENGINE_CONFIG_PATH` (used by tests).
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("SWAP_ENGINE_CONFIG_PATH")
            .unwrap_or_else(|_| "config/swap-engine.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EngineConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/swap-engine.template.toml config/swap-engine.toml\n\
                Then edit it with your owner account and chain table.",
                config_path
            ))
        }
    }

    /// Creates a default configuration for local development and testing.
    pub fn default() -> Self {
        Self {
            owner: "swap-owner.test".to_string(),
            min_safety_deposit_bps: 500,
            authorized_resolvers: vec!["resolver-1.test".to_string()],
            chains: vec![
                EngineChainEntry {
                    chain_id: 11155111,
                    name: "Ethereum Sepolia".to_string(),
                    family: ChainFamily::Evm,
                    active: true,
                    min_safety_deposit_bps: None,
                },
                EngineChainEntry {
                    chain_id: 397,
                    name: "NEAR Testnet".to_string(),
                    family: ChainFamily::Near,
                    active: true,
                    min_safety_deposit_bps: None,
                },
                EngineChainEntry {
                    chain_id: 901,
                    name: "Solana Devnet".to_string(),
                    family: ChainFamily::Solana,
                    active: true,
                    min_safety_deposit_bps: None,
                },
                EngineChainEntry {
                    chain_id: 1001,
                    name: "Bitcoin Testnet".to_string(),
                    family: ChainFamily::Bitcoin,
                    active: true,
                    min_safety_deposit_bps: None,
                },
                EngineChainEntry {
                    chain_id: 118,
                    name: "Cosmos Hub Testnet".to_string(),
                    family: ChainFamily::Cosmos,
                    active: true,
                    min_safety_deposit_bps: None,
                },
            ],
        }
    }
}
