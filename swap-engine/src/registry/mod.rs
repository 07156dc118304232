//! Destination-chain adapter registry.
//!
//! All chain-specific knowledge (address formats, parameter rules, deposit
//! floors, cost models) lives behind the `ChainAdapter` trait; the engine
//! only ever talks to the registry. Adapters are re-resolved by chain id at
//! each use and the handle is cloned out of the map, so no registry lock is
//! ever held across an await.

pub mod adapters;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::{ChainFamily, EngineConfig};
use crate::error::SwapError;

// ============================================================================
// ADAPTER CONTRACT
// ============================================================================

/// Static description of a destination chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_id: u64,
    pub name: String,
    pub family: ChainFamily,
    /// Inactive adapters must never be registered
    pub active: bool,
}

/// Destination-side order parameters an adapter validates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderParams {
    pub destination_address: String,
    pub destination_token: String,
    pub source_amount: u128,
    pub resolver_fee: u128,
}

/// Outcome of adapter-side parameter validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }

    pub fn failed(issues: Vec<String>) -> Self {
        Self {
            valid: false,
            issues,
        }
    }
}

/// Chain-specific behavior behind the registry.
pub trait ChainAdapter: Send + Sync + std::fmt::Debug {
    /// Static chain description.
    fn chain_info(&self) -> ChainInfo;

    /// Whether the address is well-formed for this chain.
    fn validate_address(&self, address: &str) -> bool;

    /// Chain-specific order parameter validation.
    fn validate_params(&self, params: &OrderParams) -> ValidationResult;

    /// Minimum resolver safety deposit for an order of this size.
    fn min_safety_deposit(&self, amount: u128) -> u128;

    /// Estimated destination-leg execution cost in the chain's native unit.
    fn estimate_execution_cost(&self, params: &OrderParams, amount: u128) -> u128;

    /// Whether the chain supports a named capability.
    fn supports_feature(&self, feature: &str) -> bool;
}

// ============================================================================
// REGISTRY IMPLEMENTATION
// ============================================================================

/// Registry of destination-chain adapters, keyed by chain id.
pub struct AdapterRegistry {
    owner: String,
    adapters: RwLock<HashMap<u64, Arc<dyn ChainAdapter>>>,
}

impl AdapterRegistry {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            adapters: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a registry seeded with one adapter per active configured chain.
    pub async fn from_config(config: &EngineConfig) -> Result<Self, SwapError> {
        let registry = Self::new(&config.owner);
        for entry in config.chains.iter().filter(|c| c.active) {
            let bps = config.deposit_bps_for(entry);
            let adapter = adapters::for_family(entry.family, entry.chain_id, &entry.name, bps);
            registry.register(entry.chain_id, adapter).await?;
        }
        Ok(registry)
    }

    /// Registers an adapter for a chain.
    ///
    /// Registration errors are fatal: an adapter reporting a different chain
    /// id than it is registered under, or an inactive adapter, aborts the
    /// registration instead of degrading silently.
    pub async fn register(
        &self,
        chain_id: u64,
        adapter: Arc<dyn ChainAdapter>,
    ) -> Result<(), SwapError> {
        let info = adapter.chain_info();
        if info.chain_id != chain_id {
            return Err(SwapError::AdapterChainMismatch {
                expected: chain_id,
                actual: info.chain_id,
            });
        }
        if !info.active {
            return Err(SwapError::AdapterInactive { chain_id });
        }

        let mut adapters = self.adapters.write().await;
        if adapters.contains_key(&chain_id) {
            return Err(SwapError::ChainAlreadyRegistered { chain_id });
        }
        adapters.insert(chain_id, adapter);
        info!(chain_id, name = %info.name, "Registered destination chain adapter");
        Ok(())
    }

    /// Replaces the adapter for a registered chain. Owner-only.
    pub async fn update(
        &self,
        caller: &str,
        chain_id: u64,
        adapter: Arc<dyn ChainAdapter>,
    ) -> Result<(), SwapError> {
        self.require_owner(caller)?;
        let info = adapter.chain_info();
        if info.chain_id != chain_id {
            return Err(SwapError::AdapterChainMismatch {
                expected: chain_id,
                actual: info.chain_id,
            });
        }
        if !info.active {
            return Err(SwapError::AdapterInactive { chain_id });
        }

        let mut adapters = self.adapters.write().await;
        if !adapters.contains_key(&chain_id) {
            return Err(SwapError::ChainNotSupported { chain_id });
        }
        adapters.insert(chain_id, adapter);
        info!(chain_id, "Updated destination chain adapter");
        Ok(())
    }

    /// Removes the adapter for a chain. Owner-only.
    pub async fn remove(&self, caller: &str, chain_id: u64) -> Result<(), SwapError> {
        self.require_owner(caller)?;
        let mut adapters = self.adapters.write().await;
        adapters
            .remove(&chain_id)
            .map(|_| info!(chain_id, "Removed destination chain adapter"))
            .ok_or(SwapError::ChainNotSupported { chain_id })
    }

    /// Resolves the adapter for a chain. The handle is cloned out of the map,
    /// so the registry lock is released before the caller uses it.
    pub async fn get(&self, chain_id: u64) -> Result<Arc<dyn ChainAdapter>, SwapError> {
        self.adapters
            .read()
            .await
            .get(&chain_id)
            .cloned()
            .ok_or(SwapError::ChainNotSupported { chain_id })
    }

    /// Lists the registered chains.
    pub async fn supported_chains(&self) -> Vec<ChainInfo> {
        self.adapters
            .read()
            .await
            .values()
            .map(|a| a.chain_info())
            .collect()
    }

    // Delegating helpers so the engine never encodes chain-specific logic.

    pub async fn validate_destination_address(
        &self,
        chain_id: u64,
        address: &str,
    ) -> Result<bool, SwapError> {
        Ok(self.get(chain_id).await?.validate_address(address))
    }

    pub async fn validate_order_params(
        &self,
        chain_id: u64,
        params: &OrderParams,
    ) -> Result<ValidationResult, SwapError> {
        Ok(self.get(chain_id).await?.validate_params(params))
    }

    pub async fn calculate_min_safety_deposit(
        &self,
        chain_id: u64,
        amount: u128,
    ) -> Result<u128, SwapError> {
        Ok(self.get(chain_id).await?.min_safety_deposit(amount))
    }

    pub async fn estimate_execution_cost(
        &self,
        chain_id: u64,
        params: &OrderParams,
        amount: u128,
    ) -> Result<u128, SwapError> {
        Ok(self
            .get(chain_id)
            .await?
            .estimate_execution_cost(params, amount))
    }

    fn require_owner(&self, caller: &str) -> Result<(), SwapError> {
        if caller != self.owner {
            return Err(SwapError::NotRegistryOwner {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }
}
