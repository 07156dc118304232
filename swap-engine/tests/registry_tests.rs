//! Unit tests for the destination-chain adapter registry
//!
//! These tests verify registration invariants, owner gating, and the
//! per-family address and parameter validation behind the registry.

use std::sync::Arc;

use swap_engine::registry::adapters::{
    BitcoinAdapter, CosmosAdapter, EvmAdapter, NearAdapter, SolanaAdapter,
};
use swap_engine::{AdapterRegistry, EngineConfig, OrderParams, SwapError};

const OWNER: &str = "swap-owner.test";

fn params(address: &str, token: &str) -> OrderParams {
    OrderParams {
        destination_address: address.to_string(),
        destination_token: token.to_string(),
        source_amount: 1_000_000,
        resolver_fee: 50_000,
    }
}

/// What is tested: from_config seeds one adapter per active chain
/// Why: The registry is the engine's only view of supported destinations
#[tokio::test]
async fn test_registry_seeded_from_config() {
    let mut config = EngineConfig::default();
    config.chains[1].active = false; // NEAR off

    let registry = AdapterRegistry::from_config(&config).await.expect("seed");
    let chains = registry.supported_chains().await;
    assert_eq!(chains.len(), config.chains.len() - 1);
    assert!(registry.get(11155111).await.is_ok());
    assert!(matches!(
        registry.get(397).await.unwrap_err(),
        SwapError::ChainNotSupported { chain_id: 397 }
    ));
}

/// What is tested: registering over an existing chain fails
/// Why: A silent adapter swap would change validation rules under live
/// orders
#[tokio::test]
async fn test_register_duplicate_rejected() {
    let registry = AdapterRegistry::new(OWNER);
    registry
        .register(1, Arc::new(EvmAdapter::new(1, "Ethereum", 500)))
        .await
        .expect("register");
    assert!(matches!(
        registry
            .register(1, Arc::new(EvmAdapter::new(1, "Ethereum", 500)))
            .await
            .unwrap_err(),
        SwapError::ChainAlreadyRegistered { chain_id: 1 }
    ));
}

/// What is tested: an adapter claiming a different chain id than its
/// registration slot is rejected
/// Why: Registration errors are fatal, never a silent degradation
#[tokio::test]
async fn test_register_chain_mismatch_fatal() {
    let registry = AdapterRegistry::new(OWNER);
    let err = registry
        .register(7, Arc::new(EvmAdapter::new(5, "Ethereum", 500)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwapError::AdapterChainMismatch {
            expected: 7,
            actual: 5
        }
    ));
    assert!(registry.supported_chains().await.is_empty());
}

/// What is tested: update and remove are owner-gated
/// Why: Only the owner may change which chains orders can target
#[tokio::test]
async fn test_update_remove_owner_gated() {
    let registry = AdapterRegistry::new(OWNER);
    registry
        .register(1, Arc::new(EvmAdapter::new(1, "Ethereum", 500)))
        .await
        .expect("register");

    assert!(matches!(
        registry
            .update("rogue.test", 1, Arc::new(EvmAdapter::new(1, "Ethereum", 300)))
            .await
            .unwrap_err(),
        SwapError::NotRegistryOwner { .. }
    ));
    assert!(matches!(
        registry.remove("rogue.test", 1).await.unwrap_err(),
        SwapError::NotRegistryOwner { .. }
    ));

    registry
        .update(OWNER, 1, Arc::new(EvmAdapter::new(1, "Ethereum", 300)))
        .await
        .expect("update");
    assert_eq!(
        registry
            .calculate_min_safety_deposit(1, 1_000_000)
            .await
            .expect("deposit"),
        30_000
    );

    registry.remove(OWNER, 1).await.expect("remove");
    assert!(matches!(
        registry.get(1).await.unwrap_err(),
        SwapError::ChainNotSupported { chain_id: 1 }
    ));
}

/// What is tested: the basis-points deposit floor
/// Why: 500 bps of 1_000_000 must be exactly 50_000; rounding is downward
#[tokio::test]
async fn test_min_safety_deposit_bps() {
    let registry = AdapterRegistry::new(OWNER);
    registry
        .register(1, Arc::new(EvmAdapter::new(1, "Ethereum", 500)))
        .await
        .expect("register");

    assert_eq!(
        registry
            .calculate_min_safety_deposit(1, 1_000_000)
            .await
            .expect("deposit"),
        50_000
    );
    // 500 bps of 199 floors to 9
    assert_eq!(
        registry
            .calculate_min_safety_deposit(1, 199)
            .await
            .expect("deposit"),
        9
    );
    // the floor must not panic at the top of the amount range
    assert_eq!(
        registry
            .calculate_min_safety_deposit(1, u128::MAX)
            .await
            .expect("deposit"),
        u128::MAX / 10_000 * 500 + u128::MAX % 10_000 * 500 / 10_000
    );
}

/// What is tested: address grammars per chain family
/// Why: A malformed destination address makes the order unfulfillable
#[tokio::test]
async fn test_address_validation_per_family() {
    let registry = AdapterRegistry::from_config(&EngineConfig::default())
        .await
        .expect("seed");

    // EVM
    assert!(registry
        .validate_destination_address(11155111, &format!("0x{}", "ab".repeat(20)))
        .await
        .expect("evm"));
    assert!(!registry
        .validate_destination_address(11155111, "0x1234")
        .await
        .expect("evm"));
    assert!(!registry
        .validate_destination_address(11155111, &"ab".repeat(20))
        .await
        .expect("evm"));

    // NEAR
    assert!(registry
        .validate_destination_address(397, "alice.near")
        .await
        .expect("near"));
    assert!(!registry
        .validate_destination_address(397, "Alice..near")
        .await
        .expect("near"));

    // Solana: 32-byte base58 key
    assert!(registry
        .validate_destination_address(901, &bs58::encode([7u8; 32]).into_string())
        .await
        .expect("solana"));
    assert!(!registry
        .validate_destination_address(901, "not-base58!")
        .await
        .expect("solana"));

    // Bitcoin
    assert!(registry
        .validate_destination_address(1001, "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn")
        .await
        .expect("bitcoin"));
    assert!(!registry
        .validate_destination_address(1001, "xyz")
        .await
        .expect("bitcoin"));

    // Cosmos
    assert!(registry
        .validate_destination_address(118, "cosmos1vlthgax23ca9syk7xgaz347xmf4nunefw3cnt8")
        .await
        .expect("cosmos"));
    assert!(!registry
        .validate_destination_address(118, "cosmos")
        .await
        .expect("cosmos"));
}

/// What is tested: adapter parameter validation flags bad fee structure and
/// non-native tokens where unsupported
/// Why: Parameter issues must surface at creation, not at execution
#[tokio::test]
async fn test_order_params_validation() {
    let registry = AdapterRegistry::from_config(&EngineConfig::default())
        .await
        .expect("seed");

    let good = registry
        .validate_order_params(11155111, &params(&format!("0x{}", "ab".repeat(20)), "native"))
        .await
        .expect("validate");
    assert!(good.valid);

    let mut fee_too_high = params(&format!("0x{}", "ab".repeat(20)), "native");
    fee_too_high.resolver_fee = 1_000_000;
    let result = registry
        .validate_order_params(11155111, &fee_too_high)
        .await
        .expect("validate");
    assert!(!result.valid);
    assert!(result.issues.iter().any(|i| i.contains("resolver fee")));

    // Bitcoin has no token layer
    let token_on_bitcoin = registry
        .validate_order_params(
            1001,
            &params("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn", "some-token"),
        )
        .await
        .expect("validate");
    assert!(!token_on_bitcoin.valid);

    // EVM token must itself be a contract address
    let bad_token = registry
        .validate_order_params(
            11155111,
            &params(&format!("0x{}", "ab".repeat(20)), "usdc"),
        )
        .await
        .expect("validate");
    assert!(!bad_token.valid);
}

/// What is tested: feature flags per family
/// Why: Callers query capabilities instead of hard-coding family knowledge
#[tokio::test]
async fn test_supports_feature() {
    let evm = EvmAdapter::new(1, "Ethereum", 500);
    let near = NearAdapter::new(397, "NEAR", 500);
    let solana = SolanaAdapter::new(901, "Solana", 500);
    let bitcoin = BitcoinAdapter::new(1001, "Bitcoin", 500);
    let cosmos = CosmosAdapter::new(118, "Cosmos", 500);

    use swap_engine::ChainAdapter;
    assert!(evm.supports_feature("contract-call"));
    assert!(!evm.supports_feature("hashlock-script"));
    assert!(near.supports_feature("memo"));
    assert!(solana.supports_feature("token-transfer"));
    assert!(bitcoin.supports_feature("hashlock-script"));
    assert!(!bitcoin.supports_feature("token-transfer"));
    assert!(cosmos.supports_feature("token-transfer"));
}

/// What is tested: execution-cost estimates distinguish native and token
/// transfers
/// Why: The cost model sizes the destination-leg budget
#[tokio::test]
async fn test_execution_cost_estimates() {
    let registry = AdapterRegistry::from_config(&EngineConfig::default())
        .await
        .expect("seed");

    let native = registry
        .estimate_execution_cost(
            11155111,
            &params(&format!("0x{}", "ab".repeat(20)), "native"),
            1_000_000,
        )
        .await
        .expect("estimate");
    let token = registry
        .estimate_execution_cost(
            11155111,
            &params(
                &format!("0x{}", "ab".repeat(20)),
                &format!("0x{}", "cd".repeat(20)),
            ),
            1_000_000,
        )
        .await
        .expect("estimate");
    assert!(token > native);
}
