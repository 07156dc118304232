//! Unit tests for engine configuration
//!
//! These tests verify configuration parsing, validation bounds, and the
//! per-chain deposit-floor override without requiring external services.

use swap_engine::{ChainFamily, EngineConfig};

/// Test that default configuration creates valid structure
/// Why: Verify default config is valid and doesn't panic
#[test]
fn test_default_config_creation() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.owner, "swap-owner.test");
    assert_eq!(config.min_safety_deposit_bps, 500);
    assert_eq!(config.authorized_resolvers, vec!["resolver-1.test"]);
    assert_eq!(config.chains.len(), 5);
}

/// What is tested: the basis-points bound 1..=10000 at both edges
/// Why: 0 bps disables the deposit floor and >10000 exceeds the whole amount
#[test]
fn test_deposit_bps_bounds() {
    let mut config = EngineConfig::default();
    config.min_safety_deposit_bps = 0;
    assert!(config.validate().is_err());

    config.min_safety_deposit_bps = 10_001;
    assert!(config.validate().is_err());

    config.min_safety_deposit_bps = 10_000;
    assert!(config.validate().is_ok());

    config.min_safety_deposit_bps = 1;
    assert!(config.validate().is_ok());

    // Per-chain override obeys the same bound
    config.min_safety_deposit_bps = 500;
    config.chains[0].min_safety_deposit_bps = Some(0);
    assert!(config.validate().is_err());
}

/// What is tested: duplicate chain ids are rejected
/// Why: The chain table keys the adapter registry
#[test]
fn test_duplicate_chain_ids_rejected() {
    let mut config = EngineConfig::default();
    config.chains[1].chain_id = config.chains[0].chain_id;
    assert!(config.validate().is_err());
}

/// What is tested: TOML parsing covers families, activity flags, and the
/// per-chain deposit override
/// Why: Production configuration arrives as TOML, not as the default()
#[test]
fn test_config_parses_from_toml() {
    let toml = r#"
owner = "ops.main"
min_safety_deposit_bps = 300
authorized_resolvers = ["resolver-a.main", "resolver-b.main"]

[[chains]]
chain_id = 1
name = "Ethereum"
family = "evm"

[[chains]]
chain_id = 397
name = "NEAR"
family = "near"
active = false
min_safety_deposit_bps = 750
"#;

    let config: EngineConfig = toml::from_str(toml).expect("parse");
    config.validate().expect("valid");

    assert_eq!(config.owner, "ops.main");
    assert_eq!(config.authorized_resolvers.len(), 2);
    assert_eq!(config.chains[0].family, ChainFamily::Evm);
    assert!(config.chains[0].active); // defaulted
    assert_eq!(config.chains[0].min_safety_deposit_bps, None);
    assert!(!config.chains[1].active);
    assert_eq!(config.chains[1].min_safety_deposit_bps, Some(750));

    assert_eq!(config.deposit_bps_for(&config.chains[0]), 300);
    assert_eq!(config.deposit_bps_for(&config.chains[1]), 750);
}

/// What is tested: an empty owner is a configuration error
/// Why: Owner-gated operations would be unreachable
#[test]
fn test_empty_owner_rejected() {
    let mut config = EngineConfig::default();
    config.owner = String::new();
    assert!(config.validate().is_err());
}
