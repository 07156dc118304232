//! Unit tests for deterministic address derivation
//!
//! These tests verify that the per-chain custody addresses are stable,
//! path-separated, and rendered in each chain's native format.

use chain_signatures::config::ChainSignaturesConfig;
use chain_signatures::intent::SignatureScheme;
use chain_signatures::{derive_address, CustodyConfig, SignatureError};

const SEPOLIA: u64 = 11155111;
const BITCOIN_TESTNET: u64 = 1001;
const SOLANA_DEVNET: u64 = 901;
const NEAR_TESTNET: u64 = 397;

fn config() -> ChainSignaturesConfig {
    ChainSignaturesConfig::default()
}

fn derive(config: &ChainSignaturesConfig, chain_id: u64, path: &str) -> String {
    let chain = config.chain(chain_id).expect("chain configured");
    derive_address(&config.custody, chain, path)
        .expect("derivation")
        .address
}

/// What is tested: the same (custody, chain, path) triple always yields the
/// same address
/// Why: Resolver destination addresses must be stable across retries and
/// process restarts
#[test]
fn test_derivation_deterministic() {
    let config = config();
    for chain_id in [SEPOLIA, BITCOIN_TESTNET, SOLANA_DEVNET, NEAR_TESTNET] {
        let a = derive(&config, chain_id, "swap-abc");
        let b = derive(&config, chain_id, "swap-abc");
        assert_eq!(a, b, "chain {chain_id} derivation must be deterministic");
    }
}

/// What is tested: distinct derivation paths and distinct chains yield
/// distinct addresses
/// Why: Key separation per order and per chain is the whole point of path
/// derivation
#[test]
fn test_derivation_separates_paths_and_chains() {
    let config = config();
    assert_ne!(
        derive(&config, SEPOLIA, "swap-abc"),
        derive(&config, SEPOLIA, "swap-def")
    );
    assert_ne!(
        derive(&config, SOLANA_DEVNET, "swap-abc"),
        derive(&config, NEAR_TESTNET, "swap-abc")
    );
}

/// What is tested: each chain family renders its native address format
/// Why: A malformed address is unusable on the destination chain
#[test]
fn test_address_renderings() {
    let config = config();

    let evm = derive(&config, SEPOLIA, "swap-abc");
    assert!(evm.starts_with("0x"));
    assert_eq!(evm.len(), 42);

    let bitcoin = derive(&config, BITCOIN_TESTNET, "swap-abc");
    assert_eq!(bitcoin.len(), 66);
    assert!(bitcoin.starts_with("02") || bitcoin.starts_with("03"));

    let solana = derive(&config, SOLANA_DEVNET, "swap-abc");
    let decoded = bs58::decode(&solana).into_vec().expect("base58");
    assert_eq!(decoded.len(), 32);

    let near = derive(&config, NEAR_TESTNET, "swap-abc");
    assert_eq!(near.len(), 64);
    assert!(near.chars().all(|c| c.is_ascii_hexdigit()));
}

/// What is tested: derived addresses differ from the root key's own address
/// Why: The additive derivation must actually shift the key, otherwise every
/// path shares one address
#[test]
fn test_secp256k1_derivation_shifts_key() {
    let config = config();
    let chain = config.chain(SEPOLIA).expect("chain");
    let derived = derive_address(&config.custody, chain, "swap-abc").expect("derivation");

    // The compressed derived key must not equal the configured root key
    let root = hex::decode(&config.custody.root_public_key_sec1_hex).expect("hex");
    assert_ne!(derived.public_key, root);
    assert_eq!(derived.scheme, SignatureScheme::Secp256k1);
}

/// What is tested: malformed custody keys are rejected with a configuration
/// error
/// Why: A bad root key must fail loudly at derivation, never produce a
/// garbage address
#[test]
fn test_invalid_custody_keys_rejected() {
    let config = config();
    let chain = config.chain(SEPOLIA).expect("chain");

    let bad_hex = CustodyConfig {
        custody_id: "swap-custody.test".to_string(),
        root_public_key_sec1_hex: "not-hex".to_string(),
        ed25519_root_hex: config.custody.ed25519_root_hex.clone(),
    };
    assert!(matches!(
        derive_address(&bad_hex, chain, "swap-abc").unwrap_err(),
        SignatureError::InvalidCustodyKey { .. }
    ));

    let off_curve = CustodyConfig {
        custody_id: "swap-custody.test".to_string(),
        root_public_key_sec1_hex: format!("02{}", "ff".repeat(32)),
        ed25519_root_hex: config.custody.ed25519_root_hex.clone(),
    };
    assert!(matches!(
        derive_address(&off_curve, chain, "swap-abc").unwrap_err(),
        SignatureError::InvalidCustodyKey { .. }
    ));

    let ed_chain = config.chain(SOLANA_DEVNET).expect("chain");
    let short_ed = CustodyConfig {
        custody_id: "swap-custody.test".to_string(),
        root_public_key_sec1_hex: config.custody.root_public_key_sec1_hex.clone(),
        ed25519_root_hex: "0102".to_string(),
    };
    assert!(matches!(
        derive_address(&short_ed, ed_chain, "swap-abc").unwrap_err(),
        SignatureError::InvalidCustodyKey { .. }
    ));
}
