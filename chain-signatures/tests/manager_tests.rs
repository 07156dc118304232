//! Unit tests for the signature request manager
//!
//! These tests drive the manager against a mock MPC service to verify the
//! request lifecycle: successful rounds, retries on transient failures,
//! timeouts, rejections, and the rolling statistics.

use std::sync::Arc;
use std::time::Duration;

use chain_signatures::intent::{
    SolanaAccountMeta, SolanaInstruction, TransactionIntent,
};
use chain_signatures::{ChainSignaturesConfig, SignatureError, SignatureManager};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEPOLIA: u64 = 11155111;
const SOLANA_DEVNET: u64 = 901;

fn test_config(endpoint: &str) -> ChainSignaturesConfig {
    let mut config = ChainSignaturesConfig::default();
    config.mpc.endpoint = endpoint.to_string();
    config.mpc.timeout_ms = 2_000;
    config.mpc.max_attempts = 3;
    config.mpc.retry_backoff_ms = 10;
    config
}

fn evm_intent() -> TransactionIntent {
    TransactionIntent::Evm {
        chain_id: SEPOLIA,
        nonce: 0,
        gas_price: 1_000_000_000,
        gas_limit: 21_000,
        to: Some([0x11; 20]),
        value: 10_000,
        data: vec![],
    }
}

fn solana_intent() -> TransactionIntent {
    TransactionIntent::Solana {
        fee_payer: [0x01; 32],
        recent_blockhash: [0x02; 32],
        instructions: vec![SolanaInstruction {
            program_id: [0x03; 32],
            accounts: vec![SolanaAccountMeta {
                pubkey: [0x01; 32],
                is_signer: true,
                is_writable: true,
            }],
            data: vec![1, 2, 3],
        }],
    }
}

fn secp_response() -> serde_json::Value {
    json!({
        "big_r": format!("02{}", "aa".repeat(32)),
        "s": "bb".repeat(32),
        "recovery_id": 0,
        "signature": null,
        "error": null
    })
}

fn ed25519_response() -> serde_json::Value {
    json!({
        "big_r": null,
        "s": null,
        "recovery_id": null,
        "signature": "cc".repeat(64),
        "error": null
    })
}

/// What is tested: a secp256k1 round completes and yields a 65-byte signature
/// plus a broadcastable transaction
/// Why: The manager must stitch big_r/s/recovery_id into the raw layout the
/// EVM codec expects
#[tokio::test]
async fn test_secp256k1_request_completes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(secp_response()))
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");
    let response = manager
        .request_signature("req-1", SEPOLIA, "swap-order-1", &evm_intent())
        .await
        .expect("signature");

    assert_eq!(response.target_chain, SEPOLIA);
    assert_eq!(response.signature.len(), 65);
    assert_eq!(response.recovery_id, Some(0));
    assert!(!response.signed_transaction.is_empty());
    assert!(response.derived_address.address.starts_with("0x"));

    let stats = manager.get_stats().await;
    assert_eq!(stats.requested, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    assert!((stats.success_rate - 1.0).abs() < f64::EPSILON);
}

/// What is tested: an ed25519 round completes with a 64-byte signature
/// Why: Ed25519 responses arrive as one signature field rather than
/// components, and the Solana codec needs exactly 64 bytes
#[tokio::test]
async fn test_ed25519_request_completes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ed25519_response()))
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");
    let response = manager
        .request_signature("req-2", SOLANA_DEVNET, "swap-order-2", &solana_intent())
        .await
        .expect("signature");

    assert_eq!(response.signature.len(), 64);
    assert_eq!(response.recovery_id, None);
    // signature count + signature + message
    assert_eq!(response.signed_transaction[0], 1);
    assert_eq!(&response.signed_transaction[1..65], &[0xcc; 64]);
}

/// What is tested: transient HTTP failures are retried and the request still
/// completes within the budget
/// Why: One flaky MPC round must not fail the whole signature request
#[tokio::test]
async fn test_transient_failure_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(secp_response()))
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");
    let response = manager
        .request_signature("req-3", SEPOLIA, "swap-order-3", &evm_intent())
        .await
        .expect("signature after retry");

    assert_eq!(response.signature.len(), 65);
    let stats = manager.get_stats().await;
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
}

/// What is tested: a request that exhausts its retry budget surfaces the
/// transient error and counts as one failed request
/// Why: The retry budget is bounded; the caller must see the final error,
/// not hang forever
#[tokio::test]
async fn test_retry_budget_exhausted() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");
    let err = manager
        .request_signature("req-4", SEPOLIA, "swap-order-4", &evm_intent())
        .await
        .unwrap_err();

    assert!(matches!(err, SignatureError::MpcCallFailed { .. }));
    assert!(err.is_retryable());

    let stats = manager.get_stats().await;
    assert_eq!(stats.requested, 1);
    assert_eq!(stats.failed, 1);
    assert!(stats.success_rate.abs() < f64::EPSILON);
}

/// What is tested: a per-attempt timeout is retried and reported with the
/// attempt count when the budget runs out
/// Why: A silent MPC service must be distinguishable from one that errored
#[tokio::test]
async fn test_timeout_reported_with_attempts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(secp_response())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.mpc.timeout_ms = 100;
    config.mpc.max_attempts = 2;

    let manager = SignatureManager::new(config).expect("manager");
    let err = manager
        .request_signature("req-5", SEPOLIA, "swap-order-5", &evm_intent())
        .await
        .unwrap_err();

    match err {
        SignatureError::SignatureTimeout {
            timeout_ms,
            attempts,
            ..
        } => {
            assert_eq!(timeout_ms, 100);
            assert_eq!(attempts, 2);
        }
        other => panic!("expected SignatureTimeout, got {other:?}"),
    }
}

/// What is tested: an MPC rejection surfaces immediately without retries
/// Why: Rejections are deterministic; retrying them wastes the budget and
/// hides the reason
#[tokio::test]
async fn test_rejection_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "big_r": null,
            "s": null,
            "recovery_id": null,
            "signature": null,
            "error": "payload refused by policy"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");
    let err = manager
        .request_signature("req-6", SEPOLIA, "swap-order-6", &evm_intent())
        .await
        .unwrap_err();

    match err {
        SignatureError::MpcRejected { reason, .. } => {
            assert_eq!(reason, "payload refused by policy");
        }
        other => panic!("expected MpcRejected, got {other:?}"),
    }
    assert!(!SignatureError::MpcRejected {
        request_id: String::new(),
        reason: String::new()
    }
    .is_retryable());
}

/// What is tested: requests for unknown chains and mismatched schemes fail
/// before any MPC traffic
/// Why: Input validation failures are never retried and never leave the
/// process
#[tokio::test]
async fn test_validation_failures_before_mpc() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(secp_response()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");

    let err = manager
        .request_signature("req-7", 424242, "swap-order-7", &evm_intent())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignatureError::UnsupportedChain { chain_id: 424242 }
    ));

    // Solana intent against an EVM chain
    let err = manager
        .request_signature("req-7b", SEPOLIA, "swap-order-7", &solana_intent())
        .await
        .unwrap_err();
    assert!(matches!(err, SignatureError::SchemeMismatch { .. }));

    let stats = manager.get_stats().await;
    assert_eq!(stats.requested, 0);
}

/// What is tested: repeated requests for the same intent reconstruct
/// byte-identical signed transactions
/// Why: Serialization determinism is what makes retried rounds idempotent
#[tokio::test]
async fn test_repeated_requests_reconstruct_identically() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(secp_response()))
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");
    let first = manager
        .request_signature("req-8a", SEPOLIA, "swap-order-8", &evm_intent())
        .await
        .expect("signature");
    let second = manager
        .request_signature("req-8b", SEPOLIA, "swap-order-8", &evm_intent())
        .await
        .expect("signature");

    assert_eq!(first.request_id, "req-8a");
    assert_ne!(first.request_id, second.request_id);
    assert_eq!(first.signed_transaction, second.signed_transaction);
    assert_eq!(first.derived_address, second.derived_address);
}

/// What is tested: a response arriving after the caller abandoned the
/// request surfaces RequestAbandoned and counts as a failure
/// Why: A signed transaction for a request nobody is waiting on must be
/// discarded, never handed out
#[tokio::test]
async fn test_abandoned_request_discards_late_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(secp_response())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let manager =
        Arc::new(SignatureManager::new(test_config(&mock_server.uri())).expect("manager"));
    let task = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .request_signature("req-gone", SEPOLIA, "swap-order-10", &evm_intent())
                .await
        })
    };

    // Abandon while the MPC round is still in flight
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.abandon("req-gone").await;

    let err = task.await.expect("join").unwrap_err();
    assert!(matches!(err, SignatureError::RequestAbandoned { .. }));

    let stats = manager.get_stats().await;
    assert_eq!(stats.requested, 1);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.failed, 1);
}

/// What is tested: concurrent requests sharing a derivation path run their
/// MPC rounds one after another while distinct paths overlap
/// Why: Threshold backends commonly reject concurrent signing rounds on one
/// key-path, so rounds on a shared path must never overlap
#[tokio::test]
async fn test_shared_path_requests_serialized() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(secp_response())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");

    let started = std::time::Instant::now();
    let intent_a = evm_intent();
    let intent_b = evm_intent();
    let (first, second) = tokio::join!(
        manager.request_signature("req-11a", SEPOLIA, "swap-order-11", &intent_a),
        manager.request_signature("req-11b", SEPOLIA, "swap-order-11", &intent_b),
    );
    first.expect("first");
    second.expect("second");
    let serialized = started.elapsed();
    assert!(
        serialized >= Duration::from_millis(400),
        "rounds on one path overlapped: {serialized:?}"
    );

    let started = std::time::Instant::now();
    let intent_a = evm_intent();
    let intent_b = evm_intent();
    let (first, second) = tokio::join!(
        manager.request_signature("req-12a", SEPOLIA, "swap-order-12", &intent_a),
        manager.request_signature("req-12b", SEPOLIA, "swap-order-13", &intent_b),
    );
    first.expect("first");
    second.expect("second");
    let overlapped = started.elapsed();
    assert!(
        overlapped < Duration::from_millis(400),
        "rounds on distinct paths were serialized: {overlapped:?}"
    );
}

/// What is tested: the supported-chain listing mirrors the configuration
/// Why: Callers pick destination chains from this listing
#[tokio::test]
async fn test_supported_chains_listing() {
    let manager =
        SignatureManager::new(test_config("http://127.0.0.1:1")).expect("manager");
    let chains = manager.get_supported_chains();
    assert_eq!(chains.len(), 4);
    assert!(chains.iter().any(|(id, _, _)| *id == SEPOLIA));
    assert!(chains.iter().any(|(id, _, _)| *id == SOLANA_DEVNET));
}

/// What is tested: the latency average folds in both completed and failed
/// requests
/// Why: The moving average is weighted over every resolved request, so a
/// failure stream cannot leave it frozen at the last success
#[tokio::test]
async fn test_stats_average_covers_failures() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(secp_response()))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "big_r": null,
            "s": null,
            "recovery_id": null,
            "signature": null,
            "error": "refused"
        })))
        .mount(&mock_server)
        .await;

    let manager = SignatureManager::new(test_config(&mock_server.uri())).expect("manager");
    manager
        .request_signature("req-9a", SEPOLIA, "swap-order-9", &evm_intent())
        .await
        .expect("first succeeds");
    manager
        .request_signature("req-9b", SEPOLIA, "swap-order-9", &evm_intent())
        .await
        .unwrap_err();

    let stats = manager.get_stats().await;
    assert_eq!(stats.requested, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);
    assert!(stats.avg_latency_ms >= 0.0);
}
