//! Signature Request Manager
//!
//! Issues signing requests to the MPC service, tracks in-flight requests,
//! applies the timeout/retry budget, and maintains rolling statistics. The
//! caller names each request with a tracking id it can later abandon; every
//! MPC attempt goes out under its own fresh idempotency id (the
//! serialization is deterministic, so a repeated round reconstructs to
//! identical signed-transaction bytes).
//!
//! Requests that share a derivation path are serialized behind a per-path
//! lock: many threshold-signing backends reject concurrent rounds on one
//! key-path, so overlap there is a correctness hazard, not a performance
//! knob. Requests on distinct paths proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::{self, ReconstructOptions};
use crate::config::{ChainEntry, ChainSignaturesConfig};
use crate::derivation::{self, DerivedAddress};
use crate::error::SignatureError;
use crate::intent::{SignatureScheme, TransactionIntent};
use crate::mpc::{MpcClient, MpcOutcome, MpcSignRequest};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Result of a completed signature request. Transient: it is handed to the
/// caller and not persisted beyond the in-flight table.
#[derive(Debug, Clone)]
pub struct SignatureResponse {
    /// Caller-supplied tracking id of the request
    pub request_id: String,
    /// Target chain id
    pub target_chain: u64,
    /// Derived custody address the signature belongs to
    pub derived_address: DerivedAddress,
    /// Raw signature bytes (64 for ed25519 and Bitcoin, 65 for EVM)
    pub signature: Vec<u8>,
    /// Recovery id as returned by the MPC service (secp256k1 only)
    pub recovery_id: Option<u8>,
    /// Broadcastable signed transaction reconstructed for the chain
    pub signed_transaction: Vec<u8>,
    /// End-to-end latency of the request in milliseconds
    pub latency_ms: u64,
}

/// Snapshot of the manager's rolling statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SigningStatsSnapshot {
    pub requested: u64,
    pub completed: u64,
    pub failed: u64,
    pub avg_latency_ms: f64,
    /// completed / (completed + failed); 0 when nothing has resolved yet
    pub success_rate: f64,
}

/// Rolling statistics owned by the manager and mutated only inside the
/// request lifecycle.
#[derive(Debug, Default)]
struct SigningStats {
    requested: u64,
    completed: u64,
    failed: u64,
    avg_latency_ms: f64,
}

impl SigningStats {
    /// Folds one resolved request into the aggregates. The moving average is
    /// exponentially weighted over the resolution count, so no history is
    /// retained while the average stays responsive.
    fn record_resolution(&mut self, success: bool, latency_ms: f64) {
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        let n = (self.completed + self.failed) as f64;
        self.avg_latency_ms = self.avg_latency_ms * (1.0 - 1.0 / n) + latency_ms * (1.0 / n);
    }

    fn snapshot(&self) -> SigningStatsSnapshot {
        let resolved = self.completed + self.failed;
        SigningStatsSnapshot {
            requested: self.requested,
            completed: self.completed,
            failed: self.failed,
            avg_latency_ms: self.avg_latency_ms,
            success_rate: if resolved == 0 {
                0.0
            } else {
                self.completed as f64 / resolved as f64
            },
        }
    }
}

/// In-flight request entry. Removal before the response arrives marks the
/// request as abandoned; a late response is then discarded.
#[derive(Debug, Clone)]
struct InFlightRequest {
    target_chain: u64,
    derivation_path: String,
}

// ============================================================================
// MANAGER IMPLEMENTATION
// ============================================================================

/// Manager for MPC signature requests.
pub struct SignatureManager {
    config: Arc<ChainSignaturesConfig>,
    mpc: MpcClient,
    in_flight: RwLock<HashMap<String, InFlightRequest>>,
    path_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    stats: Mutex<SigningStats>,
}

impl SignatureManager {
    /// Creates a new manager from validated configuration.
    pub fn new(config: ChainSignaturesConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let mpc = MpcClient::new(&config.mpc)?;
        Ok(Self {
            config: Arc::new(config),
            mpc,
            in_flight: RwLock::new(HashMap::new()),
            path_locks: Mutex::new(HashMap::new()),
            stats: Mutex::new(SigningStats::default()),
        })
    }

    /// Derives the custody address for a chain and derivation path.
    /// Deterministic: identical inputs always yield the same address.
    pub fn derive_address(
        &self,
        target_chain: u64,
        derivation_path: &str,
    ) -> Result<DerivedAddress, SignatureError> {
        let chain = self.chain(target_chain)?;
        derivation::derive_address(&self.config.custody, chain, derivation_path)
    }

    /// Lists the supported chains as `(chain_id, scheme, name)` triples.
    pub fn get_supported_chains(&self) -> Vec<(u64, SignatureScheme, String)> {
        self.config
            .chains
            .iter()
            .map(|c| (c.chain_id, c.family.scheme(), c.name.clone()))
            .collect()
    }

    /// Returns a snapshot of the rolling statistics.
    pub async fn get_stats(&self) -> SigningStatsSnapshot {
        self.stats.lock().await.snapshot()
    }

    /// Abandons a pending request. Any response that arrives afterwards is
    /// discarded instead of applied.
    pub async fn abandon(&self, request_id: &str) {
        if let Some(entry) = self.in_flight.write().await.remove(request_id) {
            warn!(
                request_id,
                target_chain = entry.target_chain,
                path = %entry.derivation_path,
                "Abandoned in-flight signature request"
            );
        }
    }

    /// Requests a signature for a transaction intent on a target chain.
    ///
    /// The caller names the request with `request_id` and may `abandon` it
    /// under that id while it is in flight; each MPC attempt still carries
    /// its own fresh idempotency id on the wire. Serializes the intent into
    /// the chain-native signing payload, forwards it to the MPC service, and
    /// reconstructs the broadcastable signed transaction from the returned
    /// signature. Transient failures (transport errors, timeouts) are
    /// retried up to the configured budget with exponential backoff;
    /// validation failures and MPC rejections surface immediately.
    pub async fn request_signature(
        &self,
        request_id: &str,
        target_chain: u64,
        derivation_path: &str,
        intent: &TransactionIntent,
    ) -> Result<SignatureResponse, SignatureError> {
        let chain = self.chain(target_chain)?.clone();
        let expected = chain.family.scheme();
        let actual = intent.scheme();
        if expected != actual {
            return Err(SignatureError::SchemeMismatch {
                chain_id: target_chain,
                expected,
                actual,
            });
        }

        let payload = codec::signing_payload(intent)?;
        let derived = derivation::derive_address(&self.config.custody, &chain, derivation_path)?;

        self.stats.lock().await.requested += 1;
        self.in_flight.write().await.insert(
            request_id.to_string(),
            InFlightRequest {
                target_chain,
                derivation_path: derivation_path.to_string(),
            },
        );

        let started = Instant::now();
        // Serialize rounds sharing a derivation path; distinct paths overlap.
        let path_lock = self.path_lock(derivation_path).await;
        let result = async {
            let _path_guard = path_lock.lock().await;
            let timeout = Duration::from_millis(self.config.mpc.timeout_ms);
            let mut last_error: Option<SignatureError> = None;

            for attempt in 1..=self.config.mpc.max_attempts {
                let attempt_id = Uuid::new_v4().to_string();
                let request = MpcSignRequest {
                    request_id: attempt_id.clone(),
                    payload: hex::encode(payload.hash),
                    path: derivation_path.to_string(),
                    domain_id: chain.domain_id,
                    scheme: expected,
                };
                debug!(
                    request_id,
                    attempt_id, target_chain, attempt,
                    "Forwarding signature request to MPC service"
                );

                let outcome = tokio::time::timeout(timeout, self.mpc.sign(&request)).await;

                // A missing entry means the caller abandoned the request
                // while it was in flight; whatever came back must not be
                // applied.
                if !self.in_flight.read().await.contains_key(request_id) {
                    return Err(SignatureError::RequestAbandoned {
                        request_id: request_id.to_string(),
                    });
                }

                match outcome {
                    Err(_elapsed) => {
                        warn!(
                            request_id,
                            target_chain, attempt, "Signature request timed out"
                        );
                        last_error = Some(SignatureError::SignatureTimeout {
                            request_id: request_id.to_string(),
                            timeout_ms: self.config.mpc.timeout_ms,
                            attempts: attempt,
                        });
                    }
                    Ok(Err(transport)) => {
                        warn!(
                            request_id,
                            target_chain,
                            attempt,
                            error = %transport,
                            "MPC call failed"
                        );
                        last_error = Some(SignatureError::MpcCallFailed {
                            request_id: request_id.to_string(),
                            source: transport,
                        });
                    }
                    Ok(Ok(MpcOutcome::Rejected { reason })) => {
                        // Deterministic rejection: surface immediately, no
                        // retry.
                        return Err(SignatureError::MpcRejected {
                            request_id: request_id.to_string(),
                            reason,
                        });
                    }
                    Ok(Ok(MpcOutcome::Signed {
                        signature,
                        recovery_id,
                    })) => {
                        let raw = self.assemble_raw_signature(intent, &signature, recovery_id)?;
                        let options = ReconstructOptions {
                            v_normalization: chain.v_normalization,
                            public_key: Some(derived.public_key.clone()),
                        };
                        let signed_transaction = codec::reconstruct(intent, &raw, &options)?;

                        let latency = started.elapsed();
                        info!(
                            request_id,
                            target_chain,
                            attempt,
                            latency_ms = latency.as_millis() as u64,
                            "Signature request completed"
                        );
                        return Ok(SignatureResponse {
                            request_id: request_id.to_string(),
                            target_chain,
                            derived_address: derived.clone(),
                            signature: raw,
                            recovery_id,
                            signed_transaction,
                            latency_ms: latency.as_millis() as u64,
                        });
                    }
                }

                if attempt < self.config.mpc.max_attempts {
                    let backoff = self.config.mpc.retry_backoff_ms << (attempt - 1);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }

            Err(last_error.unwrap_or(SignatureError::SignatureTimeout {
                request_id: request_id.to_string(),
                timeout_ms: self.config.mpc.timeout_ms,
                attempts: self.config.mpc.max_attempts,
            }))
        }
        .await;

        self.in_flight.write().await.remove(request_id);
        self.release_path_lock(derivation_path, path_lock).await;
        self.record_resolution(result.is_ok(), started.elapsed()).await;
        result
    }

    /// Builds the raw signature bytes the codec expects for the intent's
    /// chain family from the MPC components.
    fn assemble_raw_signature(
        &self,
        intent: &TransactionIntent,
        signature: &[u8],
        recovery_id: Option<u8>,
    ) -> Result<Vec<u8>, SignatureError> {
        match intent {
            TransactionIntent::Evm { .. } => {
                if signature.len() != 64 {
                    return Err(SignatureError::InvalidSignatureLength {
                        expected: 64,
                        actual: signature.len(),
                    });
                }
                let recovery = recovery_id.ok_or_else(|| SignatureError::InvalidIntent {
                    reason: "MPC response carried no recovery id for an EVM signature".to_string(),
                })?;
                let mut raw = Vec::with_capacity(65);
                raw.extend_from_slice(signature);
                raw.push(recovery);
                Ok(raw)
            }
            TransactionIntent::Bitcoin { .. } | TransactionIntent::Solana { .. } => {
                if signature.len() != 64 {
                    return Err(SignatureError::InvalidSignatureLength {
                        expected: 64,
                        actual: signature.len(),
                    });
                }
                Ok(signature.to_vec())
            }
        }
    }

    async fn record_resolution(&self, success: bool, latency: Duration) {
        self.stats
            .lock()
            .await
            .record_resolution(success, latency.as_millis() as f64);
    }

    fn chain(&self, chain_id: u64) -> Result<&ChainEntry, SignatureError> {
        self.config
            .chain(chain_id)
            .ok_or(SignatureError::UnsupportedChain { chain_id })
    }

    async fn path_lock(&self, derivation_path: &str) -> Arc<Mutex<()>> {
        let mut locks = self.path_locks.lock().await;
        locks
            .entry(derivation_path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops a path-lock handle and reclaims the table entry once no other
    /// request holds it, keeping the table bounded by the number of paths
    /// signing concurrently.
    async fn release_path_lock(&self, derivation_path: &str, handle: Arc<Mutex<()>>) {
        drop(handle);
        let mut locks = self.path_locks.lock().await;
        if let Some(lock) = locks.get(derivation_path) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(derivation_path);
            }
        }
    }
}
