//! MPC Signer Client
//!
//! HTTP client for the remote threshold-signing service. The service is an
//! opaque collaborator with a fixed request/response contract: it receives a
//! 32-byte payload, a derivation path, and a key domain, and returns the
//! signature components for the requested scheme. Threshold signature
//! generation itself is not modeled here.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::MpcConfig;
use crate::intent::SignatureScheme;

// ============================================================================
// WIRE STRUCTURES
// ============================================================================

/// Signing request forwarded to the MPC service.
#[derive(Debug, Clone, Serialize)]
pub struct MpcSignRequest {
    /// Fresh idempotency key per attempt
    pub request_id: String,
    /// Hex-encoded 32-byte payload to sign
    pub payload: String,
    /// Derivation path selecting the per-chain key
    pub path: String,
    /// Key domain (0 = secp256k1, 1 = ed25519 on the reference deployment)
    pub domain_id: u64,
    /// Requested signature scheme
    pub scheme: SignatureScheme,
}

/// Raw response from the MPC service.
///
/// secp256k1 responses carry the affine R point and the s scalar plus a
/// recovery id; ed25519 responses carry the full 64-byte signature.
#[derive(Debug, Clone, Deserialize)]
pub struct MpcSignResponse {
    /// Affine R point, SEC1 compressed hex (secp256k1 only)
    pub big_r: Option<String>,
    /// s scalar, 32 bytes hex (secp256k1 only)
    pub s: Option<String>,
    /// Recovery id (secp256k1 only)
    pub recovery_id: Option<u8>,
    /// 64-byte signature hex (ed25519 only)
    pub signature: Option<String>,
    /// Rejection reason when the service declines to sign
    pub error: Option<String>,
}

/// Outcome of one MPC signing round, normalized to raw signature bytes.
#[derive(Debug, Clone)]
pub enum MpcOutcome {
    /// Raw signature: `r || s` (64 bytes) for secp256k1 with the recovery id
    /// alongside, or the 64-byte ed25519 signature.
    Signed {
        signature: Vec<u8>,
        recovery_id: Option<u8>,
    },
    /// The service processed the request and refused it. Not retryable.
    Rejected { reason: String },
}

// ============================================================================
// CLIENT IMPLEMENTATION
// ============================================================================

/// Client for the remote MPC signing service.
pub struct MpcClient {
    client: Client,
    base_url: String,
}

impl MpcClient {
    /// Creates a new client for the configured endpoint. The per-request
    /// await is additionally bounded by the manager's timeout; the HTTP-level
    /// timeout here is a backstop.
    pub fn new(config: &MpcConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .no_proxy() // Avoid macOS system-configuration issues in tests
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one signing request and normalizes the response.
    pub async fn sign(&self, request: &MpcSignRequest) -> Result<MpcOutcome> {
        let url = format!("{}/sign", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("MPC sign request failed to send")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("MPC service returned HTTP {}", status);
        }

        let body: MpcSignResponse = response
            .json()
            .await
            .context("Failed to parse MPC sign response")?;

        if let Some(reason) = body.error {
            return Ok(MpcOutcome::Rejected { reason });
        }

        match request.scheme {
            SignatureScheme::Secp256k1 => {
                let big_r = body
                    .big_r
                    .context("MPC response missing big_r for secp256k1")?;
                let s = body.s.context("MPC response missing s for secp256k1")?;

                let big_r_bytes =
                    hex::decode(big_r.trim_start_matches("0x")).context("big_r is not hex")?;
                if big_r_bytes.len() != 33 {
                    anyhow::bail!(
                        "big_r must be a 33-byte compressed point, got {} bytes",
                        big_r_bytes.len()
                    );
                }
                let s_bytes = hex::decode(s.trim_start_matches("0x")).context("s is not hex")?;
                if s_bytes.len() != 32 {
                    anyhow::bail!("s must be 32 bytes, got {} bytes", s_bytes.len());
                }

                // r is the x coordinate of the R point
                let mut signature = Vec::with_capacity(64);
                signature.extend_from_slice(&big_r_bytes[1..]);
                signature.extend_from_slice(&s_bytes);

                Ok(MpcOutcome::Signed {
                    signature,
                    recovery_id: body.recovery_id,
                })
            }
            SignatureScheme::Ed25519 => {
                let signature_hex = body
                    .signature
                    .context("MPC response missing signature for ed25519")?;
                let signature = hex::decode(signature_hex.trim_start_matches("0x"))
                    .context("signature is not hex")?;
                if signature.len() != 64 {
                    anyhow::bail!(
                        "ed25519 signature must be 64 bytes, got {} bytes",
                        signature.len()
                    );
                }
                Ok(MpcOutcome::Signed {
                    signature,
                    recovery_id: None,
                })
            }
        }
    }
}
