//! Address Derivation Service
//!
//! Deterministically derives a per-chain, per-path public address from the
//! custody identity. The same `(custody, chain, path)` triple always yields
//! the same address, so a resolver's destination address is stable across
//! retries, and recovered signers can be checked against it.
//!
//! secp256k1 chains use additive key derivation: a derivation scalar is
//! hashed from the custody id, chain id, and path, and the derived point is
//! `root + epsilon * G`, mirroring how MPC chain-signature networks derive
//! per-path keys without reconstructing the root secret. Ed25519 chains use
//! hash derivation of the 32-byte key; the MPC service holds the matching
//! key share per domain and path.

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::config::{ChainEntry, ChainFamily, CustodyConfig};
use crate::error::SignatureError;
use crate::intent::SignatureScheme;

/// Domain-separation prefixes for the two derivation flavors.
const EPSILON_PREFIX: &str = "swaps-v1 epsilon";
const ED25519_PREFIX: &str = "swaps-v1 ed25519";

/// A derived per-chain address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    /// Chain-native address rendering
    pub address: String,
    /// Public key bytes backing the address (SEC1 compressed for secp256k1,
    /// 32 bytes for ed25519)
    pub public_key: Vec<u8>,
    /// Signature scheme of the derived key
    pub scheme: SignatureScheme,
}

/// Derives the custody address for a chain and derivation path.
pub fn derive_address(
    custody: &CustodyConfig,
    chain: &ChainEntry,
    path: &str,
) -> Result<DerivedAddress, SignatureError> {
    match chain.family.scheme() {
        SignatureScheme::Secp256k1 => derive_secp256k1(custody, chain, path),
        SignatureScheme::Ed25519 => derive_ed25519(custody, chain, path),
    }
}

fn derive_secp256k1(
    custody: &CustodyConfig,
    chain: &ChainEntry,
    path: &str,
) -> Result<DerivedAddress, SignatureError> {
    let root_bytes = hex::decode(&custody.root_public_key_sec1_hex).map_err(|e| {
        SignatureError::InvalidCustodyKey {
            reason: format!("root public key is not valid hex: {e}"),
        }
    })?;
    let encoded =
        EncodedPoint::from_bytes(&root_bytes).map_err(|e| SignatureError::InvalidCustodyKey {
            reason: format!("root public key is not a SEC1 point: {e}"),
        })?;
    let root: AffinePoint = Option::from(AffinePoint::from_encoded_point(&encoded)).ok_or(
        SignatureError::InvalidCustodyKey {
            reason: "root public key is not on the secp256k1 curve".to_string(),
        },
    )?;

    let digest: [u8; 32] = Sha256::digest(
        format!(
            "{EPSILON_PREFIX},{},{},{}",
            custody.custody_id, chain.chain_id, path
        )
        .as_bytes(),
    )
    .into();
    let epsilon = <Scalar as Reduce<U256>>::reduce(U256::from_be_slice(&digest));

    let derived = (ProjectivePoint::from(root) + ProjectivePoint::GENERATOR * epsilon).to_affine();
    let compressed = derived.to_encoded_point(true).as_bytes().to_vec();

    let address = match chain.family {
        ChainFamily::Evm => {
            let uncompressed = derived.to_encoded_point(false);
            let hash = Keccak256::digest(&uncompressed.as_bytes()[1..]);
            format!("0x{}", hex::encode(&hash[12..]))
        }
        // The script layer consumes the compressed key directly; base58check
        // rendering is a broadcast-layer concern.
        ChainFamily::Bitcoin => hex::encode(&compressed),
        ChainFamily::Solana | ChainFamily::Near => {
            return Err(SignatureError::InvalidCustodyKey {
                reason: format!("chain {} is ed25519-based, not secp256k1", chain.chain_id),
            })
        }
    };

    Ok(DerivedAddress {
        address,
        public_key: compressed,
        scheme: SignatureScheme::Secp256k1,
    })
}

fn derive_ed25519(
    custody: &CustodyConfig,
    chain: &ChainEntry,
    path: &str,
) -> Result<DerivedAddress, SignatureError> {
    let root_bytes =
        hex::decode(&custody.ed25519_root_hex).map_err(|e| SignatureError::InvalidCustodyKey {
            reason: format!("ed25519 root key is not valid hex: {e}"),
        })?;
    if root_bytes.len() != 32 {
        return Err(SignatureError::InvalidCustodyKey {
            reason: format!(
                "ed25519 root key must be 32 bytes, got {}",
                root_bytes.len()
            ),
        });
    }

    let derived: [u8; 32] = Sha256::digest(
        format!(
            "{ED25519_PREFIX},{},{},{}",
            hex::encode(&root_bytes),
            chain.chain_id,
            path
        )
        .as_bytes(),
    )
    .into();

    let address = match chain.family {
        ChainFamily::Solana => bs58::encode(derived).into_string(),
        // NEAR implicit account id: lowercase hex of the ed25519 key
        ChainFamily::Near => hex::encode(derived),
        ChainFamily::Evm | ChainFamily::Bitcoin => {
            return Err(SignatureError::InvalidCustodyKey {
                reason: format!("chain {} is secp256k1-based, not ed25519", chain.chain_id),
            })
        }
    };

    Ok(DerivedAddress {
        address,
        public_key: derived.to_vec(),
        scheme: SignatureScheme::Ed25519,
    })
}
