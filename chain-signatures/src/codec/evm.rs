//! EVM legacy transaction codec.
//!
//! Signing side: RLP-encode the 9-field tuple
//! `(nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0)` and hash
//! it with Keccak-256 (EIP-155 replay protection). Reconstruction splits a
//! 65-byte `r || s || v` signature and re-encodes the signed tuple with the
//! chain's configured v-normalization rule.

use rlp::RlpStream;
use sha3::{Digest, Keccak256};

use crate::codec::{ReconstructOptions, SigningPayload};
use crate::error::SignatureError;
use crate::intent::{SignatureScheme, TransactionIntent, VNormalization};

/// Appends an unsigned integer as its minimal big-endian byte string, which
/// is exactly how RLP encodes integers (zero becomes the empty string).
fn append_uint(stream: &mut RlpStream, value: u128) {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    stream.append(&&bytes[first..]);
}

fn append_to_field(stream: &mut RlpStream, to: &Option<[u8; 20]>) {
    match to {
        Some(addr) => stream.append(&addr.as_slice()),
        None => stream.append_empty_data(),
    };
}

/// Builds the EIP-155 signing hash for a legacy EVM transaction.
pub fn signing_payload(intent: &TransactionIntent) -> Result<SigningPayload, SignatureError> {
    let TransactionIntent::Evm {
        chain_id,
        nonce,
        gas_price,
        gas_limit,
        to,
        value,
        data,
    } = intent
    else {
        return Err(SignatureError::InvalidIntent {
            reason: "EVM codec invoked with a non-EVM intent".to_string(),
        });
    };

    let mut stream = RlpStream::new_list(9);
    append_uint(&mut stream, u128::from(*nonce));
    append_uint(&mut stream, *gas_price);
    append_uint(&mut stream, u128::from(*gas_limit));
    append_to_field(&mut stream, to);
    append_uint(&mut stream, *value);
    stream.append(&data.as_slice());
    append_uint(&mut stream, u128::from(*chain_id));
    append_uint(&mut stream, 0);
    append_uint(&mut stream, 0);

    let preimage = stream.out().to_vec();
    let hash: [u8; 32] = Keccak256::digest(&preimage).into();

    Ok(SigningPayload {
        hash,
        preimage,
        scheme: SignatureScheme::Secp256k1,
    })
}

/// Rebuilds the broadcastable signed transaction from a 65-byte signature.
///
/// The recovery byte handling follows the chain's configured
/// `VNormalization`: `Eip155` maps a bare recovery id (or a legacy
/// `v ∈ {27, 28}`) to `recovery_id + chain_id * 2 + 35`; `AlreadyNormalized`
/// trusts the supplied byte. The distinction prevents double-offsetting a v
/// the MPC backend already normalized.
pub fn reconstruct(
    intent: &TransactionIntent,
    signature: &[u8],
    options: &ReconstructOptions,
) -> Result<Vec<u8>, SignatureError> {
    let TransactionIntent::Evm {
        chain_id,
        nonce,
        gas_price,
        gas_limit,
        to,
        value,
        data,
    } = intent
    else {
        return Err(SignatureError::InvalidIntent {
            reason: "EVM codec invoked with a non-EVM intent".to_string(),
        });
    };

    if signature.len() != 65 {
        return Err(SignatureError::InvalidSignatureLength {
            expected: 65,
            actual: signature.len(),
        });
    }

    let r = &signature[0..32];
    let s = &signature[32..64];
    let v_raw = signature[64];

    let normalization = options.v_normalization.unwrap_or(VNormalization::Eip155);
    let v = match normalization {
        VNormalization::Eip155 => {
            // Accept either a bare recovery id (0/1) or the legacy 27/28 form.
            let recovery_id = if v_raw >= 27 { v_raw - 27 } else { v_raw };
            if recovery_id > 1 {
                return Err(SignatureError::InvalidIntent {
                    reason: format!("recovery byte {v_raw} is not a valid secp256k1 recovery id"),
                });
            }
            u64::from(recovery_id) + chain_id * 2 + 35
        }
        VNormalization::AlreadyNormalized => u64::from(v_raw),
    };

    let mut stream = RlpStream::new_list(9);
    append_uint(&mut stream, u128::from(*nonce));
    append_uint(&mut stream, *gas_price);
    append_uint(&mut stream, u128::from(*gas_limit));
    append_to_field(&mut stream, to);
    append_uint(&mut stream, *value);
    stream.append(&data.as_slice());
    append_uint(&mut stream, u128::from(v));
    append_trimmed(&mut stream, r);
    append_trimmed(&mut stream, s);

    Ok(stream.out().to_vec())
}

/// Appends a fixed-width big-endian integer component with leading zeros
/// stripped, as RLP requires for the r and s values.
fn append_trimmed(stream: &mut RlpStream, bytes: &[u8]) {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    stream.append(&&bytes[first..]);
}

/// Recovers the signer address from a signing hash and a 65-byte signature.
/// Used to verify that a reconstructed transaction belongs to the derived
/// custody address.
pub fn recover_address(hash: &[u8; 32], signature: &[u8]) -> Result<String, SignatureError> {
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    if signature.len() != 65 {
        return Err(SignatureError::InvalidSignatureLength {
            expected: 65,
            actual: signature.len(),
        });
    }

    let v_raw = signature[64];
    let recovery_byte = if v_raw >= 27 { v_raw - 27 } else { v_raw };
    let recovery_id =
        RecoveryId::try_from(recovery_byte).map_err(|e| SignatureError::InvalidIntent {
            reason: format!("invalid recovery id: {e}"),
        })?;
    let sig =
        Signature::from_slice(&signature[0..64]).map_err(|e| SignatureError::InvalidIntent {
            reason: format!("invalid ECDSA signature: {e}"),
        })?;

    let verifying_key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id).map_err(
        |e| SignatureError::InvalidIntent {
            reason: format!("signature recovery failed: {e}"),
        },
    )?;

    Ok(address_from_verifying_key(&verifying_key))
}

/// Ethereum address of a secp256k1 public key: last 20 bytes of the
/// Keccak-256 of the uncompressed point without the 0x04 prefix.
pub fn address_from_verifying_key(key: &k256::ecdsa::VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}
