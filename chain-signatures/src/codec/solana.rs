//! Solana message codec.
//!
//! Signing side: encode the legacy message (the header byte triple, the
//! compact-u16 prefixed account key array, the recent blockhash, and the
//! compact-u16 prefixed instruction array) with the fee payer as the only
//! signer. Reconstruction prepends the 64-byte Ed25519 signature to the
//! message with a compact-u16 signature count of one.

use sha2::{Digest, Sha256};

use crate::codec::SigningPayload;
use crate::error::SignatureError;
use crate::intent::{SignatureScheme, SolanaInstruction, TransactionIntent};

/// Compact-u16 encoding used by Solana for array lengths.
fn write_compact_u16(value: u16, buf: &mut Vec<u8>) {
    let mut rem = value;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if rem == 0 {
            break;
        }
    }
}

/// Deterministic account table for a single-signer message: the fee payer
/// first, then writable non-signer accounts in first-reference order, then
/// read-only accounts, then program ids.
fn account_table(
    fee_payer: &[u8; 32],
    instructions: &[SolanaInstruction],
) -> (Vec<[u8; 32]>, u8, u8, u8) {
    let mut writable: Vec<[u8; 32]> = Vec::new();
    let mut readonly: Vec<[u8; 32]> = Vec::new();
    for instruction in instructions {
        for meta in &instruction.accounts {
            if meta.pubkey == *fee_payer {
                continue;
            }
            if meta.is_writable {
                // A key seen read-only earlier is promoted, not duplicated.
                if let Some(pos) = readonly.iter().position(|k| *k == meta.pubkey) {
                    readonly.remove(pos);
                }
                if !writable.contains(&meta.pubkey) {
                    writable.push(meta.pubkey);
                }
            } else if !writable.contains(&meta.pubkey) && !readonly.contains(&meta.pubkey) {
                readonly.push(meta.pubkey);
            }
        }
    }
    let mut programs: Vec<[u8; 32]> = Vec::new();
    for instruction in instructions {
        if instruction.program_id != *fee_payer
            && !writable.contains(&instruction.program_id)
            && !readonly.contains(&instruction.program_id)
            && !programs.contains(&instruction.program_id)
        {
            programs.push(instruction.program_id);
        }
    }

    let mut keys = Vec::with_capacity(1 + writable.len() + readonly.len() + programs.len());
    keys.push(*fee_payer);
    keys.extend(writable);
    keys.extend(readonly.iter().copied());
    keys.extend(programs.iter().copied());

    let num_required_signatures = 1u8;
    let num_readonly_signed = 0u8;
    let num_readonly_unsigned = (readonly.len() + programs.len()) as u8;
    (
        keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
    )
}

fn encode_message(
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
    instructions: &[SolanaInstruction],
) -> Result<Vec<u8>, SignatureError> {
    let (keys, signers, ro_signed, ro_unsigned) = account_table(fee_payer, instructions);

    let index_of = |key: &[u8; 32]| -> Result<u8, SignatureError> {
        keys.iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SignatureError::InvalidIntent {
                reason: "instruction references an account missing from the key table".to_string(),
            })
    };

    let mut buf = Vec::new();
    buf.push(signers);
    buf.push(ro_signed);
    buf.push(ro_unsigned);

    write_compact_u16(keys.len() as u16, &mut buf);
    for key in &keys {
        buf.extend_from_slice(key);
    }
    buf.extend_from_slice(recent_blockhash);

    write_compact_u16(instructions.len() as u16, &mut buf);
    for instruction in instructions {
        buf.push(index_of(&instruction.program_id)?);
        write_compact_u16(instruction.accounts.len() as u16, &mut buf);
        for meta in &instruction.accounts {
            buf.push(index_of(&meta.pubkey)?);
        }
        write_compact_u16(instruction.data.len() as u16, &mut buf);
        buf.extend_from_slice(&instruction.data);
    }

    Ok(buf)
}

/// Encodes the message and carries its SHA-256 as the 32-byte payload the
/// MPC signer receives for the Ed25519 domain.
pub fn signing_payload(intent: &TransactionIntent) -> Result<SigningPayload, SignatureError> {
    let TransactionIntent::Solana {
        fee_payer,
        recent_blockhash,
        instructions,
    } = intent
    else {
        return Err(SignatureError::InvalidIntent {
            reason: "Solana codec invoked with a non-Solana intent".to_string(),
        });
    };
    if instructions.is_empty() {
        return Err(SignatureError::InvalidIntent {
            reason: "Solana intent needs at least one instruction".to_string(),
        });
    }

    let preimage = encode_message(fee_payer, recent_blockhash, instructions)?;
    let hash: [u8; 32] = Sha256::digest(&preimage).into();

    Ok(SigningPayload {
        hash,
        preimage,
        scheme: SignatureScheme::Ed25519,
    })
}

/// Prepends the 64-byte Ed25519 signature to the encoded message.
pub fn reconstruct(
    intent: &TransactionIntent,
    signature: &[u8],
) -> Result<Vec<u8>, SignatureError> {
    if signature.len() != 64 {
        return Err(SignatureError::InvalidSignatureLength {
            expected: 64,
            actual: signature.len(),
        });
    }
    let payload = signing_payload(intent)?;

    let mut tx = Vec::with_capacity(1 + 64 + payload.preimage.len());
    write_compact_u16(1, &mut tx);
    tx.extend_from_slice(signature);
    tx.extend_from_slice(&payload.preimage);
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_u16_encoding() {
        let mut buf = Vec::new();
        write_compact_u16(0, &mut buf);
        assert_eq!(buf, vec![0x00]);
        buf.clear();
        write_compact_u16(127, &mut buf);
        assert_eq!(buf, vec![0x7f]);
        buf.clear();
        write_compact_u16(128, &mut buf);
        assert_eq!(buf, vec![0x80, 0x01]);
        buf.clear();
        write_compact_u16(300, &mut buf);
        assert_eq!(buf, vec![0xac, 0x02]);
    }
}
