//! Bitcoin legacy transaction codec.
//!
//! Signing side: the SIGHASH_ALL pre-image for the requested input (the
//! transaction serialized with that input's script code in place, every other
//! scriptSig empty, and the sighash type appended), double-SHA-256 hashed.
//! Reconstruction DER-encodes the raw 64-byte `r || s` signature, appends the
//! SIGHASH_ALL byte, and assembles the `<sig> <pubkey>` scriptSig on the
//! signed input.

use sha2::{Digest, Sha256};

use crate::codec::{ReconstructOptions, SigningPayload};
use crate::error::SignatureError;
use crate::intent::{BitcoinInput, BitcoinOutput, SignatureScheme, TransactionIntent};

/// SIGHASH_ALL type byte.
const SIGHASH_ALL: u8 = 0x01;

fn write_var_int(value: u64, buf: &mut Vec<u8>) {
    match value {
        0..=0xfc => buf.push(value as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

fn write_input(buf: &mut Vec<u8>, input: &BitcoinInput, script: &[u8]) {
    // txid is serialized in little-endian (reverse of display order)
    let mut txid = input.txid;
    txid.reverse();
    buf.extend_from_slice(&txid);
    buf.extend_from_slice(&input.vout.to_le_bytes());
    write_var_int(script.len() as u64, buf);
    buf.extend_from_slice(script);
    buf.extend_from_slice(&input.sequence.to_le_bytes());
}

fn write_output(buf: &mut Vec<u8>, output: &BitcoinOutput) {
    buf.extend_from_slice(&output.value.to_le_bytes());
    write_var_int(output.script_pubkey.len() as u64, buf);
    buf.extend_from_slice(&output.script_pubkey);
}

fn serialize_with_scripts(
    version: u32,
    lock_time: u32,
    inputs: &[BitcoinInput],
    outputs: &[BitcoinOutput],
    script_for: impl Fn(usize) -> Vec<u8>,
) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&version.to_le_bytes());
    write_var_int(inputs.len() as u64, &mut buf);
    for (i, input) in inputs.iter().enumerate() {
        write_input(&mut buf, input, &script_for(i));
    }
    write_var_int(outputs.len() as u64, &mut buf);
    for output in outputs {
        write_output(&mut buf, output);
    }
    buf.extend_from_slice(&lock_time.to_le_bytes());
    buf
}

/// Builds the SIGHASH_ALL pre-image for the requested input and hashes it
/// with double SHA-256.
pub fn signing_payload(intent: &TransactionIntent) -> Result<SigningPayload, SignatureError> {
    let TransactionIntent::Bitcoin {
        version,
        lock_time,
        inputs,
        outputs,
        sign_input,
    } = intent
    else {
        return Err(SignatureError::InvalidIntent {
            reason: "Bitcoin codec invoked with a non-Bitcoin intent".to_string(),
        });
    };

    if inputs.is_empty() || outputs.is_empty() {
        return Err(SignatureError::InvalidIntent {
            reason: "Bitcoin intent needs at least one input and one output".to_string(),
        });
    }
    if *sign_input >= inputs.len() {
        return Err(SignatureError::InvalidIntent {
            reason: format!(
                "sign_input {} out of range for {} inputs",
                sign_input,
                inputs.len()
            ),
        });
    }

    let mut preimage = serialize_with_scripts(*version, *lock_time, inputs, outputs, |i| {
        if i == *sign_input {
            inputs[*sign_input].script_code.clone()
        } else {
            Vec::new()
        }
    });
    preimage.extend_from_slice(&u32::from(SIGHASH_ALL).to_le_bytes());

    let hash: [u8; 32] = Sha256::digest(Sha256::digest(&preimage)).into();

    Ok(SigningPayload {
        hash,
        preimage,
        scheme: SignatureScheme::Secp256k1,
    })
}

/// Attaches the signature to the signed input and serializes the final
/// transaction. Requires the signer's compressed public key for the
/// `<sig> <pubkey>` scriptSig.
pub fn reconstruct(
    intent: &TransactionIntent,
    signature: &[u8],
    options: &ReconstructOptions,
) -> Result<Vec<u8>, SignatureError> {
    let TransactionIntent::Bitcoin {
        version,
        lock_time,
        inputs,
        outputs,
        sign_input,
    } = intent
    else {
        return Err(SignatureError::InvalidIntent {
            reason: "Bitcoin codec invoked with a non-Bitcoin intent".to_string(),
        });
    };

    if signature.len() != 64 {
        return Err(SignatureError::InvalidSignatureLength {
            expected: 64,
            actual: signature.len(),
        });
    }
    let public_key = options
        .public_key
        .as_ref()
        .ok_or_else(|| SignatureError::InvalidIntent {
            reason: "Bitcoin reconstruction requires the signer public key".to_string(),
        })?;

    let der = der_encode(&signature[0..32], &signature[32..64]);

    // scriptSig: <DER sig + sighash byte> <compressed pubkey>
    let mut script_sig = Vec::with_capacity(der.len() + public_key.len() + 3);
    script_sig.push((der.len() + 1) as u8);
    script_sig.extend_from_slice(&der);
    script_sig.push(SIGHASH_ALL);
    script_sig.push(public_key.len() as u8);
    script_sig.extend_from_slice(public_key);

    Ok(serialize_with_scripts(
        *version,
        *lock_time,
        inputs,
        outputs,
        |i| {
            if i == *sign_input {
                script_sig.clone()
            } else {
                Vec::new()
            }
        },
    ))
}

/// DER-encodes a raw `(r, s)` pair: leading zeros stripped, a zero byte
/// prepended when the high bit is set, wrapped in the ASN.1 SEQUENCE form.
fn der_encode(r: &[u8], s: &[u8]) -> Vec<u8> {
    fn der_integer(bytes: &[u8]) -> Vec<u8> {
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        let mut value = bytes[first..].to_vec();
        if value.is_empty() || value[0] & 0x80 != 0 {
            value.insert(0, 0x00);
        }
        let mut out = Vec::with_capacity(value.len() + 2);
        out.push(0x02);
        out.push(value.len() as u8);
        out.extend_from_slice(&value);
        out
    }

    let r_der = der_integer(r);
    let s_der = der_integer(s);
    let mut out = Vec::with_capacity(r_der.len() + s_der.len() + 2);
    out.push(0x30);
    out.push((r_der.len() + s_der.len()) as u8);
    out.extend_from_slice(&r_der);
    out.extend_from_slice(&s_der);
    out
}
