//! Abstract transaction intents.
//!
//! A `TransactionIntent` describes what should happen on a destination chain
//! without committing to that chain's byte layout. The codec module turns an
//! intent into the exact payload the MPC signer must sign, and later
//! reconstructs a broadcastable transaction from the raw signature. The sum
//! type is matched exhaustively, so adding a chain family is a
//! compiler-checked exercise.

use serde::{Deserialize, Serialize};

/// Signature scheme used by a chain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// secp256k1 ECDSA (EVM chains, Bitcoin)
    Secp256k1,
    /// Ed25519 (Solana, NEAR)
    Ed25519,
}

/// How the recovery byte of an EVM signature is normalized during
/// reconstruction. Carried in chain configuration rather than hard-coded:
/// some MPC backends return a pre-normalized v while others return the bare
/// recovery id, and applying the EIP-155 offset twice produces an invalid
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VNormalization {
    /// Apply the EIP-155 offset: `v = recovery_id + chain_id * 2 + 35`.
    Eip155,
    /// Use the supplied recovery byte verbatim.
    AlreadyNormalized,
}

/// One transaction input on a Bitcoin-family chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinInput {
    /// Transaction id of the output being spent (display order, big-endian)
    pub txid: [u8; 32],
    /// Output index within that transaction
    pub vout: u32,
    /// Script code used when computing the sighash for this input
    /// (the previous output's scriptPubKey for P2PKH spends)
    pub script_code: Vec<u8>,
    /// Sequence number
    pub sequence: u32,
}

/// One transaction output on a Bitcoin-family chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinOutput {
    /// Value in satoshis
    pub value: u64,
    /// Locking script
    pub script_pubkey: Vec<u8>,
}

/// Account reference inside a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaAccountMeta {
    /// 32-byte account key
    pub pubkey: [u8; 32],
    /// Whether the account must sign the transaction
    pub is_signer: bool,
    /// Whether the account may be written to
    pub is_writable: bool,
}

/// One instruction inside a Solana message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaInstruction {
    /// Program to invoke
    pub program_id: [u8; 32],
    /// Accounts passed to the program
    pub accounts: Vec<SolanaAccountMeta>,
    /// Instruction data
    pub data: Vec<u8>,
}

/// Chain-family-specific description of a destination transaction.
///
/// Identical intents must always serialize to identical signing payloads;
/// everything that influences the payload is an explicit field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionIntent {
    /// EVM legacy transaction (9-field RLP tuple, EIP-155 replay protection)
    Evm {
        chain_id: u64,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        /// `None` for contract creation
        to: Option<[u8; 20]>,
        value: u128,
        data: Vec<u8>,
    },
    /// Bitcoin legacy transaction; exactly one input is signed per request
    Bitcoin {
        version: u32,
        lock_time: u32,
        inputs: Vec<BitcoinInput>,
        outputs: Vec<BitcoinOutput>,
        /// Index of the input the signature request covers
        sign_input: usize,
    },
    /// Solana message with a single fee-payer signer
    Solana {
        fee_payer: [u8; 32],
        recent_blockhash: [u8; 32],
        instructions: Vec<SolanaInstruction>,
    },
}

impl TransactionIntent {
    /// Signature scheme implied by the intent's chain family.
    pub fn scheme(&self) -> SignatureScheme {
        match self {
            TransactionIntent::Evm { .. } | TransactionIntent::Bitcoin { .. } => {
                SignatureScheme::Secp256k1
            }
            TransactionIntent::Solana { .. } => SignatureScheme::Ed25519,
        }
    }

    /// Raw-signature length the codec expects for this intent.
    pub fn expected_signature_len(&self) -> usize {
        match self {
            // r (32) || s (32) || recovery byte
            TransactionIntent::Evm { .. } => 65,
            // r (32) || s (32)
            TransactionIntent::Bitcoin { .. } => 64,
            TransactionIntent::Solana { .. } => 64,
        }
    }
}
