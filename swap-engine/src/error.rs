//! Error types for the swap engine.
//!
//! Every variant carries the context an operator needs to act on the failure
//! (order id, chain id, expected vs actual values). Validation errors leave
//! order state and escrow untouched; the caller can always retry with fixed
//! inputs.

use chain_signatures::SignatureError;
use thiserror::Error;

use crate::order::OrderStatus;

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Invalid hashlock: expected a 32-byte SHA-256 digest, got {actual_len} bytes")]
    InvalidHashlock { actual_len: usize },

    #[error("Invalid timelock {timelock}: must be strictly in the future (now is {now})")]
    InvalidTimelock { timelock: u64, now: u64 },

    #[error("Destination chain {chain_id} is not supported")]
    ChainNotSupported { chain_id: u64 },

    #[error("Order {order_id} not found")]
    OrderNotFound { order_id: String },

    #[error("Order {order_id} already exists")]
    DuplicateOrder { order_id: String },

    #[error("Order {order_id} is not open for matching (status {status:?})")]
    OrderNotCreated {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Order {order_id} is not matched (status {status:?})")]
    OrderNotMatched {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Order {order_id} is already finalized")]
    OrderAlreadyClaimed { order_id: String },

    #[error("Preimage hash mismatch for order {order_id}: expected {expected}, got {actual}")]
    HashMismatch {
        order_id: String,
        expected: String,
        actual: String,
    },

    #[error("Timelock for order {order_id} expired at {timelock} (now is {now})")]
    TimelockExpired {
        order_id: String,
        timelock: u64,
        now: u64,
    },

    #[error("Timelock for order {order_id} has not expired yet (expires at {timelock}, now is {now})")]
    TimelockNotExpired {
        order_id: String,
        timelock: u64,
        now: u64,
    },

    #[error("Resolver {address} is not authorized")]
    UnauthorizedResolver { address: String },

    #[error("Insufficient deposit: required {required}, attached {attached}")]
    InsufficientDeposit { required: u128, attached: u128 },

    #[error("Insufficient safety deposit: required {required}, attached {attached}")]
    InsufficientSafetyDeposit { required: u128, attached: u128 },

    #[error("Chain {chain_id} is already registered")]
    ChainAlreadyRegistered { chain_id: u64 },

    #[error("Adapter reports chain {actual} but was registered for chain {expected}")]
    AdapterChainMismatch { expected: u64, actual: u64 },

    #[error("Adapter for chain {chain_id} is inactive")]
    AdapterInactive { chain_id: u64 },

    #[error("Caller {caller} is not the owner")]
    NotRegistryOwner { caller: String },

    #[error("Invalid order parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Signature request failed: {0}")]
    Signature(#[from] SignatureError),
}
