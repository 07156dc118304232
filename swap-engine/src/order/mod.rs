//! Order records and settlement receipts.
//!
//! An order is a hashlock/timelock escrow on the source side of a cross-chain
//! swap. The hashlock and timelock are immutable once the order exists; the
//! resolver slot is written exactly once at match time, and the preimage only
//! at claim time after hash verification. Receipts spell out the exact fund
//! movements a settlement releases, so the escrow layer above can apply them
//! all-or-nothing.

pub mod engine;
pub mod store;

use serde::{Deserialize, Serialize};

pub use engine::{Clock, SwapEngine};
pub use store::OrderStore;

// ============================================================================
// ORDER RECORD
// ============================================================================

/// Lifecycle state of an order. `Claimed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Escrow locked, waiting for a resolver
    Created,
    /// Resolver committed with a safety deposit
    Matched,
    /// Preimage revealed, funds released
    Claimed,
    /// Timelock expired, funds refunded
    Cancelled,
}

impl OrderStatus {
    /// Whether the order can never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Claimed | OrderStatus::Cancelled)
    }
}

/// One cross-chain swap order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Caller-chosen unique identifier
    pub order_id: String,
    /// SHA-256 commitment to the secret, immutable
    pub hashlock: [u8; 32],
    /// Absolute expiry in unix seconds, immutable
    pub timelock: u64,
    /// Account that locked the escrow
    pub maker: String,
    /// Resolver committed at match time, written exactly once
    pub resolver: Option<String>,
    /// Escrowed principal on the source side
    pub source_amount: u128,
    /// Fee released to the resolver on claim
    pub resolver_fee: u128,
    /// Safety deposit locked by the resolver at match time
    pub safety_deposit: u128,
    /// Destination chain the resolver must deliver on
    pub destination_chain_id: u64,
    /// Destination address the maker designated
    pub destination_address: String,
    /// Destination token ("native" for the chain's base asset)
    pub destination_token: String,
    /// Amount the resolver must deliver, in destination base units
    pub destination_amount: u128,
    /// Current lifecycle state
    pub status: OrderStatus,
    /// Revealed secret, set only on claim after hash verification
    pub preimage: Option<[u8; 32]>,
    /// Creation time in unix seconds
    pub created_at: u64,
}

/// Parameters for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderParams {
    pub order_id: String,
    /// Hex-encoded 32-byte SHA-256 digest of the secret
    pub hashlock: String,
    /// Absolute expiry in unix seconds
    pub timelock: u64,
    pub maker: String,
    pub source_amount: u128,
    pub resolver_fee: u128,
    pub destination_chain_id: u64,
    pub destination_address: String,
    pub destination_token: String,
    /// Amount owed on the destination leg, in destination base units
    pub destination_amount: u128,
}

// ============================================================================
// SETTLEMENT RECEIPTS
// ============================================================================

/// What a released amount pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    /// The escrowed principal
    Principal,
    /// The resolver's fee
    ResolverFee,
    /// The resolver's safety deposit
    SafetyDeposit,
}

/// One fund movement inside a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: String,
    pub amount: u128,
    pub kind: TransferKind,
}

/// Settlement of a successful claim. The transfers form one atomic release
/// set: all of them happen or none do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub order_id: String,
    /// The verified secret that unlocked the hashlock
    pub preimage: [u8; 32],
    pub transfers: Vec<Transfer>,
}

/// Settlement of a cancellation after timelock expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub order_id: String,
    pub refunds: Vec<Transfer>,
}
