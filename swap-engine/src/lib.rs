//! Swap Engine Library
//!
//! HTLC order state machine for cross-chain atomic swaps: order lifecycle
//! with hashlock/timelock enforcement, a destination-chain adapter registry,
//! lifecycle event broadcasting, and destination-leg execution through the
//! MPC chain-signature subsystem.

pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod order;
pub mod registry;

// Re-export commonly used types
pub use config::{ChainFamily, EngineChainEntry, EngineConfig};
pub use error::SwapError;
pub use events::OrderEvent;
pub use execution::{DestinationExecutor, ExecutionResult, LegContext};
pub use order::{
    Clock, CreateOrderParams, Order, OrderStatus, RefundReceipt, SwapEngine, Transfer,
    TransferKind, TransferReceipt,
};
pub use registry::{AdapterRegistry, ChainAdapter, ChainInfo, OrderParams, ValidationResult};
