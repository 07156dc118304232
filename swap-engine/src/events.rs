//! Order lifecycle events.
//!
//! The engine publishes state-change snapshots on a `tokio::sync::broadcast`
//! channel. Consumers subscribe; the engine never calls back into consumer
//! code and never blocks on a slow subscriber. A send with no subscribers is
//! a no-op, the channel is observability, not control flow.

use serde::{Deserialize, Serialize};

use crate::order::Order;

/// Capacity of the broadcast channel; a lagging subscriber loses the oldest
/// events, never stalls the engine.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One order lifecycle transition, carrying the post-transition snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
    /// Escrow locked, order open for matching
    Created { order: Order },
    /// Resolver committed with a safety deposit
    Matched { order: Order },
    /// Preimage verified and funds released
    Claimed { order: Order, preimage: [u8; 32] },
    /// Timelock expired and funds refunded
    Cancelled { order: Order },
}

impl OrderEvent {
    /// Order id the event belongs to.
    pub fn order_id(&self) -> &str {
        match self {
            OrderEvent::Created { order }
            | OrderEvent::Matched { order }
            | OrderEvent::Claimed { order, .. }
            | OrderEvent::Cancelled { order } => &order.order_id,
        }
    }
}
