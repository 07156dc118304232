//! Per-order serialized order store.
//!
//! Orders live behind an `Arc<Mutex<_>>` each, so mutations on one order are
//! serialized while different orders proceed in parallel. The outer map lock
//! is held only long enough to insert or clone an entry handle, never across
//! an order mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::SwapError;
use crate::order::{Order, OrderStatus};

/// In-memory order store keyed by order id.
#[derive(Default)]
pub struct OrderStore {
    orders: RwLock<HashMap<String, Arc<Mutex<Order>>>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new order, rejecting duplicate ids.
    pub async fn insert(&self, order: Order) -> Result<(), SwapError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_id) {
            return Err(SwapError::DuplicateOrder {
                order_id: order.order_id,
            });
        }
        orders.insert(order.order_id.clone(), Arc::new(Mutex::new(order)));
        Ok(())
    }

    /// Returns the lock handle for an order. The caller locks it for the
    /// duration of one mutation.
    pub async fn entry(&self, order_id: &str) -> Result<Arc<Mutex<Order>>, SwapError> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| SwapError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    /// Returns a snapshot of an order.
    pub async fn get(&self, order_id: &str) -> Result<Order, SwapError> {
        let entry = self.entry(order_id).await?;
        let order = entry.lock().await;
        Ok(order.clone())
    }

    /// Returns snapshots of all orders currently in the given status.
    pub async fn orders_by_status(&self, status: OrderStatus) -> Vec<Order> {
        let handles: Vec<Arc<Mutex<Order>>> =
            self.orders.read().await.values().cloned().collect();
        let mut matching = Vec::new();
        for handle in handles {
            let order = handle.lock().await;
            if order.status == status {
                matching.push(order.clone());
            }
        }
        matching
    }

    /// Number of orders in the store.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}
