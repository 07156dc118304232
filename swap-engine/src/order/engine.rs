//! HTLC order state machine.
//!
//! The engine owns the order store, the authorized-resolver list, and the
//! lifecycle event channel. Legal transitions only:
//! `Created -> Matched -> Claimed`, and `Created | Matched -> Cancelled` once
//! the timelock has expired. Every validation failure leaves the order and
//! its escrow untouched; the status change and the release set are computed
//! under the same per-order lock, with no suspension point while it is held.
//!
//! Timelock boundary, applied identically on both legs: claim requires
//! `now < timelock`, cancel requires `now > timelock`, and at
//! `now == timelock` neither side acts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::events::{OrderEvent, EVENT_CHANNEL_CAPACITY};
use crate::order::store::OrderStore;
use crate::order::{
    CreateOrderParams, Order, OrderStatus, RefundReceipt, Transfer, TransferKind, TransferReceipt,
};
use crate::registry::{AdapterRegistry, OrderParams};

// ============================================================================
// CLOCK
// ============================================================================

/// Time source for timelock decisions. `Manual` lets tests walk the clock
/// across the expiry boundary deterministically.
#[derive(Clone)]
pub enum Clock {
    System,
    Manual(Arc<AtomicU64>),
}

impl Clock {
    /// Current unix time in seconds.
    pub fn now(&self) -> u64 {
        match self {
            Clock::System => chrono::Utc::now().timestamp() as u64,
            Clock::Manual(seconds) => seconds.load(Ordering::SeqCst),
        }
    }

    /// Manual clock starting at the given unix time.
    pub fn manual(start: u64) -> (Self, Arc<AtomicU64>) {
        let seconds = Arc::new(AtomicU64::new(start));
        (Clock::Manual(seconds.clone()), seconds)
    }
}

// ============================================================================
// ENGINE IMPLEMENTATION
// ============================================================================

/// The order state machine.
pub struct SwapEngine {
    owner: String,
    registry: Arc<AdapterRegistry>,
    store: OrderStore,
    resolvers: RwLock<HashSet<String>>,
    events: broadcast::Sender<OrderEvent>,
    clock: Clock,
}

impl SwapEngine {
    /// Creates an engine from validated configuration and a seeded registry.
    pub fn new(config: &EngineConfig, registry: Arc<AdapterRegistry>) -> anyhow::Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            owner: config.owner.clone(),
            registry,
            store: OrderStore::new(),
            resolvers: RwLock::new(config.authorized_resolvers.iter().cloned().collect()),
            events,
            clock: Clock::System,
        })
    }

    /// Same as `new` but with an explicit time source.
    pub fn with_clock(
        config: &EngineConfig,
        registry: Arc<AdapterRegistry>,
        clock: Clock,
    ) -> anyhow::Result<Self> {
        let mut engine = Self::new(config, registry)?;
        engine.clock = clock;
        Ok(engine)
    }

    /// Subscribes to order lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------------
    // RESOLVER AUTHORIZATION
    // ------------------------------------------------------------------------

    /// Whether the account may match orders.
    pub async fn is_authorized_resolver(&self, address: &str) -> bool {
        self.resolvers.read().await.contains(address)
    }

    /// Adds a resolver to the authorized list. Owner-only.
    pub async fn add_resolver(&self, caller: &str, address: &str) -> Result<(), SwapError> {
        self.require_owner(caller)?;
        self.resolvers.write().await.insert(address.to_string());
        info!(resolver = address, "Authorized resolver added");
        Ok(())
    }

    /// Removes a resolver from the authorized list. Owner-only. Orders the
    /// resolver already matched are unaffected.
    pub async fn remove_resolver(&self, caller: &str, address: &str) -> Result<(), SwapError> {
        self.require_owner(caller)?;
        self.resolvers.write().await.remove(address);
        info!(resolver = address, "Authorized resolver removed");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // ORDER LIFECYCLE
    // ------------------------------------------------------------------------

    /// Creates an order, locking the maker's escrow.
    pub async fn create_order(
        &self,
        params: CreateOrderParams,
        attached_deposit: u128,
    ) -> Result<Order, SwapError> {
        let hashlock = decode_hashlock(&params.hashlock)?;

        let now = self.clock.now();
        if params.timelock <= now {
            return Err(SwapError::InvalidTimelock {
                timelock: params.timelock,
                now,
            });
        }

        // Adapter checks resolve the destination chain and run its
        // chain-specific validation before any state is touched.
        let adapter_params = OrderParams {
            destination_address: params.destination_address.clone(),
            destination_token: params.destination_token.clone(),
            source_amount: params.source_amount,
            resolver_fee: params.resolver_fee,
        };
        let validation = self
            .registry
            .validate_order_params(params.destination_chain_id, &adapter_params)
            .await?;
        if !validation.valid {
            return Err(SwapError::InvalidParams {
                reason: validation.issues.join("; "),
            });
        }

        if params.destination_amount == 0 {
            return Err(SwapError::InvalidParams {
                reason: "destination amount must be positive".to_string(),
            });
        }

        let required = params
            .source_amount
            .checked_add(params.resolver_fee)
            .ok_or_else(|| SwapError::InvalidParams {
                reason: "source amount plus resolver fee overflows".to_string(),
            })?;
        if attached_deposit < required {
            return Err(SwapError::InsufficientDeposit {
                required,
                attached: attached_deposit,
            });
        }

        let order = Order {
            order_id: params.order_id.clone(),
            hashlock,
            timelock: params.timelock,
            maker: params.maker,
            resolver: None,
            source_amount: params.source_amount,
            resolver_fee: params.resolver_fee,
            safety_deposit: 0,
            destination_chain_id: params.destination_chain_id,
            destination_address: params.destination_address,
            destination_token: params.destination_token,
            destination_amount: params.destination_amount,
            status: OrderStatus::Created,
            preimage: None,
            created_at: now,
        };
        self.store.insert(order.clone()).await?;

        info!(
            order_id = %order.order_id,
            maker = %order.maker,
            source_amount = order.source_amount,
            destination_chain_id = order.destination_chain_id,
            "Order created"
        );
        self.emit(OrderEvent::Created {
            order: order.clone(),
        });
        Ok(order)
    }

    /// Matches an order to an authorized resolver, locking its safety
    /// deposit.
    pub async fn match_order(
        &self,
        order_id: &str,
        resolver: &str,
        attached_safety_deposit: u128,
    ) -> Result<Order, SwapError> {
        if !self.is_authorized_resolver(resolver).await {
            return Err(SwapError::UnauthorizedResolver {
                address: resolver.to_string(),
            });
        }

        // The amount and chain are immutable, so the deposit floor can be
        // computed from a snapshot before the mutation lock is taken.
        let snapshot = self.store.get(order_id).await?;
        let required = self
            .registry
            .calculate_min_safety_deposit(snapshot.destination_chain_id, snapshot.source_amount)
            .await?;
        if attached_safety_deposit < required {
            return Err(SwapError::InsufficientSafetyDeposit {
                required,
                attached: attached_safety_deposit,
            });
        }

        let entry = self.store.entry(order_id).await?;
        let updated = {
            let mut order = entry.lock().await;
            if order.status != OrderStatus::Created {
                return Err(SwapError::OrderNotCreated {
                    order_id: order_id.to_string(),
                    status: order.status,
                });
            }
            order.resolver = Some(resolver.to_string());
            order.safety_deposit = attached_safety_deposit;
            order.status = OrderStatus::Matched;
            order.clone()
        };

        info!(
            order_id,
            resolver, safety_deposit = attached_safety_deposit, "Order matched"
        );
        self.emit(OrderEvent::Matched {
            order: updated.clone(),
        });
        Ok(updated)
    }

    /// Claims a matched order with the hashlock preimage, releasing the
    /// principal to the maker-designated destination and the fee plus safety
    /// deposit to the resolver.
    pub async fn claim_order(
        &self,
        order_id: &str,
        resolver: &str,
        preimage: [u8; 32],
    ) -> Result<TransferReceipt, SwapError> {
        let entry = self.store.entry(order_id).await?;
        let now = self.clock.now();

        let (receipt, updated) = {
            let mut order = entry.lock().await;
            if order.status.is_terminal() {
                return Err(SwapError::OrderAlreadyClaimed {
                    order_id: order_id.to_string(),
                });
            }
            if order.status != OrderStatus::Matched {
                return Err(SwapError::OrderNotMatched {
                    order_id: order_id.to_string(),
                    status: order.status,
                });
            }
            if order.resolver.as_deref() != Some(resolver) {
                return Err(SwapError::UnauthorizedResolver {
                    address: resolver.to_string(),
                });
            }
            if now >= order.timelock {
                return Err(SwapError::TimelockExpired {
                    order_id: order_id.to_string(),
                    timelock: order.timelock,
                    now,
                });
            }

            let digest: [u8; 32] = Sha256::digest(preimage).into();
            if digest != order.hashlock {
                return Err(SwapError::HashMismatch {
                    order_id: order_id.to_string(),
                    expected: hex::encode(order.hashlock),
                    actual: hex::encode(digest),
                });
            }

            order.status = OrderStatus::Claimed;
            order.preimage = Some(preimage);

            let receipt = TransferReceipt {
                order_id: order_id.to_string(),
                preimage,
                transfers: vec![
                    Transfer {
                        to: order.destination_address.clone(),
                        amount: order.source_amount,
                        kind: TransferKind::Principal,
                    },
                    Transfer {
                        to: resolver.to_string(),
                        amount: order.resolver_fee,
                        kind: TransferKind::ResolverFee,
                    },
                    Transfer {
                        to: resolver.to_string(),
                        amount: order.safety_deposit,
                        kind: TransferKind::SafetyDeposit,
                    },
                ],
            };
            (receipt, order.clone())
        };

        info!(order_id, resolver, "Order claimed");
        self.emit(OrderEvent::Claimed {
            order: updated,
            preimage,
        });
        Ok(receipt)
    }

    /// Cancels an expired order, refunding the principal and fee to the
    /// maker and the safety deposit to the resolver if one was matched.
    pub async fn cancel_order(
        &self,
        order_id: &str,
        caller: &str,
    ) -> Result<RefundReceipt, SwapError> {
        let entry = self.store.entry(order_id).await?;
        let now = self.clock.now();

        let (receipt, updated) = {
            let mut order = entry.lock().await;
            if order.status.is_terminal() {
                return Err(SwapError::OrderAlreadyClaimed {
                    order_id: order_id.to_string(),
                });
            }
            if now <= order.timelock {
                return Err(SwapError::TimelockNotExpired {
                    order_id: order_id.to_string(),
                    timelock: order.timelock,
                    now,
                });
            }

            let mut refunds = vec![
                Transfer {
                    to: order.maker.clone(),
                    amount: order.source_amount,
                    kind: TransferKind::Principal,
                },
                Transfer {
                    to: order.maker.clone(),
                    amount: order.resolver_fee,
                    kind: TransferKind::ResolverFee,
                },
            ];
            if let Some(resolver) = &order.resolver {
                refunds.push(Transfer {
                    to: resolver.clone(),
                    amount: order.safety_deposit,
                    kind: TransferKind::SafetyDeposit,
                });
            }

            order.status = OrderStatus::Cancelled;
            let receipt = RefundReceipt {
                order_id: order_id.to_string(),
                refunds,
            };
            (receipt, order.clone())
        };

        warn!(order_id, caller, "Order cancelled after timelock expiry");
        self.emit(OrderEvent::Cancelled { order: updated });
        Ok(receipt)
    }

    // ------------------------------------------------------------------------
    // QUERIES
    // ------------------------------------------------------------------------

    /// Snapshot of one order.
    pub async fn get_order(&self, order_id: &str) -> Result<Order, SwapError> {
        self.store.get(order_id).await
    }

    /// Snapshots of all orders in the given status.
    pub async fn orders_by_status(&self, status: OrderStatus) -> Vec<Order> {
        self.store.orders_by_status(status).await
    }

    fn require_owner(&self, caller: &str) -> Result<(), SwapError> {
        if caller != self.owner {
            return Err(SwapError::NotRegistryOwner {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    fn emit(&self, event: OrderEvent) {
        // No subscribers is fine; the channel is observability only.
        let _ = self.events.send(event);
    }
}

/// Decodes a hex hashlock into the 32-byte digest it must be.
fn decode_hashlock(hashlock: &str) -> Result<[u8; 32], SwapError> {
    let bytes = hex::decode(hashlock.trim_start_matches("0x"))
        .map_err(|_| SwapError::InvalidHashlock { actual_len: 0 })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| SwapError::InvalidHashlock {
            actual_len: bytes.len(),
        })
}
