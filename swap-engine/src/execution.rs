//! Destination-leg execution.
//!
//! The coupling point between the order state machine and the MPC signing
//! subsystem: for a matched order, build the destination transaction intent,
//! derive the custody address for the swap's derivation path, and request a
//! signature. The signed transaction bytes are returned to the caller and
//! never broadcast from here. A response that arrives after the order has
//! left `Matched` is discarded, not applied.

use std::sync::Arc;

use chain_signatures::intent::{SolanaAccountMeta, SolanaInstruction, TransactionIntent};
use chain_signatures::{DerivedAddress, SignatureManager};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ChainFamily;
use crate::error::SwapError;
use crate::order::{Order, OrderStatus, SwapEngine};
use crate::registry::adapters::NATIVE_TOKEN;

/// ERC-20 `transfer(address,uint256)` selector.
const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// Solana system program id (all zeros).
const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];
/// System program instruction index for a lamport transfer.
const SYSTEM_TRANSFER_INDEX: u32 = 2;

/// Chain state the core cannot know on its own; the caller supplies it from
/// its chain clients.
#[derive(Debug, Clone)]
pub struct LegContext {
    /// Next nonce of the derived custody account (EVM)
    pub nonce: u64,
    /// Gas price in wei (EVM)
    pub gas_price: u128,
    /// Recent blockhash (Solana)
    pub recent_blockhash: [u8; 32],
}

/// A signed destination-leg transaction, ready for the broadcast layer.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub order_id: String,
    pub request_id: String,
    pub derived_address: DerivedAddress,
    pub signed_transaction: Vec<u8>,
    pub latency_ms: u64,
}

/// Executes destination legs for matched orders.
pub struct DestinationExecutor {
    engine: Arc<SwapEngine>,
    signatures: Arc<SignatureManager>,
}

impl DestinationExecutor {
    pub fn new(engine: Arc<SwapEngine>, signatures: Arc<SignatureManager>) -> Self {
        Self { engine, signatures }
    }

    /// Derivation path for a swap's custody key. One path per order keeps
    /// destination keys separated.
    pub fn derivation_path(order_id: &str) -> String {
        format!("swap-{order_id}")
    }

    /// Builds the destination intent for a matched order and requests the
    /// signature.
    pub async fn execute_leg(
        &self,
        order_id: &str,
        context: &LegContext,
    ) -> Result<ExecutionResult, SwapError> {
        let order = self.require_matched(order_id).await?;
        let intent = self.build_intent(&order, context).await?;
        self.execute_intent(order_id, &intent).await
    }

    /// Requests a signature for a caller-built destination intent. Used for
    /// chain families whose intents need chain state beyond `LegContext`
    /// (Bitcoin UTXO sets in particular).
    pub async fn execute_intent(
        &self,
        order_id: &str,
        intent: &TransactionIntent,
    ) -> Result<ExecutionResult, SwapError> {
        let order = self.require_matched(order_id).await?;
        let path = Self::derivation_path(order_id);
        let request_id = Uuid::new_v4().to_string();

        let response = self
            .signatures
            .request_signature(&request_id, order.destination_chain_id, &path, intent)
            .await?;

        // The order may have been cancelled while the signature was in
        // flight; a stale signed transaction must never leave the core.
        let current = self.engine.get_order(order_id).await?;
        if current.status != OrderStatus::Matched {
            warn!(
                order_id,
                status = ?current.status,
                "Discarding signed destination leg for an order no longer matched"
            );
            return Err(SwapError::OrderNotMatched {
                order_id: order_id.to_string(),
                status: current.status,
            });
        }

        info!(
            order_id,
            request_id = %response.request_id,
            latency_ms = response.latency_ms,
            "Destination leg signed"
        );
        Ok(ExecutionResult {
            order_id: order_id.to_string(),
            request_id: response.request_id,
            derived_address: response.derived_address,
            signed_transaction: response.signed_transaction,
            latency_ms: response.latency_ms,
        })
    }

    async fn require_matched(&self, order_id: &str) -> Result<Order, SwapError> {
        let order = self.engine.get_order(order_id).await?;
        if order.status != OrderStatus::Matched {
            return Err(SwapError::OrderNotMatched {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }
        Ok(order)
    }

    /// Builds the destination transfer intent for the order's chain family.
    async fn build_intent(
        &self,
        order: &Order,
        context: &LegContext,
    ) -> Result<TransactionIntent, SwapError> {
        let family = self
            .engine
            .registry()
            .get(order.destination_chain_id)
            .await?
            .chain_info()
            .family;

        match family {
            ChainFamily::Evm => evm_transfer_intent(order, context),
            ChainFamily::Solana => {
                let path = Self::derivation_path(&order.order_id);
                let fee_payer = self
                    .signatures
                    .derive_address(order.destination_chain_id, &path)?;
                solana_transfer_intent(order, context, &fee_payer)
            }
            ChainFamily::Near | ChainFamily::Bitcoin | ChainFamily::Cosmos => {
                Err(SwapError::InvalidParams {
                    reason: format!(
                        "no built-in destination intent for {family:?}; build one and call execute_intent"
                    ),
                })
            }
        }
    }
}

fn evm_transfer_intent(order: &Order, context: &LegContext) -> Result<TransactionIntent, SwapError> {
    let recipient = parse_evm_address(&order.destination_address)?;

    let (to, value, data, gas_limit) = if order.destination_token == NATIVE_TOKEN {
        (recipient, order.destination_amount, Vec::new(), 21_000)
    } else {
        let token = parse_evm_address(&order.destination_token)?;
        let mut data = Vec::with_capacity(4 + 32 + 32);
        data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&recipient);
        let mut amount = [0u8; 32];
        amount[16..].copy_from_slice(&order.destination_amount.to_be_bytes());
        data.extend_from_slice(&amount);
        (token, 0, data, 65_000)
    };

    Ok(TransactionIntent::Evm {
        chain_id: order.destination_chain_id,
        nonce: context.nonce,
        gas_price: context.gas_price,
        gas_limit,
        to: Some(to),
        value,
        data,
    })
}

fn solana_transfer_intent(
    order: &Order,
    context: &LegContext,
    fee_payer: &DerivedAddress,
) -> Result<TransactionIntent, SwapError> {
    let recipient: [u8; 32] = bs58::decode(&order.destination_address)
        .into_vec()
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| SwapError::InvalidParams {
            reason: format!(
                "destination address '{}' is not a Solana public key",
                order.destination_address
            ),
        })?;
    let lamports =
        u64::try_from(order.destination_amount).map_err(|_| SwapError::InvalidParams {
            reason: "destination amount exceeds the lamport range".to_string(),
        })?;
    let payer: [u8; 32] =
        fee_payer
            .public_key
            .as_slice()
            .try_into()
            .map_err(|_| SwapError::InvalidParams {
                reason: "derived fee payer is not a 32-byte key".to_string(),
            })?;

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Ok(TransactionIntent::Solana {
        fee_payer: payer,
        recent_blockhash: context.recent_blockhash,
        instructions: vec![SolanaInstruction {
            program_id: SYSTEM_PROGRAM_ID,
            accounts: vec![
                SolanaAccountMeta {
                    pubkey: payer,
                    is_signer: true,
                    is_writable: true,
                },
                SolanaAccountMeta {
                    pubkey: recipient,
                    is_signer: false,
                    is_writable: true,
                },
            ],
            data,
        }],
    })
}

fn parse_evm_address(address: &str) -> Result<[u8; 20], SwapError> {
    hex::decode(address.trim_start_matches("0x"))
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| SwapError::InvalidParams {
            reason: format!("'{address}' is not a 20-byte EVM address"),
        })
}
