//! Concrete destination-chain adapters, one per chain family.
//!
//! Each adapter owns its address grammar, a basis-points safety-deposit
//! floor, and a flat execution-cost model in the chain's native unit. The
//! cost models are deliberately coarse; they size deposits and budgets, they
//! do not replace live fee estimation.

use std::sync::Arc;

use crate::config::ChainFamily;
use crate::registry::{ChainAdapter, ChainInfo, OrderParams, ValidationResult};

/// Token sentinel for the chain's base asset.
pub const NATIVE_TOKEN: &str = "native";

/// Builds the adapter for a chain family.
pub fn for_family(
    family: ChainFamily,
    chain_id: u64,
    name: &str,
    min_safety_deposit_bps: u32,
) -> Arc<dyn ChainAdapter> {
    match family {
        ChainFamily::Evm => Arc::new(EvmAdapter::new(chain_id, name, min_safety_deposit_bps)),
        ChainFamily::Near => Arc::new(NearAdapter::new(chain_id, name, min_safety_deposit_bps)),
        ChainFamily::Solana => Arc::new(SolanaAdapter::new(chain_id, name, min_safety_deposit_bps)),
        ChainFamily::Bitcoin => {
            Arc::new(BitcoinAdapter::new(chain_id, name, min_safety_deposit_bps))
        }
        ChainFamily::Cosmos => Arc::new(CosmosAdapter::new(chain_id, name, min_safety_deposit_bps)),
    }
}

fn bps_floor(amount: u128, bps: u32) -> u128 {
    let bps = u128::from(bps);
    // Split so the product cannot overflow for any in-range amount; an
    // out-of-range floor saturates to an unmatchable deposit requirement.
    (amount / 10_000)
        .saturating_mul(bps)
        .saturating_add(amount % 10_000 * bps / 10_000)
}

/// Parameter checks shared by every family.
fn common_validation(adapter: &dyn ChainAdapter, params: &OrderParams) -> Vec<String> {
    let mut issues = Vec::new();
    if !adapter.validate_address(&params.destination_address) {
        issues.push(format!(
            "destination address '{}' is not valid for {}",
            params.destination_address,
            adapter.chain_info().name
        ));
    }
    if params.source_amount == 0 {
        issues.push("source amount must be positive".to_string());
    }
    if params.resolver_fee >= params.source_amount && params.source_amount > 0 {
        issues.push("resolver fee must be below the source amount".to_string());
    }
    if params.destination_token.is_empty() {
        issues.push("destination token must be set".to_string());
    }
    issues
}

fn result_from(issues: Vec<String>) -> ValidationResult {
    if issues.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::failed(issues)
    }
}

// ============================================================================
// EVM
// ============================================================================

#[derive(Debug)]
pub struct EvmAdapter {
    chain_id: u64,
    name: String,
    min_safety_deposit_bps: u32,
}

impl EvmAdapter {
    /// Default gas price assumption, 30 gwei.
    const GAS_PRICE_WEI: u128 = 30_000_000_000;
    const NATIVE_TRANSFER_GAS: u128 = 21_000;
    const TOKEN_TRANSFER_GAS: u128 = 65_000;

    pub fn new(chain_id: u64, name: &str, min_safety_deposit_bps: u32) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            min_safety_deposit_bps,
        }
    }
}

impl ChainAdapter for EvmAdapter {
    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            chain_id: self.chain_id,
            name: self.name.clone(),
            family: ChainFamily::Evm,
            active: true,
        }
    }

    fn validate_address(&self, address: &str) -> bool {
        let Some(body) = address.strip_prefix("0x") else {
            return false;
        };
        body.len() == 40 && body.chars().all(|c| c.is_ascii_hexdigit())
    }

    fn validate_params(&self, params: &OrderParams) -> ValidationResult {
        let mut issues = common_validation(self, params);
        if params.destination_token != NATIVE_TOKEN
            && !self.validate_address(&params.destination_token)
        {
            issues.push(format!(
                "token '{}' is not an EVM contract address",
                params.destination_token
            ));
        }
        result_from(issues)
    }

    fn min_safety_deposit(&self, amount: u128) -> u128 {
        bps_floor(amount, self.min_safety_deposit_bps)
    }

    fn estimate_execution_cost(&self, params: &OrderParams, _amount: u128) -> u128 {
        let gas = if params.destination_token == NATIVE_TOKEN {
            Self::NATIVE_TRANSFER_GAS
        } else {
            Self::TOKEN_TRANSFER_GAS
        };
        gas * Self::GAS_PRICE_WEI
    }

    fn supports_feature(&self, feature: &str) -> bool {
        matches!(feature, "token-transfer" | "contract-call")
    }
}

// ============================================================================
// NEAR
// ============================================================================

#[derive(Debug)]
pub struct NearAdapter {
    chain_id: u64,
    name: String,
    min_safety_deposit_bps: u32,
}

impl NearAdapter {
    /// Flat native transfer cost in yoctoNEAR (gas at default price).
    const TRANSFER_COST_YOCTO: u128 = 450_000_000_000_000_000_000;
    /// FT transfer plus a storage-deposit allowance.
    const TOKEN_TRANSFER_COST_YOCTO: u128 = 13_000_000_000_000_000_000_000;

    pub fn new(chain_id: u64, name: &str, min_safety_deposit_bps: u32) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            min_safety_deposit_bps,
        }
    }

    /// NEAR account-id grammar: 2 to 64 characters, dot-separated parts of
    /// lowercase alphanumerics joined by single `-` or `_` separators.
    fn is_valid_account_id(account: &str) -> bool {
        if account.len() < 2 || account.len() > 64 {
            return false;
        }
        account.split('.').all(|part| {
            if part.is_empty() {
                return false;
            }
            let bytes = part.as_bytes();
            if !bytes[0].is_ascii_lowercase() && !bytes[0].is_ascii_digit() {
                return false;
            }
            if !bytes[bytes.len() - 1].is_ascii_lowercase()
                && !bytes[bytes.len() - 1].is_ascii_digit()
            {
                return false;
            }
            let mut prev_separator = false;
            for b in bytes {
                match b {
                    b'a'..=b'z' | b'0'..=b'9' => prev_separator = false,
                    b'-' | b'_' => {
                        if prev_separator {
                            return false;
                        }
                        prev_separator = true;
                    }
                    _ => return false,
                }
            }
            true
        })
    }
}

impl ChainAdapter for NearAdapter {
    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            chain_id: self.chain_id,
            name: self.name.clone(),
            family: ChainFamily::Near,
            active: true,
        }
    }

    fn validate_address(&self, address: &str) -> bool {
        Self::is_valid_account_id(address)
    }

    fn validate_params(&self, params: &OrderParams) -> ValidationResult {
        let mut issues = common_validation(self, params);
        if params.destination_token != NATIVE_TOKEN
            && !Self::is_valid_account_id(&params.destination_token)
        {
            issues.push(format!(
                "token '{}' is not a NEAR account id",
                params.destination_token
            ));
        }
        result_from(issues)
    }

    fn min_safety_deposit(&self, amount: u128) -> u128 {
        bps_floor(amount, self.min_safety_deposit_bps)
    }

    fn estimate_execution_cost(&self, params: &OrderParams, _amount: u128) -> u128 {
        if params.destination_token == NATIVE_TOKEN {
            Self::TRANSFER_COST_YOCTO
        } else {
            Self::TOKEN_TRANSFER_COST_YOCTO
        }
    }

    fn supports_feature(&self, feature: &str) -> bool {
        matches!(feature, "token-transfer" | "contract-call" | "memo")
    }
}

// ============================================================================
// SOLANA
// ============================================================================

#[derive(Debug)]
pub struct SolanaAdapter {
    chain_id: u64,
    name: String,
    min_safety_deposit_bps: u32,
}

impl SolanaAdapter {
    /// Base fee per signature in lamports.
    const SIGNATURE_FEE_LAMPORTS: u128 = 5_000;
    /// Rent-exempt minimum for a token account that may need creating.
    const TOKEN_ACCOUNT_RENT_LAMPORTS: u128 = 2_039_280;

    pub fn new(chain_id: u64, name: &str, min_safety_deposit_bps: u32) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            min_safety_deposit_bps,
        }
    }

    fn is_valid_pubkey(address: &str) -> bool {
        bs58::decode(address)
            .into_vec()
            .map(|bytes| bytes.len() == 32)
            .unwrap_or(false)
    }
}

impl ChainAdapter for SolanaAdapter {
    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            chain_id: self.chain_id,
            name: self.name.clone(),
            family: ChainFamily::Solana,
            active: true,
        }
    }

    fn validate_address(&self, address: &str) -> bool {
        Self::is_valid_pubkey(address)
    }

    fn validate_params(&self, params: &OrderParams) -> ValidationResult {
        let mut issues = common_validation(self, params);
        if params.destination_token != NATIVE_TOKEN
            && !Self::is_valid_pubkey(&params.destination_token)
        {
            issues.push(format!(
                "token '{}' is not a Solana mint address",
                params.destination_token
            ));
        }
        result_from(issues)
    }

    fn min_safety_deposit(&self, amount: u128) -> u128 {
        bps_floor(amount, self.min_safety_deposit_bps)
    }

    fn estimate_execution_cost(&self, params: &OrderParams, _amount: u128) -> u128 {
        if params.destination_token == NATIVE_TOKEN {
            Self::SIGNATURE_FEE_LAMPORTS
        } else {
            Self::SIGNATURE_FEE_LAMPORTS + Self::TOKEN_ACCOUNT_RENT_LAMPORTS
        }
    }

    fn supports_feature(&self, feature: &str) -> bool {
        matches!(feature, "token-transfer" | "memo")
    }
}

// ============================================================================
// BITCOIN
// ============================================================================

#[derive(Debug)]
pub struct BitcoinAdapter {
    chain_id: u64,
    name: String,
    min_safety_deposit_bps: u32,
}

impl BitcoinAdapter {
    /// One-input one-output legacy spend, roughly 192 vbytes.
    const SPEND_VBYTES: u128 = 192;
    const FEE_RATE_SAT_PER_VBYTE: u128 = 10;

    pub fn new(chain_id: u64, name: &str, min_safety_deposit_bps: u32) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            min_safety_deposit_bps,
        }
    }
}

impl ChainAdapter for BitcoinAdapter {
    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            chain_id: self.chain_id,
            name: self.name.clone(),
            family: ChainFamily::Bitcoin,
            active: true,
        }
    }

    fn validate_address(&self, address: &str) -> bool {
        if address.len() < 26 || address.len() > 90 {
            return false;
        }
        // Legacy, script-hash, and bech32 prefixes for mainnet and testnet
        ["1", "3", "bc1", "m", "n", "2", "tb1"]
            .iter()
            .any(|prefix| address.starts_with(prefix))
    }

    fn validate_params(&self, params: &OrderParams) -> ValidationResult {
        let mut issues = common_validation(self, params);
        if params.destination_token != NATIVE_TOKEN {
            issues.push("Bitcoin supports only the native asset".to_string());
        }
        result_from(issues)
    }

    fn min_safety_deposit(&self, amount: u128) -> u128 {
        bps_floor(amount, self.min_safety_deposit_bps)
    }

    fn estimate_execution_cost(&self, _params: &OrderParams, _amount: u128) -> u128 {
        Self::SPEND_VBYTES * Self::FEE_RATE_SAT_PER_VBYTE
    }

    fn supports_feature(&self, feature: &str) -> bool {
        matches!(feature, "hashlock-script")
    }
}

// ============================================================================
// COSMOS
// ============================================================================

#[derive(Debug)]
pub struct CosmosAdapter {
    chain_id: u64,
    name: String,
    min_safety_deposit_bps: u32,
}

impl CosmosAdapter {
    /// Bank-send gas at the default 0.025 base-unit gas price.
    const NATIVE_SEND_COST: u128 = 2_000;
    const TOKEN_SEND_COST: u128 = 4_000;
    const BECH32_CHARSET: &'static str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

    pub fn new(chain_id: u64, name: &str, min_safety_deposit_bps: u32) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            min_safety_deposit_bps,
        }
    }

    /// Bech32 shape check: a short lowercase prefix, the `1` separator, and a
    /// data part drawn from the bech32 charset.
    fn is_bech32_shaped(address: &str) -> bool {
        let Some(separator) = address.rfind('1') else {
            return false;
        };
        let prefix = &address[..separator];
        let data = &address[separator + 1..];
        !prefix.is_empty()
            && prefix.len() <= 10
            && prefix.chars().all(|c| c.is_ascii_lowercase())
            && data.len() >= 6
            && data.chars().all(|c| Self::BECH32_CHARSET.contains(c))
    }
}

impl ChainAdapter for CosmosAdapter {
    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            chain_id: self.chain_id,
            name: self.name.clone(),
            family: ChainFamily::Cosmos,
            active: true,
        }
    }

    fn validate_address(&self, address: &str) -> bool {
        Self::is_bech32_shaped(address)
    }

    fn validate_params(&self, params: &OrderParams) -> ValidationResult {
        let issues = common_validation(self, params);
        result_from(issues)
    }

    fn min_safety_deposit(&self, amount: u128) -> u128 {
        bps_floor(amount, self.min_safety_deposit_bps)
    }

    fn estimate_execution_cost(&self, params: &OrderParams, _amount: u128) -> u128 {
        if params.destination_token == NATIVE_TOKEN {
            Self::NATIVE_SEND_COST
        } else {
            Self::TOKEN_SEND_COST
        }
    }

    fn supports_feature(&self, feature: &str) -> bool {
        matches!(feature, "token-transfer" | "memo")
    }
}
