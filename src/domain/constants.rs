// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, address};

// =============================================================================
// NETWORK CONSTANTS
// =============================================================================

pub const CHAIN_MONAD: u64 = 143;
pub const CHAIN_MONAD_HEX: &str = "0x8f";
pub const CHAIN_MONAD_NAME: &str = "Monad";
pub const MONAD_PUBLIC_RPC: &str = "https://rpc.monad.xyz";
pub const MONAD_EXPLORER: &str = "https://monadexplorer.com";

pub const NATIVE_SYMBOL: &str = "MON";
pub const NATIVE_DECIMALS: u8 = 18;

// =============================================================================
// DEPLOYMENTS
// =============================================================================

pub const VIN_TOKEN: Address = address!("038A2f1abe221d403834aa775669169Ef5eb120A");
pub const VIN_SWAP: Address = address!("73a8C8Bf994A53DaBb9aE707cD7555DFD1909fbB");
pub const VIN_DICE: Address = address!("B8D7D799eE31FedD38e63801419782E8110326E4");
pub const VIN_LOTTO: Address = address!("59348366C6724EbBB16d429A2af57cC0b2E34A75");

pub const TOKEN_SYMBOL: &str = "VIN";
/// Used until `decimals()` resolves.
pub const FALLBACK_TOKEN_DECIMALS: u8 = 18;

// =============================================================================
// UI / PRODUCT CONSTANTS
// =============================================================================

/// Fixed rate used for speculative swap previews: 1 VIN = 100 MON.
pub const MON_PER_VIN: u64 = 100;

/// Default approval size, in whole VIN.
pub const DEFAULT_APPROVE_VIN: &str = "1000000";

/// Native amount kept back by "swap max" to pay for gas.
pub const SWAP_MAX_GAS_BUFFER_MON: &str = "0.001";

pub const LOTTO_MAX_NUMBER: u8 = 99;
pub const LOTTO_DRAWS: usize = 27;

pub const COINGECKO_MONAD_USD: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=monad&vs_currencies=usd";
pub const COINGECKO_MONAD_ID: &str = "monad";

// =============================================================================
// WALLET / RPC ERROR CODES (EIP-1193, EIP-1474)
// =============================================================================

pub const CODE_USER_REJECTED: i64 = 4001;
pub const CODE_UNAUTHORIZED: i64 = 4100;
pub const CODE_UNSUPPORTED_METHOD: i64 = 4200;
pub const CODE_DISCONNECTED: i64 = 4900;
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;
pub const CODE_EXECUTION_REVERTED: i64 = 3;
pub const CODE_INVALID_PARAMS: i64 = -32602;
pub const CODE_INTERNAL: i64 = -32603;
pub const CODE_SERVER: i64 = -32000;

// =============================================================================
// GAS & TRANSACTION CONSTANTS
// =============================================================================

/// Estimated gas is padded by this many basis points before signing.
pub const GAS_LIMIT_BUFFER_BPS: u64 = 12_000;
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;
pub const DEFAULT_PRIORITY_FEE_WEI: u128 = 2_000_000_000;
pub const DEFAULT_BASE_FEE_WEI: u128 = 50_000_000_000;

pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;
pub const MIN_RECEIPT_POLL_MS: u64 = 1;
pub const DEFAULT_PRICE_POLL_SECS: u64 = 60;
pub const MIN_PRICE_POLL_SECS: u64 = 10;

pub fn chain_id_hex(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}
