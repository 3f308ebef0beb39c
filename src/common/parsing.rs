// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::{Address, U256};
use serde_json::Value;
use std::str::FromStr;

pub fn parse_boolish(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

pub fn parse_hex_bytes(s: &str) -> Option<Vec<u8>> {
    hex::decode(strip_0x(s)).ok()
}

pub fn parse_address_hex(s: &str) -> Option<Address> {
    Address::from_str(strip_0x(s)).ok()
}

pub fn parse_u64_hex(s: &str) -> Option<u64> {
    u64::from_str_radix(strip_0x(s), 16).ok()
}

pub fn parse_u256_hex(s: &str) -> Option<U256> {
    U256::from_str_radix(strip_0x(s), 16).ok()
}

/// Wallets answer `eth_chainId` with a hex string; some legacy ones send a number.
pub fn chain_id_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => parse_u64_hex(s),
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// `eth_accounts` / `eth_requestAccounts` result, skipping malformed entries.
pub fn accounts_from_value(value: &Value) -> Vec<Address> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(parse_address_hex)
                .collect()
        })
        .unwrap_or_default()
}
