// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::parsing::parse_hex_bytes;
use crate::domain::constants::{
    CODE_DISCONNECTED, CODE_EXECUTION_REVERTED, CODE_UNAUTHORIZED, CODE_USER_REJECTED,
};
use crate::domain::error::ActionError;
use crate::network::wallet::ProviderRpcError;
use alloy::sol_types::{Revert, SolError};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref REVERTED_WITH: Regex =
        Regex::new(r"(?i)execution reverted(?::\s*)?(.+)?").expect("static regex");
    static ref REASON_STRING: Regex =
        Regex::new(r#"(?i)reason string ['"](.+?)['"]"#).expect("static regex");
    static ref INSUFFICIENT_FUNDS: Regex =
        Regex::new(r"(?i)insufficient (funds|balance)").expect("static regex");
}

/// Best-effort revert reason. Advisory only: callers show it, never branch on it.
pub fn extract_revert_reason(err: &ProviderRpcError) -> Option<String> {
    if let Some(reason) = err.data.as_ref().and_then(reason_from_data) {
        return Some(reason);
    }
    reason_from_message(&err.message)
}

fn reason_from_data(data: &Value) -> Option<String> {
    match data {
        Value::String(hex) => {
            let bytes = parse_hex_bytes(hex)?;
            Revert::abi_decode(&bytes)
                .ok()
                .map(|r| r.reason)
                .filter(|r| !r.trim().is_empty())
        }
        // Some wallets nest the node error: { message, data: "0x08c379a0..." }
        Value::Object(map) => map
            .get("data")
            .and_then(reason_from_data)
            .or_else(|| map.get("message").and_then(Value::as_str).and_then(reason_from_message)),
        _ => None,
    }
}

fn reason_from_message(message: &str) -> Option<String> {
    if let Some(caps) = REASON_STRING.captures(message)
        && let Some(m) = caps.get(1)
    {
        return Some(m.as_str().trim().to_string());
    }
    REVERTED_WITH
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Map a wallet/node error onto the action taxonomy by code.
pub fn classify(err: &ProviderRpcError) -> ActionError {
    match err.code {
        CODE_USER_REJECTED => ActionError::UserRejected,
        CODE_UNAUTHORIZED | CODE_DISCONNECTED => ActionError::NotConnected,
        CODE_EXECUTION_REVERTED => ActionError::ContractReverted {
            reason: extract_revert_reason(err),
        },
        _ if INSUFFICIENT_FUNDS.is_match(&err.message) => ActionError::InsufficientFunds,
        _ if REVERTED_WITH.is_match(&err.message) => ActionError::ContractReverted {
            reason: extract_revert_reason(err),
        },
        _ => ActionError::Rpc(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn revert_data(reason: &str) -> String {
        let encoded = Revert {
            reason: reason.to_string(),
        }
        .abi_encode();
        format!("0x{}", hex::encode(encoded))
    }

    #[test]
    fn extracts_reason_from_message_shapes() {
        let e = ProviderRpcError::new(-32000, "execution reverted: Bet too small");
        assert_eq!(extract_revert_reason(&e).as_deref(), Some("Bet too small"));

        let e = ProviderRpcError::new(
            -32603,
            "Error: VM Exception: reverted with reason string 'Pool empty'",
        );
        assert_eq!(extract_revert_reason(&e).as_deref(), Some("Pool empty"));

        let e = ProviderRpcError::new(-32000, "execution reverted");
        assert_eq!(extract_revert_reason(&e), None);
    }

    #[test]
    fn extracts_reason_from_revert_data() {
        let e = ProviderRpcError::new(3, "execution reverted")
            .with_data(json!(revert_data("Allowance too low")));
        assert_eq!(extract_revert_reason(&e).as_deref(), Some("Allowance too low"));

        let nested = ProviderRpcError::new(-32603, "Internal JSON-RPC error.")
            .with_data(json!({ "message": "x", "data": revert_data("Paused") }));
        assert_eq!(extract_revert_reason(&nested).as_deref(), Some("Paused"));
    }

    #[test]
    fn classify_by_code() {
        assert_eq!(
            classify(&ProviderRpcError::user_rejected()),
            ActionError::UserRejected
        );
        assert_eq!(
            classify(&ProviderRpcError::new(3, "execution reverted: nope")),
            ActionError::ContractReverted {
                reason: Some("nope".into())
            }
        );
        assert_eq!(
            classify(&ProviderRpcError::new(
                -32000,
                "insufficient funds for gas * price + value"
            )),
            ActionError::InsufficientFunds
        );
        assert!(matches!(
            classify(&ProviderRpcError::new(-32005, "rate limited")),
            ActionError::Rpc(_)
        ));
    }
}
