// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! EIP-1193 style wallet seam. The session manager only talks to wallets
//! through [`WalletProvider`], so the in-process [`LocalWallet`] and test
//! doubles are interchangeable.
//!
//! [`LocalWallet`]: crate::network::local_wallet::LocalWallet

use alloy::primitives::{Address, Bytes, U256};
use alloy::transports::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::constants::{CODE_INTERNAL, CODE_USER_REJECTED};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("wallet error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn user_rejected() -> Self {
        Self::new(CODE_USER_REJECTED, "User rejected the request.")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CODE_INTERNAL, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == CODE_USER_REJECTED
    }

    /// Keep the node's JSON-RPC error body (code, message, revert data) when
    /// there is one; anything else is a transport failure.
    pub fn from_transport(err: TransportError) -> Self {
        if let Some(payload) = err.as_error_resp() {
            let data = payload
                .data
                .as_ref()
                .and_then(|raw| serde_json::from_str::<Value>(raw.get()).ok());
            return Self {
                code: payload.code,
                message: payload.message.to_string(),
                data,
            };
        }
        Self::internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// `wallet_switchEthereumChain` parameter object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParams {
    pub chain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `wallet_addEthereumChain` parameter object (EIP-3085).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

/// `eth_sendTransaction` parameter object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionParams {
    pub from: Address,
    pub to: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

/// Pull the first positional parameter object out of a request.
pub fn first_param<T: for<'de> Deserialize<'de>>(params: &Value) -> Result<T, ProviderRpcError> {
    let first = params
        .as_array()
        .and_then(|items| items.first())
        .cloned()
        .ok_or_else(|| {
            ProviderRpcError::new(crate::domain::constants::CODE_INVALID_PARAMS, "missing params")
        })?;
    serde_json::from_value(first).map_err(|e| {
        ProviderRpcError::new(
            crate::domain::constants::CODE_INVALID_PARAMS,
            format!("invalid params: {e}"),
        )
    })
}
