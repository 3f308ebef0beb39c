// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::model::ContractId;
use alloy::primitives::U256;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("External API error: {provider} responded with {status}")]
    ApiCall { provider: String, status: u16 },

    #[error("Validation failed for field {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Address {0} is invalid or not checksummed")]
    InvalidAddress(String),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Failure taxonomy shared by the session manager and every action coordinator.
///
/// `Validation` and `ApprovalRequired` are produced before anything is sent to
/// the network. A missing or malformed result event is not an error here; the
/// coordinators report it as `Outcome::ConfirmedUnknown`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("no wallet provider available")]
    WalletUnavailable,

    #[error("request rejected in wallet")]
    UserRejected,

    #[error("wallet is on chain {actual:?}, expected {expected}")]
    WrongChain { expected: u64, actual: Option<u64> },

    #[error("wallet not connected")]
    NotConnected,

    #[error("approval required for {spender:?}: need {required}, allowance {allowance}")]
    ApprovalRequired {
        spender: ContractId,
        required: U256,
        allowance: U256,
    },

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("insufficient funds for transaction")]
    InsufficientFunds,

    #[error("contract reverted{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    ContractReverted { reason: Option<String> },

    #[error("rpc failure: {0}")]
    Rpc(String),
}

impl ActionError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for failures that never touched the network.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            ActionError::Validation { .. } | ActionError::ApprovalRequired { .. }
        )
    }
}

/// The transaction confirmed but its result event was missing or unreadable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("event decode failed: {0}")]
pub struct EventDecodeFailed(pub String);
