// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::ActionError;
use crate::domain::model::ContractId;
use crate::infrastructure::data::contracts::ContractProfile;
use crate::network::provider::{ChainReader, ReceiptSummary};
use crate::network::revert::classify;
use crate::network::wallet::{TransactionParams, WalletProvider};
use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use alloy::sol_types::SolCall;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Signer side of a binding: the wallet plus the account it signs for.
#[derive(Clone)]
pub struct WriteHandle {
    pub wallet: Arc<dyn WalletProvider>,
    pub from: Address,
}

/// One logical contract. Reads always go through the public reader; writes
/// exist only while a session is connected on the target chain.
#[derive(Clone)]
pub struct ContractBinding {
    pub id: ContractId,
    pub address: Address,
    pub profile: ContractProfile,
    reader: Arc<dyn ChainReader>,
    writer: Option<WriteHandle>,
    poll: Duration,
}

impl ContractBinding {
    pub fn read_only(
        id: ContractId,
        address: Address,
        profile: ContractProfile,
        reader: Arc<dyn ChainReader>,
        poll: Duration,
    ) -> Self {
        Self {
            id,
            address,
            profile,
            reader,
            writer: None,
            poll,
        }
    }

    pub fn with_writer(mut self, wallet: Arc<dyn WalletProvider>, from: Address) -> Self {
        self.writer = Some(WriteHandle { wallet, from });
        self
    }

    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    pub fn signer(&self) -> Option<Address> {
        self.writer.as_ref().map(|w| w.from)
    }

    pub async fn read<C: SolCall>(&self, call: &C) -> Result<C::Return, ActionError> {
        let out = self
            .reader
            .call(self.address, call.abi_encode().into())
            .await
            .map_err(|e| classify(&e))?;
        C::abi_decode_returns(&out).map_err(|e| {
            ActionError::Rpc(format!("{} returned malformed data: {}", self.id, e))
        })
    }

    pub async fn native_balance(&self, account: Address) -> Result<U256, ActionError> {
        self.reader
            .native_balance(account)
            .await
            .map_err(|e| classify(&e))
    }

    pub async fn submit_call<C: SolCall>(
        &self,
        call: &C,
        value: Option<U256>,
    ) -> Result<TxHash, ActionError> {
        self.submit(call.abi_encode().into(), value).await
    }

    /// Hand the transaction to the wallet; returns once it is broadcast.
    pub async fn submit(&self, data: Bytes, value: Option<U256>) -> Result<TxHash, ActionError> {
        let writer = self.writer.as_ref().ok_or(ActionError::NotConnected)?;
        let params = TransactionParams {
            from: writer.from,
            to: self.address,
            data: Some(data),
            value,
        };
        let resp = writer
            .wallet
            .request("eth_sendTransaction", json!([params]))
            .await
            .map_err(|e| classify(&e))?;
        serde_json::from_value::<TxHash>(resp)
            .map_err(|e| ActionError::Rpc(format!("wallet returned no tx hash: {}", e)))
    }

    /// Poll until the receipt exists. There is no client-side deadline; a
    /// mined failure is reported as a revert.
    pub async fn confirm(&self, hash: TxHash) -> Result<ReceiptSummary, ActionError> {
        loop {
            match self.reader.receipt(hash).await {
                Ok(Some(receipt)) if receipt.success => return Ok(receipt),
                Ok(Some(_)) => {
                    tracing::warn!(target: "session", tx_hash = %hash, contract = %self.id, "Transaction reverted");
                    return Err(ActionError::ContractReverted { reason: None });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(target: "session", tx_hash = %hash, error = %e, "Receipt poll failed");
                }
            }
            sleep(self.poll).await;
        }
    }

    /// Logs in `receipt` emitted by this contract.
    pub fn own_logs<'a>(&self, receipt: &'a ReceiptSummary) -> impl Iterator<Item = &'a Log> {
        let address = self.address;
        receipt.logs.iter().filter(move |l| l.address == address)
    }
}
