// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::error::AppError;
use crate::network::wallet::ProviderRpcError;
use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, Log, TxHash, TxKind, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::eth::{TransactionInput, TransactionRequest};
use async_trait::async_trait;
use url::Url;

pub type HttpProvider = RootProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url =
            Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;

        let provider = RootProvider::new_http(url);
        Ok(provider)
    }
}

/// The parts of a mined receipt the coordinators care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

/// Read-only chain access. Independent of the wallet's active chain.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ProviderRpcError>;

    async fn native_balance(&self, account: Address) -> Result<U256, ProviderRpcError>;

    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptSummary>, ProviderRpcError>;
}

/// [`ChainReader`] over a public HTTP endpoint.
#[derive(Clone)]
pub struct RpcChainReader {
    provider: HttpProvider,
}

impl RpcChainReader {
    pub fn new(provider: HttpProvider) -> Self {
        Self { provider }
    }

    pub fn connect(rpc_url: &str) -> Result<Self, AppError> {
        Ok(Self::new(ConnectionFactory::http(rpc_url)?))
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ProviderRpcError> {
        let req = TransactionRequest {
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(input),
            ..Default::default()
        };
        self.provider
            .call(req)
            .await
            .map_err(ProviderRpcError::from_transport)
    }

    async fn native_balance(&self, account: Address) -> Result<U256, ProviderRpcError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(ProviderRpcError::from_transport)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptSummary>, ProviderRpcError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(ProviderRpcError::from_transport)?;
        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash: r.transaction_hash,
            success: r.status(),
            block_number: r.block_number,
            logs: r.inner.logs().iter().map(|l| l.inner.clone()).collect(),
        }))
    }
}
