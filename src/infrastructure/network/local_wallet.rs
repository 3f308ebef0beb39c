// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::error::AppError;
use crate::common::parsing::{parse_boolish, parse_u64_hex};
use crate::common::units::{format_amount, short_addr};
use crate::domain::constants::{
    CODE_INVALID_PARAMS, CODE_UNAUTHORIZED, CODE_UNRECOGNIZED_CHAIN, CODE_UNSUPPORTED_METHOD,
    NATIVE_DECIMALS, chain_id_hex,
};
use crate::network::gas::{GasOracle, buffered_gas_limit};
use crate::network::nonce::NonceManager;
use crate::network::provider::{ConnectionFactory, HttpProvider};
use crate::network::wallet::{
    AddChainParams, ProviderRpcError, SwitchChainParams, TransactionParams, WalletEvent,
    WalletProvider, first_param,
};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Signature, TxKind, U256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::{TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// What the wallet does when a request needs the user's approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsentPolicy {
    /// Ask on the terminal.
    #[default]
    Prompt,
    Approve,
    Reject,
}

impl FromStr for ConsentPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" | "ask" => Ok(ConsentPolicy::Prompt),
            "approve" | "auto" | "yes" => Ok(ConsentPolicy::Approve),
            "reject" | "deny" | "no" => Ok(ConsentPolicy::Reject),
            other => Err(AppError::Config(format!("Unknown consent policy '{other}'"))),
        }
    }
}

impl fmt::Display for ConsentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentPolicy::Prompt => f.write_str("prompt"),
            ConsentPolicy::Approve => f.write_str("approve"),
            ConsentPolicy::Reject => f.write_str("reject"),
        }
    }
}

#[derive(Clone)]
struct ChainHandle {
    name: String,
    provider: HttpProvider,
    nonce: NonceManager,
    gas: GasOracle,
}

impl ChainHandle {
    fn open(name: &str, rpc_url: &str, owner: Address) -> Result<Self, AppError> {
        let provider = ConnectionFactory::http(rpc_url)?;
        Ok(Self {
            name: name.to_string(),
            nonce: NonceManager::new(provider.clone(), owner),
            gas: GasOracle::new(provider.clone()),
            provider,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct WalletState {
    active_chain: u64,
    authorized: bool,
}

/// In-process EIP-1193 wallet backed by a local private key.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    consent: ConsentPolicy,
    chains: DashMap<u64, ChainHandle>,
    state: RwLock<WalletState>,
    events: broadcast::Sender<WalletEvent>,
}

impl LocalWallet {
    /// `chain_id`/`rpc_url` describe the network the wallet starts on; it
    /// knows no other network until one is added.
    pub fn new(
        signer: PrivateKeySigner,
        consent: ConsentPolicy,
        chain_id: u64,
        rpc_url: &str,
    ) -> Result<Self, AppError> {
        let chains = DashMap::new();
        chains.insert(
            chain_id,
            ChainHandle::open(&format!("chain {chain_id}"), rpc_url, signer.address())?,
        );
        let (events, _) = broadcast::channel(32);
        Ok(Self {
            signer,
            consent,
            chains,
            state: RwLock::new(WalletState {
                active_chain: chain_id,
                authorized: false,
            }),
            events,
        })
    }

    pub fn from_key(
        key: &str,
        consent: ConsentPolicy,
        chain_id: u64,
        rpc_url: &str,
    ) -> Result<Self, AppError> {
        let signer = PrivateKeySigner::from_str(key.trim())
            .map_err(|e| AppError::Config(format!("Invalid wallet key: {}", e)))?;
        Self::new(signer, consent, chain_id, rpc_url)
    }

    /// Treat the account as already authorized, so silent connects see it.
    pub fn with_authorized(self, authorized: bool) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.authorized = authorized;
        }
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn active_chain(&self) -> u64 {
        self.snapshot().active_chain
    }

    pub fn knows_chain(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// Revoke the account authorization, as a user disconnecting the site would.
    pub fn disconnect(&self) {
        if let Ok(mut state) = self.state.write() {
            state.authorized = false;
        }
        self.emit(WalletEvent::AccountsChanged(Vec::new()));
    }

    fn snapshot(&self) -> WalletState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn emit(&self, event: WalletEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn authorized_accounts(&self) -> Value {
        if self.snapshot().authorized {
            json!([self.address()])
        } else {
            json!([])
        }
    }

    async fn ask(&self, question: String) -> Result<(), ProviderRpcError> {
        let approved = match self.consent {
            ConsentPolicy::Approve => true,
            ConsentPolicy::Reject => false,
            ConsentPolicy::Prompt => tokio::task::spawn_blocking(move || prompt_stdin(&question))
                .await
                .unwrap_or(false),
        };
        if approved {
            Ok(())
        } else {
            tracing::info!(target: "wallet", "Request rejected by user");
            Err(ProviderRpcError::user_rejected())
        }
    }

    async fn request_accounts(&self) -> Result<Value, ProviderRpcError> {
        if !self.snapshot().authorized {
            self.ask(format!(
                "Connect account {} to VIN Arcade?",
                short_addr(&self.address())
            ))
            .await?;
            if let Ok(mut state) = self.state.write() {
                state.authorized = true;
            }
            self.emit(WalletEvent::AccountsChanged(vec![self.address()]));
        }
        Ok(json!([self.address()]))
    }

    async fn switch_chain(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let SwitchChainParams { chain_id } = first_param(params)?;
        let target = parse_u64_hex(&chain_id)
            .ok_or_else(|| ProviderRpcError::new(CODE_INVALID_PARAMS, "invalid chainId"))?;
        let name = match self.chains.get(&target) {
            Some(handle) => handle.name.clone(),
            None => {
                return Err(ProviderRpcError::new(
                    CODE_UNRECOGNIZED_CHAIN,
                    format!("Unrecognized chain ID \"{chain_id}\"."),
                ));
            }
        };
        if self.snapshot().active_chain == target {
            return Ok(Value::Null);
        }
        self.ask(format!("Switch network to {name} ({chain_id})?")).await?;
        self.activate(target);
        Ok(Value::Null)
    }

    async fn add_chain(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let add: AddChainParams = first_param(params)?;
        let target = parse_u64_hex(&add.chain_id)
            .ok_or_else(|| ProviderRpcError::new(CODE_INVALID_PARAMS, "invalid chainId"))?;
        let rpc_url = add
            .rpc_urls
            .first()
            .ok_or_else(|| ProviderRpcError::new(CODE_INVALID_PARAMS, "rpcUrls is empty"))?;

        if !self.knows_chain(target) {
            self.ask(format!(
                "Add network {} ({}) via {}?",
                add.chain_name, add.chain_id, rpc_url
            ))
            .await?;
            let handle = ChainHandle::open(&add.chain_name, rpc_url, self.address())
                .map_err(|e| ProviderRpcError::new(CODE_INVALID_PARAMS, e.to_string()))?;
            self.chains.insert(target, handle);
            tracing::info!(target: "wallet", chain_id = target, name = %add.chain_name, "Network added");
        }
        if self.snapshot().active_chain != target {
            self.activate(target);
        }
        Ok(Value::Null)
    }

    fn activate(&self, chain_id: u64) {
        if let Ok(mut state) = self.state.write() {
            state.active_chain = chain_id;
        }
        tracing::info!(target: "wallet", chain_id, "Active network switched");
        self.emit(WalletEvent::ChainChanged(chain_id));
    }

    async fn send_transaction(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let state = self.snapshot();
        if !state.authorized {
            return Err(ProviderRpcError::new(
                CODE_UNAUTHORIZED,
                "The requested account has not been authorized.",
            ));
        }
        let tx: TransactionParams = first_param(params)?;
        if tx.from != self.address() {
            return Err(ProviderRpcError::new(
                CODE_UNAUTHORIZED,
                format!("Unknown sender {}", tx.from),
            ));
        }
        let handle = self
            .chains
            .get(&state.active_chain)
            .map(|h| h.value().clone())
            .ok_or_else(|| ProviderRpcError::internal("active network has no provider"))?;

        let value = tx.value.unwrap_or(U256::ZERO);
        let input = tx.data.clone().unwrap_or_default();
        let request = TransactionRequest {
            from: Some(tx.from),
            to: Some(TxKind::Call(tx.to)),
            value: Some(value),
            input: TransactionInput::new(input.clone()),
            ..Default::default()
        };

        // A revert here carries the node's code 3 and revert data.
        let estimate = handle
            .provider
            .estimate_gas(request)
            .await
            .map_err(ProviderRpcError::from_transport)?;
        let gas_limit = buffered_gas_limit(estimate);

        self.ask(format!(
            "Send transaction to {} on {} (value {} MON, gas {})?",
            short_addr(&tx.to),
            handle.name,
            format_amount(value, NATIVE_DECIMALS, 6),
            gas_limit
        ))
        .await?;

        let fees = handle
            .gas
            .estimate_eip1559_fees()
            .await
            .map_err(|e| ProviderRpcError::internal(e.to_string()))?;
        let nonce = handle
            .nonce
            .reserve()
            .await
            .map_err(|e| ProviderRpcError::internal(e.to_string()))?;

        let mut unsigned = TxEip1559 {
            chain_id: state.active_chain,
            nonce,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            max_fee_per_gas: fees.max_fee_per_gas,
            gas_limit,
            to: TxKind::Call(tx.to),
            value,
            access_list: Default::default(),
            input,
        };
        let sig = sign_reserved(&self.signer, &handle.nonce, &mut unsigned).await?;
        let signed: TxEnvelope = unsigned.into_signed(sig).into();
        let raw = signed.encoded_2718();
        let tx_hash = *signed.tx_hash();

        if let Err(e) = handle.provider.send_raw_transaction(&raw).await {
            handle.nonce.resync().await;
            return Err(ProviderRpcError::from_transport(e));
        }
        tracing::info!(
            target: "wallet",
            tx_hash = %tx_hash,
            nonce,
            gas_limit,
            to = %tx.to,
            "Transaction broadcast"
        );
        Ok(json!(tx_hash))
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        tracing::debug!(target: "wallet", method, "Wallet request");
        match method {
            "eth_accounts" => Ok(self.authorized_accounts()),
            "eth_requestAccounts" => self.request_accounts().await,
            "eth_chainId" => Ok(json!(chain_id_hex(self.snapshot().active_chain))),
            "wallet_switchEthereumChain" => self.switch_chain(&params).await,
            "wallet_addEthereumChain" => self.add_chain(&params).await,
            "eth_sendTransaction" => self.send_transaction(&params).await,
            other => Err(ProviderRpcError::new(
                CODE_UNSUPPORTED_METHOD,
                format!("The method \"{other}\" is not supported."),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// Sign a transaction whose nonce came from `nonces`. On failure the nonce was
/// never used, so the local counter is dropped to avoid a gap.
async fn sign_reserved(
    signer: &PrivateKeySigner,
    nonces: &NonceManager,
    unsigned: &mut TxEip1559,
) -> Result<Signature, ProviderRpcError> {
    match TxSignerSync::sign_transaction_sync(signer, unsigned) {
        Ok(sig) => Ok(sig),
        Err(e) => {
            nonces.resync().await;
            Err(ProviderRpcError::internal(format!("Sign tx failed: {}", e)))
        }
    }
}

fn prompt_stdin(question: &str) -> bool {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{question} [y/N] ");
    let _ = stderr.flush();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => parse_boolish(&line).unwrap_or(false),
    }
}
