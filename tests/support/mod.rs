// SPDX-License-Identifier: MIT
// In-memory wallet + chain double. Scripts eth_call replies by selector (or by
// exact calldata), records every wallet request and sent transaction, and
// mines one scripted receipt per transaction.
#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, Log, TxHash, U256, keccak256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use vin_arcade::common::parsing::{chain_id_from_value, parse_u64_hex};
use vin_arcade::domain::constants::{
    CHAIN_MONAD, CODE_SERVER, CODE_UNRECOGNIZED_CHAIN, CODE_UNSUPPORTED_METHOD,
};
use vin_arcade::network::provider::{ChainReader, ReceiptSummary};
use vin_arcade::network::wallet::{
    AddChainParams, ProviderRpcError, SwitchChainParams, TransactionParams, WalletEvent,
    WalletProvider, first_param,
};
use vin_arcade::services::cache::BalanceCache;
use vin_arcade::services::coordinator::Coordinator;
use vin_arcade::services::session::{Deployment, SessionManager};

pub fn player() -> Address {
    Address::from([0x11; 20])
}

/// Whole VIN at 18 decimals.
pub fn vin(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn deployment() -> Deployment {
    Deployment {
        receipt_poll: Duration::from_millis(5),
        ..Deployment::default()
    }
}

pub enum ScriptedReceipt {
    Success(Vec<Log>),
    Reverted,
}

#[derive(Default)]
struct NodeState {
    accounts: Vec<Address>,
    authorized: bool,
    chain_id: u64,
    known_chains: HashSet<u64>,
    reject_prompts: bool,
    rejected: HashSet<String>,
    revoke_on: Option<String>,
    send_error: Option<ProviderRpcError>,
    by_selector: HashMap<(Address, [u8; 4]), Result<Bytes, ProviderRpcError>>,
    by_calldata: HashMap<(Address, Bytes), Result<Bytes, ProviderRpcError>>,
    flaky: HashMap<(Address, [u8; 4]), usize>,
    native: HashMap<Address, U256>,
    requests: Vec<String>,
    sent: Vec<TransactionParams>,
    scripted: VecDeque<ScriptedReceipt>,
    receipts: HashMap<TxHash, ReceiptSummary>,
    calls: usize,
}

pub struct MockNode {
    state: Mutex<NodeState>,
    hold_receipts: AtomicBool,
    slow_requests: AtomicBool,
    events: broadcast::Sender<WalletEvent>,
}

impl MockNode {
    /// Player account already authorized, wallet on the target chain.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        let node = Self {
            state: Mutex::new(NodeState {
                accounts: vec![player()],
                authorized: true,
                chain_id: CHAIN_MONAD,
                known_chains: HashSet::from([CHAIN_MONAD]),
                ..NodeState::default()
            }),
            hold_receipts: AtomicBool::new(false),
            slow_requests: AtomicBool::new(false),
            events,
        };
        let d = deployment();
        node.respond::<vin_arcade::data::contracts::IVinToken::decimalsCall>(d.token, &18u8);
        node
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn respond<C: SolCall>(&self, to: Address, ret: &C::Return) {
        let encoded = Bytes::from(C::abi_encode_returns(ret));
        self.with_state(|s| s.by_selector.insert((to, C::SELECTOR), Ok(encoded)));
    }

    pub fn respond_exact<C: SolCall>(&self, to: Address, call: &C, ret: &C::Return) {
        let encoded = Bytes::from(C::abi_encode_returns(ret));
        let key = (to, Bytes::from(call.abi_encode()));
        self.with_state(|s| s.by_calldata.insert(key, Ok(encoded)));
    }

    pub fn fail<C: SolCall>(&self, to: Address) {
        let err = ProviderRpcError::new(CODE_SERVER, "header not found");
        self.with_state(|s| s.by_selector.insert((to, C::SELECTOR), Err(err)));
    }

    /// The next `times` calls of `C` fail before the scripted reply is served.
    pub fn fail_first<C: SolCall>(&self, to: Address, times: usize) {
        self.with_state(|s| s.flaky.insert((to, C::SELECTOR), times));
    }

    pub fn set_native(&self, account: Address, value: U256) {
        self.with_state(|s| s.native.insert(account, value));
    }

    pub fn set_chain(&self, chain_id: u64) {
        self.with_state(|s| {
            s.chain_id = chain_id;
            s.known_chains.insert(chain_id);
        });
    }

    /// Wallet that has never seen the target network.
    pub fn forget_chain(&self, chain_id: u64) {
        self.with_state(|s| s.known_chains.remove(&chain_id));
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.with_state(|s| s.authorized = authorized);
    }

    pub fn reject_prompts(&self, reject: bool) {
        self.with_state(|s| s.reject_prompts = reject);
    }

    /// Reject one prompting method only.
    pub fn reject(&self, method: &str) {
        self.with_state(|s| s.rejected.insert(method.to_string()));
    }

    pub fn fail_sends_with(&self, err: ProviderRpcError) {
        self.with_state(|s| s.send_error = Some(err));
    }

    pub fn queue_receipt(&self, receipt: ScriptedReceipt) {
        self.with_state(|s| s.scripted.push_back(receipt));
    }

    pub fn queue_logs(&self, logs: Vec<Log>) {
        self.queue_receipt(ScriptedReceipt::Success(logs));
    }

    pub fn hold_receipts(&self, hold: bool) {
        self.hold_receipts.store(hold, Ordering::SeqCst);
    }

    /// Every wallet request yields to the scheduler first, like a real
    /// round-trip would.
    pub fn slow_requests(&self, slow: bool) {
        self.slow_requests.store(slow, Ordering::SeqCst);
    }

    /// The user disconnects the site while `method`'s prompt is open.
    pub fn revoke_during(&self, method: &str) {
        self.with_state(|s| s.revoke_on = Some(method.to_string()));
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    pub fn sent(&self) -> Vec<TransactionParams> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn requests(&self) -> Vec<String> {
        self.with_state(|s| s.requests.clone())
    }

    /// Number of eth_call/balance reads served so far.
    pub fn reads(&self) -> usize {
        self.with_state(|s| s.calls)
    }

    fn prompt(&self, method: &str) -> Result<(), ProviderRpcError> {
        if self.with_state(|s| s.reject_prompts || s.rejected.contains(method)) {
            return Err(ProviderRpcError::user_rejected());
        }
        let revoke = self.with_state(|s| {
            let hit = s.revoke_on.as_deref() == Some(method);
            if hit {
                s.authorized = false;
                s.revoke_on = None;
            }
            hit
        });
        if revoke {
            self.emit(WalletEvent::AccountsChanged(Vec::new()));
        }
        Ok(())
    }

    fn switch_to(&self, chain_id: u64) {
        self.with_state(|s| s.chain_id = chain_id);
        self.emit(WalletEvent::ChainChanged(chain_id));
    }
}

pub fn log_of<E: SolEvent>(emitter: Address, event: &E) -> Log {
    Log {
        address: emitter,
        data: event.encode_log_data(),
    }
}

#[async_trait]
impl WalletProvider for MockNode {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        if self.slow_requests.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        self.with_state(|s| s.requests.push(method.to_string()));
        match method {
            "eth_accounts" => Ok(self.with_state(|s| {
                if s.authorized {
                    json!(s.accounts)
                } else {
                    json!([])
                }
            })),
            "eth_requestAccounts" => {
                self.prompt(method)?;
                Ok(self.with_state(|s| {
                    s.authorized = true;
                    json!(s.accounts)
                }))
            }
            "eth_chainId" => Ok(json!(format!("{:#x}", self.with_state(|s| s.chain_id)))),
            "wallet_switchEthereumChain" => {
                let p: SwitchChainParams = first_param(&params)?;
                let target = parse_u64_hex(&p.chain_id).unwrap_or_default();
                if !self.with_state(|s| s.known_chains.contains(&target)) {
                    return Err(ProviderRpcError::new(
                        CODE_UNRECOGNIZED_CHAIN,
                        "Unrecognized chain ID",
                    ));
                }
                self.prompt(method)?;
                self.switch_to(target);
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let p: AddChainParams = first_param(&params)?;
                let target = chain_id_from_value(&json!(p.chain_id)).unwrap_or_default();
                self.prompt(method)?;
                self.with_state(|s| s.known_chains.insert(target));
                self.switch_to(target);
                Ok(Value::Null)
            }
            "eth_sendTransaction" => {
                let tx: TransactionParams = first_param(&params)?;
                self.prompt(method)?;
                if let Some(err) = self.with_state(|s| s.send_error.clone()) {
                    return Err(err);
                }
                let hash = self.with_state(|s| {
                    s.sent.push(tx);
                    let hash = keccak256((s.sent.len() as u64).to_be_bytes());
                    let receipt = match s.scripted.pop_front() {
                        Some(ScriptedReceipt::Reverted) => ReceiptSummary {
                            tx_hash: hash,
                            success: false,
                            block_number: Some(1),
                            logs: Vec::new(),
                        },
                        Some(ScriptedReceipt::Success(logs)) => ReceiptSummary {
                            tx_hash: hash,
                            success: true,
                            block_number: Some(1),
                            logs,
                        },
                        None => ReceiptSummary {
                            tx_hash: hash,
                            success: true,
                            block_number: Some(1),
                            logs: Vec::new(),
                        },
                    };
                    s.receipts.insert(hash, receipt);
                    hash
                });
                Ok(json!(hash))
            }
            other => Err(ProviderRpcError::new(
                CODE_UNSUPPORTED_METHOD,
                format!("{other} not supported"),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ChainReader for MockNode {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ProviderRpcError> {
        self.with_state(|s| {
            s.calls += 1;
            if let Some(reply) = s.by_calldata.get(&(to, input.clone())) {
                return reply.clone();
            }
            let mut selector = [0u8; 4];
            if input.len() >= 4 {
                selector.copy_from_slice(&input[..4]);
            }
            if let Some(left) = s.flaky.get_mut(&(to, selector))
                && *left > 0
            {
                *left -= 1;
                return Err(ProviderRpcError::new(CODE_SERVER, "header not found"));
            }
            s.by_selector
                .get(&(to, selector))
                .cloned()
                .unwrap_or_else(|| Err(ProviderRpcError::new(CODE_SERVER, "call not scripted")))
        })
    }

    async fn native_balance(&self, account: Address) -> Result<U256, ProviderRpcError> {
        self.with_state(|s| {
            s.calls += 1;
            s.native
                .get(&account)
                .copied()
                .ok_or_else(|| ProviderRpcError::new(CODE_SERVER, "balance unavailable"))
        })
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptSummary>, ProviderRpcError> {
        if self.hold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.with_state(|s| s.receipts.get(&hash).cloned()))
    }
}

pub struct Harness {
    pub node: Arc<MockNode>,
    pub session: Arc<SessionManager>,
    pub cache: Arc<BalanceCache>,
    pub coordinator: Coordinator,
}

pub fn harness_with(node: MockNode) -> Harness {
    harness_for(node, deployment())
}

pub fn harness_for(node: MockNode, deployment: Deployment) -> Harness {
    let node = Arc::new(node);
    let session = Arc::new(SessionManager::new(
        Some(node.clone() as Arc<dyn WalletProvider>),
        node.clone() as Arc<dyn ChainReader>,
        deployment,
    ));
    let cache = Arc::new(BalanceCache::new(session.clone()));
    let coordinator = Coordinator::new(session.clone(), cache.clone());
    Harness {
        node,
        session,
        cache,
        coordinator,
    }
}

pub fn harness() -> Harness {
    harness_with(MockNode::new())
}
