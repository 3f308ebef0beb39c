// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::parsing::{accounts_from_value, chain_id_from_value};
use crate::common::retry::retry_async;
use crate::domain::constants::{
    CODE_UNRECOGNIZED_CHAIN, DEFAULT_RECEIPT_POLL_MS, FALLBACK_TOKEN_DECIMALS, VIN_DICE,
    VIN_LOTTO, VIN_SWAP, VIN_TOKEN,
};
use crate::domain::error::ActionError;
use crate::domain::model::{ConnectMode, ConnectionState, ContractId, NetworkParams, Session};
use crate::infrastructure::data::contracts::{
    ContractProfile, DiceProfile, IVinToken, LottoProfile,
};
use crate::network::provider::ChainReader;
use crate::network::revert::classify;
use crate::network::wallet::{
    AddChainParams, NativeCurrency, SwitchChainParams, WalletEvent, WalletProvider,
};
use crate::services::binding::ContractBinding;
use alloy::primitives::Address;
use dashmap::DashMap;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OnceCell, broadcast, watch};
use tokio::task::JoinHandle;

/// Where everything lives: the target network and the four contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub network: NetworkParams,
    pub token: Address,
    pub swap: Address,
    pub dice: Address,
    pub lotto: Address,
    pub dice_profile: DiceProfile,
    pub lotto_profile: LottoProfile,
    pub receipt_poll: Duration,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            network: NetworkParams::monad(),
            token: VIN_TOKEN,
            swap: VIN_SWAP,
            dice: VIN_DICE,
            lotto: VIN_LOTTO,
            dice_profile: DiceProfile::default(),
            lotto_profile: LottoProfile::default(),
            receipt_poll: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
        }
    }
}

impl Deployment {
    pub fn address_of(&self, id: ContractId) -> Address {
        match id {
            ContractId::Token => self.token,
            ContractId::Swap => self.swap,
            ContractId::Dice => self.dice,
            ContractId::Lotto => self.lotto,
        }
    }

    pub fn profile_of(&self, id: ContractId) -> ContractProfile {
        match id {
            ContractId::Token => ContractProfile::Token,
            ContractId::Swap => ContractProfile::Swap,
            ContractId::Dice => ContractProfile::Dice(self.dice_profile),
            ContractId::Lotto => ContractProfile::Lotto(self.lotto_profile),
        }
    }

    fn add_chain_params(&self) -> AddChainParams {
        let net = &self.network;
        AddChainParams {
            chain_id: net.chain_id_hex(),
            chain_name: net.name.clone(),
            rpc_urls: vec![net.rpc_url.clone()],
            native_currency: NativeCurrency {
                name: net.native_symbol.clone(),
                symbol: net.native_symbol.clone(),
                decimals: net.native_decimals,
            },
            block_explorer_urls: net.explorer_url.iter().cloned().collect(),
        }
    }
}

const DECIMALS_ATTEMPTS: usize = 3;
const DECIMALS_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Single owner of the (account, chain) pair and of the contract bindings
/// derived from it. Everything else only reads snapshots.
pub struct SessionManager {
    wallet: Option<Arc<dyn WalletProvider>>,
    reader: Arc<dyn ChainReader>,
    deployment: Deployment,
    session: watch::Sender<Session>,
    bindings: DashMap<ContractId, ContractBinding>,
    decimals: OnceCell<u8>,
    /// One connect at a time; later callers wait their turn.
    connect_turn: AsyncMutex<()>,
    /// Wallet events that arrived while a connect was in flight.
    parked: Mutex<Vec<WalletEvent>>,
}

impl SessionManager {
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        reader: Arc<dyn ChainReader>,
        deployment: Deployment,
    ) -> Self {
        let (session, _) = watch::channel(Session::disconnected());
        Self {
            wallet,
            reader,
            deployment,
            session,
            bindings: DashMap::new(),
            decimals: OnceCell::new(),
            connect_turn: AsyncMutex::new(()),
            parked: Mutex::new(Vec::new()),
        }
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn target_chain(&self) -> u64 {
        self.deployment.network.chain_id
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Account allowed to sign right now, or why there is none.
    pub fn require_connected(&self) -> Result<Address, ActionError> {
        let s = self.session();
        match (s.state, s.account) {
            (ConnectionState::Connected, Some(account)) => Ok(account),
            (ConnectionState::WrongChain, _) => Err(ActionError::WrongChain {
                expected: self.target_chain(),
                actual: s.chain_id,
            }),
            _ => Err(ActionError::NotConnected),
        }
    }

    /// Connected account, connecting first if needed: silently, then with a
    /// prompt. Concurrent callers share one connect instead of failing.
    pub async fn ensure_connected(&self) -> Result<Address, ActionError> {
        if let Ok(account) = self.require_connected() {
            return Ok(account);
        }
        let wallet = self.wallet.clone().ok_or(ActionError::WalletUnavailable)?;
        let _turn = self.connect_turn.lock().await;
        // Whoever held the turn before us may have connected already.
        if let Ok(account) = self.require_connected() {
            return Ok(account);
        }
        let silent = self.connect_locked(wallet.as_ref(), ConnectMode::Silent).await?;
        if !silent.is_connected() {
            self.connect_locked(wallet.as_ref(), ConnectMode::Interactive)
                .await?;
        }
        self.require_connected()
    }

    pub async fn connect(&self, mode: ConnectMode) -> Result<Session, ActionError> {
        let wallet = self.wallet.clone().ok_or(ActionError::WalletUnavailable)?;
        let _turn = self.connect_turn.lock().await;
        self.connect_locked(wallet.as_ref(), mode).await
    }

    async fn connect_locked(
        &self,
        wallet: &dyn WalletProvider,
        mode: ConnectMode,
    ) -> Result<Session, ActionError> {
        let previous = self.session();
        self.publish(Session {
            state: ConnectionState::Connecting,
            ..previous
        });

        let result = self.establish(wallet, mode).await;
        let settled = match &result {
            Ok(session) => {
                tracing::info!(
                    target: "session",
                    mode = ?mode,
                    state = ?session.state,
                    account = ?session.account,
                    chain_id = ?session.chain_id,
                    "Connect finished"
                );
                session.clone()
            }
            Err((session, err)) => {
                tracing::warn!(target: "session", mode = ?mode, error = %err, "Connect failed");
                session.clone()
            }
        };
        let parked = self.settle_connect(settled);
        if !parked.is_empty() {
            tracing::debug!(target: "session", count = parked.len(), "Replaying wallet events from connect");
        }
        for event in parked {
            self.apply(event).await;
        }
        match result {
            Ok(_) => Ok(self.session()),
            Err((_, err)) => Err(err),
        }
    }

    /// Publish the connect result and hand back whatever was parked meanwhile.
    fn settle_connect(&self, session: Session) -> Vec<WalletEvent> {
        let mut parked = lock(&self.parked);
        self.publish(session);
        std::mem::take(&mut *parked)
    }

    /// Park `event` if a connect is in flight. The state is checked under the
    /// same lock `settle_connect` publishes under, so nothing slips between.
    fn park(&self, event: WalletEvent) -> bool {
        let mut parked = lock(&self.parked);
        if self.session.borrow().state != ConnectionState::Connecting {
            return false;
        }
        parked.push(event);
        true
    }

    async fn apply(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => self.apply_accounts(accounts).await,
            WalletEvent::ChainChanged(chain_id) => self.apply_chain(chain_id),
        }
    }

    async fn establish(
        &self,
        wallet: &dyn WalletProvider,
        mode: ConnectMode,
    ) -> Result<Session, (Session, ActionError)> {
        let method = match mode {
            ConnectMode::Silent => "eth_accounts",
            ConnectMode::Interactive => "eth_requestAccounts",
        };
        let accounts = wallet
            .request(method, json!([]))
            .await
            .map(|v| accounts_from_value(&v))
            .map_err(|e| (Session::disconnected(), classify(&e)))?;
        let Some(account) = accounts.first().copied() else {
            return Ok(Session::disconnected());
        };

        let target = self.target_chain();
        let mut chain = self
            .read_chain_id(wallet)
            .await
            .map_err(|e| (Session::disconnected(), e))?;

        if chain != target {
            let wrong = |chain_id: u64| Session {
                state: ConnectionState::WrongChain,
                account: Some(account),
                chain_id: Some(chain_id),
            };
            // A switch request is a prompt; silent connects only report.
            if mode == ConnectMode::Silent {
                return Ok(wrong(chain));
            }
            tracing::info!(target: "session", from = chain, to = target, "Requesting network switch");
            if let Err(e) = self.switch_or_add(wallet).await {
                let err = match e {
                    ActionError::UserRejected => ActionError::UserRejected,
                    _ => ActionError::WrongChain {
                        expected: target,
                        actual: Some(chain),
                    },
                };
                return Err((wrong(chain), err));
            }
            let observed = chain;
            chain = self
                .read_chain_id(wallet)
                .await
                .map_err(|e| (wrong(observed), e))?;
            if chain != target {
                return Err((
                    wrong(chain),
                    ActionError::WrongChain {
                        expected: target,
                        actual: Some(chain),
                    },
                ));
            }
        }

        self.bindings.clear();
        Ok(Session {
            state: ConnectionState::Connected,
            account: Some(account),
            chain_id: Some(chain),
        })
    }

    async fn switch_or_add(&self, wallet: &dyn WalletProvider) -> Result<(), ActionError> {
        let switch = SwitchChainParams {
            chain_id: self.deployment.network.chain_id_hex(),
        };
        match wallet
            .request("wallet_switchEthereumChain", json!([switch]))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.code == CODE_UNRECOGNIZED_CHAIN => {
                tracing::info!(target: "session", "Target network unknown to wallet; adding it");
                wallet
                    .request(
                        "wallet_addEthereumChain",
                        json!([self.deployment.add_chain_params()]),
                    )
                    .await
                    .map(|_| ())
                    .map_err(|e| classify(&e))
            }
            Err(e) => Err(classify(&e)),
        }
    }

    async fn read_chain_id(&self, wallet: &dyn WalletProvider) -> Result<u64, ActionError> {
        let raw = wallet
            .request("eth_chainId", json!([]))
            .await
            .map_err(|e| classify(&e))?;
        chain_id_from_value(&raw)
            .ok_or_else(|| ActionError::Rpc(format!("unreadable chain id {}", raw)))
    }

    /// Account list pushed by the wallet. An empty list drops the session.
    pub async fn on_accounts_changed(&self, accounts: Vec<Address>) {
        if self.park(WalletEvent::AccountsChanged(accounts.clone())) {
            return;
        }
        self.apply_accounts(accounts).await;
    }

    async fn apply_accounts(&self, accounts: Vec<Address>) {
        let Some(account) = accounts.first().copied() else {
            tracing::info!(target: "session", "Wallet removed all accounts");
            self.bindings.clear();
            self.publish(Session::disconnected());
            return;
        };

        let mut chain_id = self.session().chain_id;
        if chain_id.is_none()
            && let Some(wallet) = self.wallet.as_ref()
        {
            chain_id = self.read_chain_id(wallet.as_ref()).await.ok();
        }
        self.bindings.clear();
        let session = self.settle(Some(account), chain_id);
        tracing::info!(target: "session", %account, state = ?session.state, "Account changed");
        self.publish(session);
    }

    pub fn on_chain_changed(&self, chain_id: u64) {
        if self.park(WalletEvent::ChainChanged(chain_id)) {
            return;
        }
        self.apply_chain(chain_id);
    }

    fn apply_chain(&self, chain_id: u64) {
        let current = self.session();
        self.bindings.clear();
        let session = self.settle(current.account, Some(chain_id));
        if session.state == ConnectionState::WrongChain {
            tracing::warn!(target: "session", chain_id, expected = self.target_chain(), "Wallet left the target network");
        }
        self.publish(session);
    }

    fn settle(&self, account: Option<Address>, chain_id: Option<u64>) -> Session {
        let state = match (account, chain_id) {
            (None, _) => ConnectionState::Disconnected,
            (Some(_), Some(c)) if c == self.target_chain() => ConnectionState::Connected,
            (Some(_), _) => ConnectionState::WrongChain,
        };
        Session {
            state,
            account,
            chain_id,
        }
    }

    fn publish(&self, session: Session) {
        self.session.send_replace(session);
    }

    /// Cached binding, built on first use. Write-capable only while connected;
    /// a cached binding whose signer no longer matches the session is rebuilt.
    pub fn binding(&self, id: ContractId) -> ContractBinding {
        let signer = match (self.require_connected(), self.wallet.as_ref()) {
            (Ok(account), Some(wallet)) => Some((wallet.clone(), account)),
            _ => None,
        };
        if let Some(existing) = self.bindings.get(&id)
            && existing.signer() == signer.as_ref().map(|(_, account)| *account)
        {
            return existing.value().clone();
        }
        let mut binding = ContractBinding::read_only(
            id,
            self.deployment.address_of(id),
            self.deployment.profile_of(id),
            self.reader.clone(),
            self.deployment.receipt_poll,
        );
        if let Some((wallet, account)) = signer {
            binding = binding.with_writer(wallet, account);
        }
        self.bindings.insert(id, binding.clone());
        binding
    }

    /// Token decimals; falls back to 18 without caching when every read fails.
    pub async fn token_decimals(&self) -> u8 {
        let token = self.binding(ContractId::Token);
        let result = self
            .decimals
            .get_or_try_init(|| {
                retry_async(
                    |_| async { token.read(&IVinToken::decimalsCall {}).await },
                    DECIMALS_ATTEMPTS,
                    DECIMALS_RETRY_DELAY,
                )
            })
            .await;
        match result {
            Ok(d) => *d,
            Err(e) => {
                tracing::warn!(target: "session", error = %e, "decimals() unreadable; assuming 18");
                FALLBACK_TOKEN_DECIMALS
            }
        }
    }

    /// Forward wallet events into the session until the wallet goes away.
    pub fn listen(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let wallet = self.wallet.clone()?;
        let mut events = wallet.subscribe();
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(WalletEvent::AccountsChanged(accounts)) => {
                        this.on_accounts_changed(accounts).await
                    }
                    Ok(WalletEvent::ChainChanged(chain_id)) => this.on_chain_changed(chain_id),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(target: "session", skipped = n, "Wallet events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
