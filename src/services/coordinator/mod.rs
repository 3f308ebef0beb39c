// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Per-feature action pipelines: validate, check preconditions, submit,
//! confirm, decode, refresh. Each action kind holds its own lock; kinds never
//! wait on each other.

pub mod approve;
pub mod dice;
pub mod lotto;
pub mod swap;

use crate::domain::error::ActionError;
use crate::domain::model::{ActionKind, ContractId, Outcome};
use crate::infrastructure::data::contracts::IVinToken;
use crate::network::provider::ReceiptSummary;
use crate::services::binding::ContractBinding;
use crate::services::cache::BalanceCache;
use crate::services::session::SessionManager;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use dashmap::DashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};

pub use lotto::LottoDraft;

/// Progress of one action, published for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStage {
    AwaitingSignature,
    Submitted(TxHash),
    Confirmed(TxHash),
    ConfirmedUnknown(TxHash),
    Failed(ActionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub kind: ActionKind,
    pub stage: ActionStage,
}

#[derive(Default)]
pub struct ActionLocks {
    held: DashSet<ActionKind>,
}

impl ActionLocks {
    /// `None` while another action of the same kind is outstanding.
    pub fn try_acquire(&self, kind: ActionKind) -> Option<LockGuard<'_>> {
        if self.held.insert(kind) {
            Some(LockGuard { locks: self, kind })
        } else {
            None
        }
    }

    pub fn is_held(&self, kind: ActionKind) -> bool {
        self.held.contains(&kind)
    }
}

pub struct LockGuard<'a> {
    locks: &'a ActionLocks,
    kind: ActionKind,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.locks.held.remove(&self.kind);
    }
}

/// Engages the rolling flag; clears it on every exit path.
pub(crate) struct RollingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> RollingGuard<'a> {
    fn engage(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        Self(flag)
    }
}

impl Drop for RollingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

pub struct Coordinator {
    session: Arc<SessionManager>,
    cache: Arc<BalanceCache>,
    locks: ActionLocks,
    events: broadcast::Sender<ActionEvent>,
    rolling: watch::Sender<bool>,
    draft: Mutex<LottoDraft>,
}

impl Coordinator {
    pub fn new(session: Arc<SessionManager>, cache: Arc<BalanceCache>) -> Self {
        let (events, _) = broadcast::channel(64);
        let (rolling, _) = watch::channel(false);
        Self {
            session,
            cache,
            locks: ActionLocks::default(),
            events,
            rolling,
            draft: Mutex::new(LottoDraft::default()),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn cache(&self) -> &Arc<BalanceCache> {
        &self.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionEvent> {
        self.events.subscribe()
    }

    /// True while a dice play is between submission and decode.
    pub fn rolling(&self) -> watch::Receiver<bool> {
        self.rolling.subscribe()
    }

    pub fn is_busy(&self, kind: ActionKind) -> bool {
        self.locks.is_held(kind)
    }

    fn emit(&self, kind: ActionKind, stage: ActionStage) {
        let _ = self.events.send(ActionEvent { kind, stage });
    }

    /// Reuse an existing session, else try silently, else prompt.
    async fn ensure_session(&self) -> Result<Address, ActionError> {
        self.session.ensure_connected().await
    }

    async fn allowance(&self, owner: Address, spender: ContractId) -> Result<U256, ActionError> {
        let spender = self.session.deployment().address_of(spender);
        self.session
            .binding(ContractId::Token)
            .read(&IVinToken::allowanceCall { owner, spender })
            .await
    }

    /// Fail with `ApprovalRequired` unless `spender` may pull `required`.
    async fn require_allowance(
        &self,
        owner: Address,
        spender: ContractId,
        required: U256,
    ) -> Result<(), ActionError> {
        let allowance = self.allowance(owner, spender).await?;
        if allowance < required {
            tracing::info!(
                target: "session",
                spender = %spender,
                %required,
                %allowance,
                "Approval required"
            );
            return Err(ActionError::ApprovalRequired {
                spender,
                required,
                allowance,
            });
        }
        Ok(())
    }

    async fn send_and_confirm(
        &self,
        kind: ActionKind,
        binding: &ContractBinding,
        data: Bytes,
        value: Option<U256>,
    ) -> Result<ReceiptSummary, ActionError> {
        self.emit(kind, ActionStage::AwaitingSignature);
        let hash = binding.submit(data, value).await?;
        self.emit(kind, ActionStage::Submitted(hash));
        binding.confirm(hash).await
    }

    /// Publish the terminal stage and refresh balances after anything that
    /// reached the chain.
    async fn finish<T>(
        &self,
        kind: ActionKind,
        account: Option<Address>,
        result: &Result<Outcome<T>, ActionError>,
    ) {
        match result {
            Ok(Outcome::Confirmed { tx_hash, .. }) => {
                self.emit(kind, ActionStage::Confirmed(*tx_hash))
            }
            Ok(Outcome::ConfirmedUnknown { tx_hash }) => {
                self.emit(kind, ActionStage::ConfirmedUnknown(*tx_hash))
            }
            Ok(Outcome::Skipped(_)) => return,
            Err(e) => self.emit(kind, ActionStage::Failed(e.clone())),
        }
        let reached_chain = match result {
            Ok(_) => true,
            Err(e) => matches!(e, ActionError::ContractReverted { .. }),
        };
        if reached_chain {
            self.cache.refresh(account).await;
        }
    }
}
