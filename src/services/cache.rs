// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::units::format_amount;
use crate::domain::constants::NATIVE_DECIMALS;
use crate::domain::error::ActionError;
use crate::domain::model::ContractId;
use crate::infrastructure::data::contracts::{IVinDice, IVinLotto, IVinToken};
use crate::services::session::SessionManager;
use alloy::primitives::{Address, U256};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// One independently fetched value. `Unavailable` is distinct from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Available(U256),
    Unavailable,
}

impl Reading {
    pub fn value(&self) -> Option<U256> {
        match self {
            Reading::Available(v) => Some(*v),
            Reading::Unavailable => None,
        }
    }

    fn settle(field: &str, result: Result<U256, ActionError>) -> Self {
        match result {
            Ok(v) => Reading::Available(v),
            Err(e) => {
                tracing::debug!(target: "cache", field, error = %e, "Read failed");
                Reading::Unavailable
            }
        }
    }

    pub fn display(&self, decimals: u8, max_frac: usize) -> String {
        match self {
            Reading::Available(v) => format_amount(*v, decimals, max_frac),
            Reading::Unavailable => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetLimits {
    pub dice_min: Reading,
    pub dice_max: Reading,
    /// Per-player cap; unavailable without an account.
    pub dice_max_allowed: Reading,
    pub lotto_min: Reading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub account: Option<Address>,
    pub native_balance: Reading,
    pub token_balance: Reading,
    pub allowances: BTreeMap<ContractId, Reading>,
    pub pools: BTreeMap<ContractId, Reading>,
    pub limits: BetLimits,
}

/// String form of a snapshot for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDisplay {
    pub native: String,
    pub token: String,
    pub allowances: BTreeMap<ContractId, String>,
    pub pools: BTreeMap<ContractId, String>,
}

impl fmt::Display for BalanceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MON: {}", self.native)?;
        writeln!(f, "VIN: {}", self.token)?;
        for (id, v) in &self.allowances {
            writeln!(f, "Allowance {id}: {v}")?;
        }
        for (id, v) in &self.pools {
            writeln!(f, "{id} pool: {v} VIN")?;
        }
        Ok(())
    }
}

impl BalanceSnapshot {
    pub fn allowance(&self, spender: ContractId) -> Reading {
        self.allowances
            .get(&spender)
            .copied()
            .unwrap_or(Reading::Unavailable)
    }

    pub fn display(&self, token_decimals: u8) -> BalanceDisplay {
        BalanceDisplay {
            native: self.native_balance.display(NATIVE_DECIMALS, 4),
            token: self.token_balance.display(token_decimals, 4),
            allowances: self
                .allowances
                .iter()
                .map(|(id, r)| (*id, r.display(token_decimals, 2)))
                .collect(),
            pools: self
                .pools
                .iter()
                .map(|(id, r)| (*id, r.display(token_decimals, 2)))
                .collect(),
        }
    }
}

/// Pull-based balance reads. Every sub-read settles on its own; `refresh`
/// never fails and can run concurrently with anything.
pub struct BalanceCache {
    session: Arc<SessionManager>,
    latest: watch::Sender<Option<BalanceSnapshot>>,
}

impl BalanceCache {
    pub fn new(session: Arc<SessionManager>) -> Self {
        let (latest, _) = watch::channel(None);
        Self { session, latest }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.latest.subscribe()
    }

    pub fn latest(&self) -> Option<BalanceSnapshot> {
        self.latest.borrow().clone()
    }

    pub async fn refresh(&self, account: Option<Address>) -> BalanceSnapshot {
        let token = self.session.binding(ContractId::Token);
        let dice = self.session.binding(ContractId::Dice);
        let lotto = self.session.binding(ContractId::Lotto);

        let pools = join_all(ContractId::POOLS.iter().map(|id| {
            let token = token.clone();
            let holder = self.session.deployment().address_of(*id);
            async move {
                let r = token.read(&IVinToken::balanceOfCall { account: holder }).await;
                (*id, Reading::settle("pool", r))
            }
        }));

        let limits = async {
            let (dice_min, dice_max, dice_max_allowed, lotto_min) = tokio::join!(
                dice.read(&IVinDice::MIN_BETCall {}),
                dice.read(&IVinDice::MAX_BETCall {}),
                async {
                    match account {
                        Some(player) => dice.read(&IVinDice::maxBetAllowedCall { player }).await,
                        None => Err(ActionError::NotConnected),
                    }
                },
                lotto.read(&IVinLotto::MIN_BETCall {}),
            );
            BetLimits {
                dice_min: Reading::settle("dice_min", dice_min),
                dice_max: Reading::settle("dice_max", dice_max),
                dice_max_allowed: Reading::settle("dice_max_allowed", dice_max_allowed),
                lotto_min: Reading::settle("lotto_min", lotto_min),
            }
        };

        let snapshot = match account {
            None => {
                let (pools, limits) = tokio::join!(pools, limits);
                BalanceSnapshot {
                    account: None,
                    native_balance: Reading::Available(U256::ZERO),
                    token_balance: Reading::Available(U256::ZERO),
                    allowances: BTreeMap::new(),
                    pools: pools.into_iter().collect(),
                    limits,
                }
            }
            Some(owner) => {
                let allowances = join_all(ContractId::SPENDERS.iter().map(|id| {
                    let token = token.clone();
                    let spender = self.session.deployment().address_of(*id);
                    async move {
                        let r = token.read(&IVinToken::allowanceCall { owner, spender }).await;
                        (*id, Reading::settle("allowance", r))
                    }
                }));
                let balance_call = IVinToken::balanceOfCall { account: owner };
                let (native, balance, allowances, pools, limits) = tokio::join!(
                    token.native_balance(owner),
                    token.read(&balance_call),
                    allowances,
                    pools,
                    limits,
                );
                BalanceSnapshot {
                    account: Some(owner),
                    native_balance: Reading::settle("native", native),
                    token_balance: Reading::settle("token", balance),
                    allowances: allowances.into_iter().collect(),
                    pools: pools.into_iter().collect(),
                    limits,
                }
            }
        };

        tracing::debug!(target: "cache", account = ?account, "Balances refreshed");
        self.latest.send_replace(Some(snapshot.clone()));
        snapshot
    }

    pub async fn refresh_display(&self, account: Option<Address>) -> BalanceDisplay {
        let snapshot = self.refresh(account).await;
        let decimals = self.session.token_decimals().await;
        snapshot.display(decimals)
    }
}
