// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, TxHash, U256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    WrongChain,
}

/// Silent never prompts the wallet; Interactive always does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    Silent,
    Interactive,
}

/// The (account, chain) pair the wallet currently authorizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: ConnectionState,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

impl Session {
    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            account: None,
            chain_id: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.account.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Metadata of the chain all writes must happen on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub explorer_url: Option<String>,
    pub native_symbol: String,
    pub native_decimals: u8,
}

impl NetworkParams {
    pub fn monad() -> Self {
        use crate::domain::constants::*;
        Self {
            chain_id: CHAIN_MONAD,
            name: CHAIN_MONAD_NAME.to_string(),
            rpc_url: MONAD_PUBLIC_RPC.to_string(),
            explorer_url: Some(MONAD_EXPLORER.to_string()),
            native_symbol: NATIVE_SYMBOL.to_string(),
            native_decimals: NATIVE_DECIMALS,
        }
    }

    pub fn chain_id_hex(&self) -> String {
        crate::domain::constants::chain_id_hex(self.chain_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractId {
    Token,
    Swap,
    Dice,
    Lotto,
}

impl ContractId {
    pub const ALL: [ContractId; 4] = [
        ContractId::Token,
        ContractId::Swap,
        ContractId::Dice,
        ContractId::Lotto,
    ];

    /// Contracts that pull VIN from the player and therefore need an allowance.
    pub const SPENDERS: [ContractId; 3] = [ContractId::Swap, ContractId::Dice, ContractId::Lotto];

    /// Contracts whose VIN holdings are shown as a prize pool.
    pub const POOLS: [ContractId; 2] = [ContractId::Dice, ContractId::Lotto];

    pub fn label(&self) -> &'static str {
        match self {
            ContractId::Token => "Token",
            ContractId::Swap => "Swap",
            ContractId::Dice => "Dice",
            ContractId::Lotto => "Lotto",
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One mutex per kind; kinds never block each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ApproveSwap,
    Swap,
    ApproveDice,
    DicePlay,
    ApproveLotto,
    LottoPlay,
}

impl ActionKind {
    pub fn approve_for(spender: ContractId) -> Option<Self> {
        match spender {
            ContractId::Swap => Some(ActionKind::ApproveSwap),
            ContractId::Dice => Some(ActionKind::ApproveDice),
            ContractId::Lotto => Some(ActionKind::ApproveLotto),
            ContractId::Token => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// On-chain encoding of a dice choice.
    pub fn as_u8(self) -> u8 {
        match self {
            Parity::Even => 0,
            Parity::Odd => 1,
        }
    }

    pub fn of(value: u64) -> Self {
        if value % 2 == 0 { Parity::Even } else { Parity::Odd }
    }

    pub fn opposite(self) -> Self {
        match self {
            Parity::Even => Parity::Odd,
            Parity::Odd => Parity::Even,
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Even => f.write_str("EVEN"),
            Parity::Odd => f.write_str("ODD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    TokenToNative,
    NativeToToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LottoMode {
    #[default]
    BetOne,
    Bet27,
}

impl LottoMode {
    pub fn is_bet27(self) -> bool {
        self == LottoMode::Bet27
    }

    pub fn label(self) -> &'static str {
        match self {
            LottoMode::BetOne => "BetOne",
            LottoMode::Bet27 => "Bet27",
        }
    }
}

/// Raw row as typed by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LottoRowInput {
    pub number: String,
    pub amount: String,
}

impl LottoRowInput {
    pub fn new(number: impl ToString, amount: impl Into<String>) -> Self {
        Self {
            number: number.to_string(),
            amount: amount.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LottoRow {
    pub number: u8,
    pub amount: U256,
}

/// A validated batch: every number in 0..=99 and every amount > 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LottoTicket {
    pub rows: Vec<LottoRow>,
    pub mode: LottoMode,
}

impl LottoTicket {
    /// Exact stake, or `None` when it does not fit in 256 bits.
    pub fn total(&self) -> Option<U256> {
        self.rows
            .iter()
            .try_fold(U256::ZERO, |acc, row| acc.checked_add(row.amount))
    }

    pub fn numbers(&self) -> Vec<u8> {
        self.rows.iter().map(|r| r.number).collect()
    }

    pub fn amounts(&self) -> Vec<U256> {
        self.rows.iter().map(|r| r.amount).collect()
    }
}

/// Dice outcome, built only from the decoded `Played` event and receipt logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceResult {
    pub wagered: U256,
    pub player_choice: Parity,
    pub on_chain_outcome: Parity,
    pub roll: Option<u16>,
    pub won: bool,
    /// VIN transferred from the dice contract to the player in the same receipt.
    pub payout: Option<U256>,
    /// Parity shown to the player: the choice on a win, its opposite on a loss.
    pub shown_parity: Parity,
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LottoResult {
    pub mode: LottoMode,
    pub numbers: Vec<u8>,
    pub amounts: Vec<U256>,
    pub results: Vec<u8>,
    pub total_bet: U256,
    pub total_payout: U256,
    pub tx_hash: TxHash,
}

impl LottoResult {
    pub fn won(&self) -> bool {
        !self.total_payout.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowance {
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

/// How an action ended once it got past its preconditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Another submission of the same kind is still in flight; nothing was sent.
    Skipped(ActionKind),
    Confirmed { tx_hash: TxHash, details: T },
    /// Mined successfully, but the result event could not be decoded.
    ConfirmedUnknown { tx_hash: TxHash },
}

impl<T> Outcome<T> {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Outcome::Skipped(_) => None,
            Outcome::Confirmed { tx_hash, .. } | Outcome::ConfirmedUnknown { tx_hash } => {
                Some(*tx_hash)
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn details(&self) -> Option<&T> {
        match self {
            Outcome::Confirmed { details, .. } => Some(details),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_helpers() {
        assert_eq!(Parity::of(4), Parity::Even);
        assert_eq!(Parity::of(7), Parity::Odd);
        assert_eq!(Parity::Even.opposite(), Parity::Odd);
        assert_eq!(Parity::Odd.as_u8(), 1);
    }

    #[test]
    fn ticket_total_sums_rows() {
        let ticket = LottoTicket {
            rows: vec![
                LottoRow {
                    number: 7,
                    amount: U256::from(3u64),
                },
                LottoRow {
                    number: 42,
                    amount: U256::from(5u64),
                },
            ],
            mode: LottoMode::BetOne,
        };
        assert_eq!(ticket.total(), Some(U256::from(8u64)));
        assert_eq!(ticket.numbers(), vec![7, 42]);
    }

    #[test]
    fn approve_kind_per_spender() {
        assert_eq!(
            ActionKind::approve_for(ContractId::Dice),
            Some(ActionKind::ApproveDice)
        );
        assert_eq!(ActionKind::approve_for(ContractId::Token), None);
    }
}
