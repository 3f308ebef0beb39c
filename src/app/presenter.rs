// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Short status lines for the terminal. Pure formatting; nothing here decides
//! anything.

use crate::common::units::{format_amount, short_addr};
use crate::domain::constants::{NATIVE_DECIMALS, NATIVE_SYMBOL, TOKEN_SYMBOL};
use crate::domain::error::ActionError;
use crate::domain::model::{
    ActionKind, Allowance, ConnectionState, DiceResult, LottoResult, Outcome, Session,
    SwapDirection,
};
use crate::network::price_feed::PriceReading;
use crate::services::coordinator::swap::SwapReceipt;
use crate::services::coordinator::{ActionEvent, ActionStage};
use alloy::primitives::{TxHash, U256};

#[derive(Debug, Clone)]
pub struct Presenter {
    token_decimals: u8,
    explorer: Option<String>,
}

fn kind_label(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::ApproveSwap => "Approve Swap",
        ActionKind::Swap => "Swap",
        ActionKind::ApproveDice => "Approve Dice",
        ActionKind::DicePlay => "Dice",
        ActionKind::ApproveLotto => "Approve Lotto",
        ActionKind::LottoPlay => "Lotto",
    }
}

impl Presenter {
    pub fn new(token_decimals: u8, explorer: Option<String>) -> Self {
        Self {
            token_decimals,
            explorer: explorer.map(|e| e.trim_end_matches('/').to_string()),
        }
    }

    fn vin(&self, value: U256) -> String {
        format!("{} {TOKEN_SYMBOL}", format_amount(value, self.token_decimals, 4))
    }

    fn mon(&self, value: U256) -> String {
        format!("{} {NATIVE_SYMBOL}", format_amount(value, NATIVE_DECIMALS, 6))
    }

    pub fn tx_link(&self, hash: TxHash) -> String {
        match &self.explorer {
            Some(base) => format!("{base}/tx/{hash}"),
            None => hash.to_string(),
        }
    }

    pub fn session(&self, session: &Session) -> String {
        let who = session
            .account
            .as_ref()
            .map(short_addr)
            .unwrap_or_else(|| "-".to_string());
        let chain = session
            .chain_id
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        match session.state {
            ConnectionState::Disconnected => "Not connected".to_string(),
            ConnectionState::Connecting => "Connecting...".to_string(),
            ConnectionState::Connected => format!("Connected {who} on chain {chain}"),
            ConnectionState::WrongChain => format!("Wrong network (chain {chain}) for {who}"),
        }
    }

    pub fn stage(&self, event: &ActionEvent) -> String {
        let label = kind_label(event.kind);
        match &event.stage {
            ActionStage::AwaitingSignature => format!("{label}: Signing..."),
            ActionStage::Submitted(_) => format!("{label}: Waiting confirmation..."),
            ActionStage::Confirmed(hash) => format!("{label}: Confirmed. {}", self.tx_link(*hash)),
            ActionStage::ConfirmedUnknown(hash) => {
                format!("{label}: Confirmed. (No event parsed) {}", self.tx_link(*hash))
            }
            ActionStage::Failed(e) => format!("{label}: {}", self.error(e)),
        }
    }

    pub fn error(&self, err: &ActionError) -> String {
        match err {
            ActionError::WalletUnavailable => "No wallet available. Set WALLET_KEY.".to_string(),
            ActionError::UserRejected => "Rejected in wallet.".to_string(),
            ActionError::WrongChain { expected, actual } => match actual {
                Some(actual) => format!("Wrong network: on chain {actual}, switch to {expected}."),
                None => format!("Wrong network: switch to chain {expected}."),
            },
            ActionError::NotConnected => "Connect wallet first.".to_string(),
            ActionError::ApprovalRequired { spender, .. } => {
                format!("Approval required for {spender}.")
            }
            ActionError::Validation { message, .. } => format!("Invalid input: {message}."),
            ActionError::InsufficientFunds => "Insufficient funds for amount plus gas.".to_string(),
            ActionError::ContractReverted { reason: Some(r) } => format!("Reverted: {r}"),
            ActionError::ContractReverted { reason: None } => "Transaction reverted.".to_string(),
            ActionError::Rpc(msg) => format!("Network error: {msg}"),
        }
    }

    fn outcome<T>(&self, outcome: &Outcome<T>, confirmed: impl FnOnce(&T) -> String) -> String {
        match outcome {
            Outcome::Skipped(kind) => format!("{} already in progress.", kind_label(*kind)),
            Outcome::ConfirmedUnknown { tx_hash } => {
                format!("Confirmed. (No event parsed) {}", self.tx_link(*tx_hash))
            }
            Outcome::Confirmed { tx_hash, details } => {
                format!("{} {}", confirmed(details), self.tx_link(*tx_hash))
            }
        }
    }

    pub fn approve(&self, outcome: &Outcome<Allowance>) -> String {
        self.outcome(outcome, |a| {
            format!(
                "Approved. Allowance for {}: {}",
                short_addr(&a.spender),
                self.vin(a.amount)
            )
        })
    }

    pub fn swap(&self, outcome: &Outcome<SwapReceipt>) -> String {
        self.outcome(outcome, |s| match s.direction {
            SwapDirection::TokenToNative => format!("Swapped {} to MON.", self.vin(s.amount_in)),
            SwapDirection::NativeToToken => match s.token_received {
                Some(got) => format!("Swapped {} for {}.", self.mon(s.amount_in), self.vin(got)),
                None => format!("Swapped {} to VIN.", self.mon(s.amount_in)),
            },
        })
    }

    pub fn quote(&self, direction: SwapDirection, out: U256) -> String {
        match direction {
            SwapDirection::TokenToNative => format!("You receive ~ {}", self.mon(out)),
            SwapDirection::NativeToToken => format!("You receive ~ {}", self.vin(out)),
        }
    }

    pub fn dice(&self, outcome: &Outcome<DiceResult>) -> String {
        self.outcome(outcome, |d| {
            let verdict = if d.won { "WIN" } else { "LOSE" };
            let roll = d.roll.map(|r| format!(" (roll {r})")).unwrap_or_default();
            let payout = match d.payout {
                Some(p) => format!(" | Payout: {}", self.vin(p)),
                None => String::new(),
            };
            format!(
                "{verdict} | Result: {}{roll} | You picked {} | Bet: {}{payout}",
                d.shown_parity,
                d.player_choice,
                self.vin(d.wagered)
            )
        })
    }

    /// "Bet27 | Numbers: 07, 42 | Total: 2 VIN" and the draw line.
    pub fn lotto(&self, outcome: &Outcome<LottoResult>) -> String {
        self.outcome(outcome, |l| {
            let numbers = l
                .numbers
                .iter()
                .map(|n| format!("{n:02}"))
                .collect::<Vec<_>>()
                .join(", ");
            let draws = l
                .results
                .iter()
                .map(|n| format!("{n:02}"))
                .collect::<Vec<_>>()
                .join(" ");
            let verdict = if l.won() {
                format!("WIN {}", self.vin(l.total_payout))
            } else {
                "LOSE".to_string()
            };
            format!(
                "{} | Numbers: {numbers} | Total: {} | Draws: {draws} | {verdict}",
                l.mode.label(),
                self.vin(l.total_bet)
            )
        })
    }

    pub fn price(&self, reading: &PriceReading) -> String {
        match reading {
            PriceReading::Unavailable => "Price unavailable".to_string(),
            PriceReading::Quote(q) => format!("MON ${:.4} | VIN ${:.4}", q.mon_usd, q.vin_usd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LottoMode, Parity};
    use crate::network::price_feed::PriceQuote;
    use alloy::primitives::Address;

    fn presenter() -> Presenter {
        Presenter::new(0, Some("https://monadexplorer.com/".to_string()))
    }

    #[test]
    fn stage_lines_match_progress() {
        let p = presenter();
        let signing = ActionEvent {
            kind: ActionKind::DicePlay,
            stage: ActionStage::AwaitingSignature,
        };
        assert_eq!(p.stage(&signing), "Dice: Signing...");
        let waiting = ActionEvent {
            kind: ActionKind::Swap,
            stage: ActionStage::Submitted(TxHash::ZERO),
        };
        assert_eq!(p.stage(&waiting), "Swap: Waiting confirmation...");
    }

    #[test]
    fn errors_have_distinct_messages() {
        let p = presenter();
        assert_eq!(p.error(&ActionError::UserRejected), "Rejected in wallet.");
        assert_eq!(
            p.error(&ActionError::ApprovalRequired {
                spender: crate::domain::model::ContractId::Dice,
                required: U256::from(1u64),
                allowance: U256::ZERO,
            }),
            "Approval required for Dice."
        );
        assert_ne!(
            p.error(&ActionError::InsufficientFunds),
            p.error(&ActionError::ContractReverted { reason: None })
        );
    }

    #[test]
    fn unknown_outcome_says_no_event() {
        let p = presenter();
        let line = p.dice(&Outcome::ConfirmedUnknown {
            tx_hash: TxHash::ZERO,
        });
        assert!(line.starts_with("Confirmed. (No event parsed)"));
        assert!(line.contains("https://monadexplorer.com/tx/0x"));
    }

    #[test]
    fn dice_line_shows_parity_from_won_flag() {
        let p = presenter();
        let result = DiceResult {
            wagered: U256::from(5u64),
            player_choice: Parity::Even,
            on_chain_outcome: Parity::Even,
            roll: Some(42),
            won: false,
            payout: None,
            shown_parity: Parity::Odd,
            tx_hash: TxHash::ZERO,
        };
        let line = p.dice(&Outcome::Confirmed {
            tx_hash: TxHash::ZERO,
            details: result,
        });
        assert!(line.starts_with("LOSE | Result: ODD (roll 42) | You picked EVEN"));
    }

    #[test]
    fn lotto_summary_pads_numbers() {
        let p = presenter();
        let result = LottoResult {
            mode: LottoMode::BetOne,
            numbers: vec![7, 42],
            amounts: vec![U256::from(1u64), U256::from(1u64)],
            results: vec![7; 27],
            total_bet: U256::from(2u64),
            total_payout: U256::from(70u64),
            tx_hash: TxHash::ZERO,
        };
        let line = p.lotto(&Outcome::Confirmed {
            tx_hash: TxHash::ZERO,
            details: result,
        });
        assert!(line.starts_with("BetOne | Numbers: 07, 42 | Total: 2 VIN"));
        assert!(line.contains("WIN 70 VIN"));
    }

    #[test]
    fn session_and_price_lines() {
        let p = presenter();
        assert_eq!(p.session(&Session::disconnected()), "Not connected");
        let wrong = Session {
            state: ConnectionState::WrongChain,
            account: Some(Address::ZERO),
            chain_id: Some(1),
        };
        assert!(p.session(&wrong).starts_with("Wrong network (chain 1)"));
        assert_eq!(p.price(&PriceReading::Unavailable), "Price unavailable");
        let quote = PriceReading::Quote(PriceQuote {
            mon_usd: 0.02,
            vin_usd: 2.0,
            source: "test".to_string(),
        });
        assert_eq!(p.price(&quote), "MON $0.0200 | VIN $2.0000");
    }
}
