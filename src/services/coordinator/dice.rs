// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use super::{Coordinator, RollingGuard};
use crate::common::units::{check_amount_syntax, format_amount, parse_amount};
use crate::domain::error::ActionError;
use crate::domain::model::{ActionKind, ContractId, DiceResult, Outcome, Parity};
use crate::infrastructure::data::contracts::{
    ContractProfile, DiceProfile, IVinDice, transferred_between,
};
use alloy::primitives::U256;
use alloy::sol_types::SolCall;

/// Parity shown to the player: the choice when the event says `won`, the
/// opposite otherwise. Cosmetic only; payout always comes from the chain.
pub fn shown_parity(choice: Parity, won: bool) -> Parity {
    if won { choice } else { choice.opposite() }
}

/// Client entropy mixed into the contract's own randomness.
pub fn client_seed() -> U256 {
    let noise = U256::from_be_bytes(rand::random::<[u8; 32]>());
    let now = U256::from(chrono::Utc::now().timestamp_millis().unsigned_abs());
    noise ^ now
}

/// Reject bets outside the readable limits. Limits that fail to load are skipped.
fn check_bet_limits(
    amount: U256,
    min: Option<U256>,
    max: Option<U256>,
    max_allowed: Option<U256>,
    decimals: u8,
) -> Result<(), ActionError> {
    if let Some(min) = min
        && amount < min
    {
        return Err(ActionError::validation(
            "amount",
            format!("minimum bet is {} VIN", format_amount(min, decimals, 4)),
        ));
    }
    let cap = match (max, max_allowed) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    if let Some(cap) = cap
        && amount > cap
    {
        return Err(ActionError::validation(
            "amount",
            format!("maximum bet is {} VIN", format_amount(cap, decimals, 4)),
        ));
    }
    Ok(())
}

impl Coordinator {
    pub async fn play_dice(
        &self,
        amount: &str,
        choice: Parity,
    ) -> Result<Outcome<DiceResult>, ActionError> {
        let kind = ActionKind::DicePlay;
        let Some(_lock) = self.locks.try_acquire(kind) else {
            tracing::debug!(target: "dice", "Play already in flight; ignoring");
            return Ok(Outcome::Skipped(kind));
        };
        let result = self.run_dice(amount, choice).await;
        self.finish(kind, self.session.session().account, &result)
            .await;
        result
    }

    async fn run_dice(
        &self,
        raw: &str,
        choice: Parity,
    ) -> Result<Outcome<DiceResult>, ActionError> {
        check_amount_syntax("amount", raw)?;
        let account = self.ensure_session().await?;
        let decimals = self.session.token_decimals().await;
        let amount = parse_amount("amount", raw, decimals)?;

        let dice = self.session.binding(ContractId::Dice);
        let max_allowed_call = IVinDice::maxBetAllowedCall { player: account };
        let (min, max, max_allowed) = tokio::join!(
            dice.read(&IVinDice::MIN_BETCall {}),
            dice.read(&IVinDice::MAX_BETCall {}),
            dice.read(&max_allowed_call),
        );
        check_bet_limits(amount, min.ok(), max.ok(), max_allowed.ok(), decimals)?;
        self.require_allowance(account, ContractId::Dice, amount)
            .await?;

        let call = IVinDice::playCall {
            amount,
            choice: choice.as_u8(),
            clientSeed: client_seed(),
        };
        let _rolling = RollingGuard::engage(&self.rolling);
        let receipt = self
            .send_and_confirm(ActionKind::DicePlay, &dice, call.abi_encode().into(), None)
            .await?;

        let profile = match dice.profile {
            ContractProfile::Dice(p) => p,
            _ => DiceProfile::default(),
        };
        let Some(played) = dice
            .own_logs(&receipt)
            .find_map(|log| profile.decode_played(log).ok())
        else {
            tracing::warn!(
                target: "dice",
                tx_hash = %receipt.tx_hash,
                profile = %profile,
                "Confirmed but no Played event decoded"
            );
            return Ok(Outcome::ConfirmedUnknown {
                tx_hash: receipt.tx_hash,
            });
        };

        let payout = transferred_between(
            &receipt.logs,
            self.session.deployment().token,
            dice.address,
            account,
        );
        let result = DiceResult {
            wagered: played.amount,
            player_choice: choice,
            on_chain_outcome: Parity::of(u64::from(played.outcome)),
            roll: played.roll,
            won: played.won,
            payout,
            shown_parity: shown_parity(choice, played.won),
            tx_hash: receipt.tx_hash,
        };
        tracing::info!(
            target: "dice",
            tx_hash = %result.tx_hash,
            won = result.won,
            choice = %choice,
            outcome = %result.on_chain_outcome,
            roll = ?result.roll,
            "Dice settled"
        );
        Ok(Outcome::Confirmed {
            tx_hash: receipt.tx_hash,
            details: result,
        })
    }
}
