// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use super::Coordinator;
use crate::common::units::{check_amount_syntax, format_amount, parse_amount};
use crate::domain::constants::LOTTO_MAX_NUMBER;
use crate::domain::error::ActionError;
use crate::domain::model::{
    ActionKind, ContractId, LottoMode, LottoResult, LottoRow, LottoRowInput, LottoTicket, Outcome,
};
use crate::infrastructure::data::contracts::{ContractProfile, IVinLotto, LottoProfile};
use alloy::primitives::U256;

/// Editable ticket rows. Always holds at least one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LottoDraft {
    rows: Vec<LottoRowInput>,
    mode: LottoMode,
}

impl Default for LottoDraft {
    fn default() -> Self {
        Self {
            rows: vec![LottoRowInput::default()],
            mode: LottoMode::default(),
        }
    }
}

impl LottoDraft {
    pub fn rows(&self) -> &[LottoRowInput] {
        &self.rows
    }

    pub fn mode(&self) -> LottoMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LottoMode) {
        self.mode = mode;
    }

    pub fn add_row(&mut self) -> usize {
        self.rows.push(LottoRowInput::default());
        self.rows.len() - 1
    }

    pub fn set_row(&mut self, idx: usize, row: LottoRowInput) -> Result<(), ActionError> {
        let slot = self
            .rows
            .get_mut(idx)
            .ok_or_else(|| ActionError::validation("row", format!("no row {idx}")))?;
        *slot = row;
        Ok(())
    }

    /// Removing the last row leaves one empty row behind.
    pub fn remove_row(&mut self, idx: usize) {
        if idx < self.rows.len() {
            self.rows.remove(idx);
        }
        if self.rows.is_empty() {
            self.rows.push(LottoRowInput::default());
        }
    }

    pub fn reset(&mut self) {
        self.rows = vec![LottoRowInput::default()];
    }

    /// Live total of the rows that currently parse. Speculative display only;
    /// `None` once the sum overflows.
    pub fn total_preview(&self, decimals: u8) -> Option<U256> {
        self.rows
            .iter()
            .filter_map(|r| parse_amount("amount", &r.amount, decimals).ok())
            .try_fold(U256::ZERO, |acc, v| acc.checked_add(v))
    }
}

fn parse_number(raw: &str) -> Option<u8> {
    let s = raw.trim();
    if s.is_empty() || s.len() > 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u8>().ok().filter(|n| *n <= LOTTO_MAX_NUMBER)
}

/// Network-free pass over every row; the first bad row rejects the batch.
pub fn check_rows(rows: &[LottoRowInput]) -> Result<Vec<(u8, String)>, ActionError> {
    if rows.is_empty() {
        return Err(ActionError::validation("rows", "add at least one row"));
    }
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let number = parse_number(&row.number).ok_or_else(|| {
                ActionError::validation(
                    format!("rows[{idx}].number"),
                    format!("'{}' is not a number in 00-{LOTTO_MAX_NUMBER}", row.number.trim()),
                )
            })?;
            let amount = check_amount_syntax(&format!("rows[{idx}].amount"), &row.amount)?;
            Ok((number, amount))
        })
        .collect()
}

/// Full validation at the token's precision.
pub fn build_ticket(
    rows: &[LottoRowInput],
    mode: LottoMode,
    decimals: u8,
) -> Result<LottoTicket, ActionError> {
    let checked = check_rows(rows)?;
    let rows = checked
        .into_iter()
        .enumerate()
        .map(|(idx, (number, amount))| {
            parse_amount(&format!("rows[{idx}].amount"), &amount, decimals)
                .map(|amount| LottoRow { number, amount })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let ticket = LottoTicket { rows, mode };
    if ticket.total().is_none() {
        return Err(ActionError::validation("total", "total bet is too large"));
    }
    Ok(ticket)
}

impl Coordinator {
    pub fn draft(&self) -> LottoDraft {
        match self.draft.lock() {
            Ok(d) => d.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn edit_draft<R>(&self, f: impl FnOnce(&mut LottoDraft) -> R) -> R {
        let mut guard = match self.draft.lock() {
            Ok(d) => d,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut *guard)
    }

    /// Submit the current draft; a confirmed submission resets it to one empty row.
    pub async fn play_draft(&self) -> Result<Outcome<LottoResult>, ActionError> {
        let draft = self.draft();
        let result = self.play_lotto(draft.rows(), draft.mode()).await;
        if matches!(
            result,
            Ok(Outcome::Confirmed { .. } | Outcome::ConfirmedUnknown { .. })
        ) {
            self.edit_draft(LottoDraft::reset);
        }
        result
    }

    pub async fn play_lotto(
        &self,
        rows: &[LottoRowInput],
        mode: LottoMode,
    ) -> Result<Outcome<LottoResult>, ActionError> {
        let kind = ActionKind::LottoPlay;
        let Some(_lock) = self.locks.try_acquire(kind) else {
            return Ok(Outcome::Skipped(kind));
        };
        let result = self.run_lotto(rows, mode).await;
        self.finish(kind, self.session.session().account, &result)
            .await;
        result
    }

    async fn run_lotto(
        &self,
        rows: &[LottoRowInput],
        mode: LottoMode,
    ) -> Result<Outcome<LottoResult>, ActionError> {
        check_rows(rows)?;
        let account = self.ensure_session().await?;
        let decimals = self.session.token_decimals().await;
        let ticket = build_ticket(rows, mode, decimals)?;
        let total = ticket
            .total()
            .ok_or_else(|| ActionError::validation("total", "total bet is too large"))?;

        let lotto = self.session.binding(ContractId::Lotto);
        if let Ok(min) = lotto.read(&IVinLotto::MIN_BETCall {}).await
            && total < min
        {
            return Err(ActionError::validation(
                "total",
                format!(
                    "total bet too small, minimum is {} VIN",
                    format_amount(min, decimals, 6)
                ),
            ));
        }
        self.require_allowance(account, ContractId::Lotto, total)
            .await?;

        let profile = match lotto.profile {
            ContractProfile::Lotto(p) => p,
            _ => LottoProfile::default(),
        };
        let receipt = self
            .send_and_confirm(ActionKind::LottoPlay, &lotto, profile.encode_play(&ticket), None)
            .await?;

        let Some(played) = lotto
            .own_logs(&receipt)
            .find_map(|log| profile.decode_played(log).ok())
        else {
            tracing::warn!(
                target: "lotto",
                tx_hash = %receipt.tx_hash,
                profile = %profile,
                "Confirmed but no Played event decoded"
            );
            return Ok(Outcome::ConfirmedUnknown {
                tx_hash: receipt.tx_hash,
            });
        };

        if played.total_bet != total {
            tracing::warn!(
                target: "lotto",
                submitted = %total,
                reported = %played.total_bet,
                "Contract reported a different total bet"
            );
        }
        let result = LottoResult {
            mode,
            numbers: played.numbers,
            amounts: played.amounts,
            results: played.results,
            total_bet: played.total_bet,
            total_payout: played.total_payout,
            tx_hash: receipt.tx_hash,
        };
        tracing::info!(
            target: "lotto",
            tx_hash = %result.tx_hash,
            mode = mode.label(),
            rows = ticket.rows.len(),
            won = result.won(),
            "Lotto settled"
        );
        Ok(Outcome::Confirmed {
            tx_hash: receipt.tx_hash,
            details: result,
        })
    }
}
