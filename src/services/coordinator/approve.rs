// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use super::Coordinator;
use crate::common::units::{check_amount_syntax, parse_amount};
use crate::domain::constants::DEFAULT_APPROVE_VIN;
use crate::domain::error::ActionError;
use crate::domain::model::{ActionKind, Allowance, ContractId, Outcome};
use crate::infrastructure::data::contracts::IVinToken;
use alloy::sol_types::SolCall;

impl Coordinator {
    /// Approve `spender` to pull VIN. `amount` defaults to 1,000,000 VIN. The
    /// reported allowance is re-read from the token after confirmation.
    pub async fn approve(
        &self,
        spender: ContractId,
        amount: Option<&str>,
    ) -> Result<Outcome<Allowance>, ActionError> {
        let kind = ActionKind::approve_for(spender).ok_or_else(|| {
            ActionError::validation("spender", format!("{spender} does not spend VIN"))
        })?;
        let Some(_lock) = self.locks.try_acquire(kind) else {
            return Ok(Outcome::Skipped(kind));
        };

        let result = self
            .run_approve(kind, spender, amount.unwrap_or(DEFAULT_APPROVE_VIN))
            .await;
        self.finish(kind, self.session.session().account, &result)
            .await;
        result
    }

    async fn run_approve(
        &self,
        kind: ActionKind,
        spender: ContractId,
        raw: &str,
    ) -> Result<Outcome<Allowance>, ActionError> {
        check_amount_syntax("amount", raw)?;
        let account = self.ensure_session().await?;
        let decimals = self.session.token_decimals().await;
        let value = parse_amount("amount", raw, decimals)?;

        let token = self.session.binding(ContractId::Token);
        let spender_addr = self.session.deployment().address_of(spender);
        let call = IVinToken::approveCall {
            spender: spender_addr,
            amount: value,
        };
        let receipt = self
            .send_and_confirm(kind, &token, call.abi_encode().into(), None)
            .await?;
        tracing::info!(target: "session", spender = %spender, tx_hash = %receipt.tx_hash, "Approval confirmed");

        Ok(match self.allowance(account, spender).await {
            Ok(current) => Outcome::Confirmed {
                tx_hash: receipt.tx_hash,
                details: Allowance {
                    owner: account,
                    spender: spender_addr,
                    amount: current,
                },
            },
            Err(e) => {
                tracing::warn!(target: "session", error = %e, "Allowance re-read failed");
                Outcome::ConfirmedUnknown {
                    tx_hash: receipt.tx_hash,
                }
            }
        })
    }
}
