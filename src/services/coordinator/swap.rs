// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use super::Coordinator;
use crate::common::units::{check_amount_syntax, format_plain, parse_amount};
use crate::domain::constants::{MON_PER_VIN, NATIVE_DECIMALS, SWAP_MAX_GAS_BUFFER_MON};
use crate::domain::error::ActionError;
use crate::domain::model::{ActionKind, ContractId, Outcome, SwapDirection};
use crate::infrastructure::data::contracts::{IVinSwap, IVinToken, transferred_between};
use alloy::primitives::U256;
use alloy::sol_types::SolCall;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub direction: SwapDirection,
    pub amount_in: U256,
    /// VIN credited to the player, from the receipt's `Transfer` logs.
    pub token_received: Option<U256>,
}

/// Speculative output at the fixed rate. Display only; never used to decide anything.
pub fn preview_swap(direction: SwapDirection, amount_in: U256, token_decimals: u8) -> U256 {
    let rate = U256::from(MON_PER_VIN);
    let token_unit = U256::from(10u64).pow(U256::from(token_decimals));
    let native_unit = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS));
    match direction {
        SwapDirection::TokenToNative => {
            amount_in.saturating_mul(rate).saturating_mul(native_unit) / token_unit
        }
        SwapDirection::NativeToToken => {
            amount_in.saturating_mul(token_unit) / native_unit.saturating_mul(rate)
        }
    }
}

fn source_decimals(direction: SwapDirection, token_decimals: u8) -> u8 {
    match direction {
        SwapDirection::TokenToNative => token_decimals,
        SwapDirection::NativeToToken => NATIVE_DECIMALS,
    }
}

impl Coordinator {
    pub async fn quote(&self, direction: SwapDirection, amount: &str) -> Result<U256, ActionError> {
        let decimals = self.session.token_decimals().await;
        let amount_in = parse_amount("amount", amount, source_decimals(direction, decimals))?;
        Ok(preview_swap(direction, amount_in, decimals))
    }

    /// Largest input the player can send: all VIN, or MON minus a gas reserve.
    pub async fn max_swap_input(&self, direction: SwapDirection) -> Result<U256, ActionError> {
        let account = self.ensure_session().await?;
        let token = self.session.binding(ContractId::Token);
        match direction {
            SwapDirection::TokenToNative => token.read(&IVinToken::balanceOfCall { account }).await,
            SwapDirection::NativeToToken => {
                let balance = token.native_balance(account).await?;
                let reserve = parse_amount("gas_buffer", SWAP_MAX_GAS_BUFFER_MON, NATIVE_DECIMALS)?;
                Ok(balance.saturating_sub(reserve))
            }
        }
    }

    pub async fn swap_max(
        &self,
        direction: SwapDirection,
    ) -> Result<Outcome<SwapReceipt>, ActionError> {
        let max = self.max_swap_input(direction).await?;
        if max.is_zero() {
            return Err(ActionError::validation("amount", "nothing available to swap"));
        }
        let decimals = self.session.token_decimals().await;
        let raw = format_plain(max, source_decimals(direction, decimals));
        self.swap(direction, &raw).await
    }

    pub async fn swap(
        &self,
        direction: SwapDirection,
        amount: &str,
    ) -> Result<Outcome<SwapReceipt>, ActionError> {
        let kind = ActionKind::Swap;
        let Some(_lock) = self.locks.try_acquire(kind) else {
            return Ok(Outcome::Skipped(kind));
        };
        let result = self.run_swap(direction, amount).await;
        self.finish(kind, self.session.session().account, &result)
            .await;
        result
    }

    async fn run_swap(
        &self,
        direction: SwapDirection,
        raw: &str,
    ) -> Result<Outcome<SwapReceipt>, ActionError> {
        check_amount_syntax("amount", raw)?;
        let account = self.ensure_session().await?;
        let decimals = self.session.token_decimals().await;
        let amount_in = parse_amount("amount", raw, source_decimals(direction, decimals))?;

        let swap = self.session.binding(ContractId::Swap);
        let (data, value) = match direction {
            SwapDirection::TokenToNative => {
                self.require_allowance(account, ContractId::Swap, amount_in)
                    .await?;
                (
                    IVinSwap::swapVINtoMONCall {
                        vinAmount: amount_in,
                    }
                    .abi_encode(),
                    None,
                )
            }
            SwapDirection::NativeToToken => {
                (IVinSwap::swapMONtoVINCall {}.abi_encode(), Some(amount_in))
            }
        };

        let receipt = self
            .send_and_confirm(ActionKind::Swap, &swap, data.into(), value)
            .await?;
        let token_received = match direction {
            SwapDirection::NativeToToken => transferred_between(
                &receipt.logs,
                self.session.deployment().token,
                swap.address,
                account,
            ),
            SwapDirection::TokenToNative => None,
        };
        tracing::info!(
            target: "swap",
            direction = ?direction,
            amount_in = %amount_in,
            tx_hash = %receipt.tx_hash,
            "Swap confirmed"
        );
        Ok(Outcome::Confirmed {
            tx_hash: receipt.tx_hash,
            details: SwapReceipt {
                direction,
                amount_in,
                token_received,
            },
        })
    }
}
