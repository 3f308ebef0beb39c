// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::error::AppError;
use crate::common::retry::retry_async;
use crate::domain::constants::{
    DEFAULT_BASE_FEE_WEI, DEFAULT_PRIORITY_FEE_WEI, GAS_LIMIT_BUFFER_BPS,
};
use crate::network::provider::HttpProvider;
use alloy::providers::Provider;
use alloy::rpc::types::BlockNumberOrTag;
use alloy::rpc::types::eth::FeeHistory;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct GasOracle {
    provider: HttpProvider,
    last_good: Arc<Mutex<Option<GasFees>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasFees {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub next_base_fee_per_gas: u128,
}

impl GasOracle {
    pub fn new(provider: HttpProvider) -> Self {
        Self {
            provider,
            last_good: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn estimate_eip1559_fees(&self) -> Result<GasFees, AppError> {
        match self.with_retry_history().await {
            Ok(history) => {
                let fees = fees_from_history(&history)?;
                if let Ok(mut guard) = self.last_good.lock() {
                    *guard = Some(fees.clone());
                }
                Ok(fees)
            }
            Err(e) => {
                tracing::debug!(target: "wallet", error = %e, "feeHistory unavailable");
                if let Ok(guard) = self.last_good.lock()
                    && let Some(fees) = guard.clone()
                {
                    return Ok(fees);
                }
                self.fallback_estimate().await
            }
        }
    }

    async fn with_retry_history(&self) -> Result<FeeHistory, AppError> {
        let provider = self.provider.clone();
        retry_async(
            move |_| {
                let provider = provider.clone();
                async move {
                    provider
                        .get_fee_history(5, BlockNumberOrTag::Latest, &[50.0f64])
                        .await
                }
            },
            2,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("Fee History failed: {}", e)))
    }

    /// For nodes that disable feeHistory (common on public RPCs).
    async fn fallback_estimate(&self) -> Result<GasFees, AppError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| AppError::Connection(format!("Latest block fetch failed: {}", e)))?;

        let base: u128 = block
            .as_ref()
            .and_then(|b| b.header.base_fee_per_gas)
            .map(|v| v as u128)
            .unwrap_or(DEFAULT_BASE_FEE_WEI);

        let priority: u128 = self
            .provider
            .get_max_priority_fee_per_gas()
            .await
            .unwrap_or(DEFAULT_PRIORITY_FEE_WEI);

        Ok(fees_from_samples(base, None, &[priority]))
    }
}

fn fees_from_history(history: &FeeHistory) -> Result<GasFees, AppError> {
    let latest_base_fee = history
        .latest_block_base_fee()
        .or_else(|| history.base_fee_per_gas.last().copied())
        .ok_or(AppError::Initialization("No base fee history".into()))?;
    let tips: Vec<u128> = history
        .reward
        .as_ref()
        .map(|rewards| rewards.iter().filter_map(|r| r.first().copied()).collect())
        .unwrap_or_default();
    Ok(fees_from_samples(
        latest_base_fee,
        history.next_block_base_fee(),
        &tips,
    ))
}

/// `max_fee = next_base + avg(tip)`; next base defaults to latest + 12.5%.
pub fn fees_from_samples(latest_base: u128, next_base: Option<u128>, tips: &[u128]) -> GasFees {
    let next_base_fee = match next_base {
        Some(v) if v > 0 => v,
        _ => latest_base.saturating_mul(1125) / 1000,
    };
    let priority = if tips.is_empty() {
        DEFAULT_PRIORITY_FEE_WEI
    } else {
        tips.iter().fold(0u128, |acc, t| acc.saturating_add(*t)) / tips.len() as u128
    };
    GasFees {
        max_fee_per_gas: next_base_fee.saturating_add(priority),
        max_priority_fee_per_gas: priority,
        next_base_fee_per_gas: next_base_fee,
    }
}

/// Pad an `eth_estimateGas` result so small state drift does not run out of gas.
pub fn buffered_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(GAS_LIMIT_BUFFER_BPS) / 10_000
}
