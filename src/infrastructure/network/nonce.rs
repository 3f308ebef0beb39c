// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::error::AppError;
use crate::common::retry::retry_async;
use crate::network::provider::HttpProvider;
use alloy::primitives::Address;
use alloy::providers::Provider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Hands out nonces for one (account, chain). Different action kinds may
/// submit concurrently, so the pending count alone is not enough.
#[derive(Clone)]
pub struct NonceManager {
    provider: HttpProvider,
    address: Address,
    next: Arc<Mutex<Option<u64>>>,
}

impl NonceManager {
    pub fn new(provider: HttpProvider, address: Address) -> Self {
        Self {
            provider,
            address,
            next: Arc::new(Mutex::new(None)),
        }
    }

    /// Reserve the next nonce. The lock is held across the RPC read so two
    /// callers can never observe the same pending count.
    pub async fn reserve(&self) -> Result<u64, AppError> {
        let mut guard = self.next.lock().await;
        let on_chain = self.pending_count().await?;
        let nonce = next_nonce(on_chain, *guard);
        *guard = Some(nonce + 1);
        Ok(nonce)
    }

    /// Forget the local counter after a failed signature or broadcast.
    pub async fn resync(&self) {
        *self.next.lock().await = None;
        tracing::debug!(target: "wallet", address = %self.address, "Nonce counter reset");
    }

    /// Next nonce handed out without asking the node, if one is tracked.
    pub async fn local_next(&self) -> Option<u64> {
        *self.next.lock().await
    }

    #[cfg(test)]
    pub(crate) async fn seed(&self, next: u64) {
        *self.next.lock().await = Some(next);
    }

    async fn pending_count(&self) -> Result<u64, AppError> {
        let provider = self.provider.clone();
        let address = self.address;
        retry_async(
            move |_| {
                let provider = provider.clone();
                async move { provider.get_transaction_count(address).pending().await }
            },
            3,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("Failed to fetch nonce: {}", e)))
    }
}

pub fn next_nonce(on_chain_pending: u64, local_next: Option<u64>) -> u64 {
    match local_next {
        Some(local) => local.max(on_chain_pending),
        None => on_chain_pending,
    }
}
