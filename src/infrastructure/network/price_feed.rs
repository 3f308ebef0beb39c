// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::error::AppError;
use crate::common::retry::retry_async;
use crate::domain::constants::{COINGECKO_MONAD_ID, MIN_PRICE_POLL_SECS, MON_PER_VIN};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

const CACHE_TTL: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct PriceQuote {
    pub mon_usd: f64,
    /// Derived from the fixed swap rate, not quoted anywhere.
    pub vin_usd: f64,
    pub source: String,
}

/// Last known state of the ticker. Failures publish `Unavailable` and never
/// reach the action paths.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum PriceReading {
    #[default]
    Unavailable,
    Quote(PriceQuote),
}

#[derive(Clone)]
pub struct PriceFeed {
    client: Client,
    url: String,
    coin_id: String,
    cache: Arc<RwLock<Option<(PriceQuote, Instant)>>>,
}

impl PriceFeed {
    pub fn new(url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Initialization(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
            coin_id: COINGECKO_MONAD_ID.to_string(),
            cache: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn get_quote(&self) -> Result<PriceQuote, AppError> {
        {
            let read_guard = self.cache.read().await;
            if let Some((quote, timestamp)) = read_guard.as_ref()
                && timestamp.elapsed().as_secs() < CACHE_TTL
            {
                return Ok(quote.clone());
            }
        }

        let client = self.client.clone();
        let url = self.url.clone();
        let body = retry_async(
            move |_| {
                let client = client.clone();
                let url = url.clone();
                async move { fetch_json(&client, &url).await }
            },
            2,
            Duration::from_millis(250),
        )
        .await?;

        let mon_usd = usd_price(&body, &self.coin_id).ok_or_else(|| AppError::ApiCall {
            provider: "CoinGecko JSON".into(),
            status: 0,
        })?;
        let quote = PriceQuote {
            mon_usd,
            vin_usd: mon_usd * MON_PER_VIN as f64,
            source: "coingecko".into(),
        };
        *self.cache.write().await = Some((quote.clone(), Instant::now()));
        Ok(quote)
    }

    pub async fn reading(&self) -> PriceReading {
        match self.get_quote().await {
            Ok(quote) => PriceReading::Quote(quote),
            Err(e) => {
                tracing::warn!(target: "price", error = %e, "Price unavailable");
                PriceReading::Unavailable
            }
        }
    }
}

async fn fetch_json(client: &Client, url: &str) -> Result<Value, AppError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Connection(format!("Price request failed: {}", e)))?;
    if !resp.status().is_success() {
        return Err(AppError::ApiCall {
            provider: "CoinGecko".into(),
            status: resp.status().as_u16(),
        });
    }
    resp.json().await.map_err(|_| AppError::ApiCall {
        provider: "CoinGecko JSON".into(),
        status: 0,
    })
}

/// `{"monad":{"usd":0.0123}}` -> 0.0123. Non-positive prices are treated as missing.
pub fn usd_price(body: &Value, coin_id: &str) -> Option<f64> {
    body.get(coin_id)?
        .get("usd")?
        .as_f64()
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// Background poller publishing into a watch channel.
pub struct PriceTicker;

impl PriceTicker {
    pub fn spawn(feed: PriceFeed, every: Duration) -> (watch::Receiver<PriceReading>, JoinHandle<()>) {
        let every = every.max(Duration::from_secs(MIN_PRICE_POLL_SECS));
        let (tx, rx) = watch::channel(PriceReading::Unavailable);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let reading = feed.reading().await;
                if tx.send(reading).is_err() {
                    tracing::debug!(target: "price", "Ticker stopped: no receivers");
                    break;
                }
            }
        });
        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_coingecko_shape() {
        let body = json!({ "monad": { "usd": 0.025 } });
        assert_eq!(usd_price(&body, "monad"), Some(0.025));
        assert_eq!(usd_price(&json!({}), "monad"), None);
        assert_eq!(usd_price(&json!({ "monad": { "usd": 0 } }), "monad"), None);
        assert_eq!(usd_price(&json!({ "monad": { "eur": 1.0 } }), "monad"), None);
    }

    #[tokio::test]
    async fn unreachable_endpoint_reads_as_unavailable() {
        let feed = PriceFeed::new("http://127.0.0.1:9/simple/price").unwrap();
        assert_eq!(feed.reading().await, PriceReading::Unavailable);
    }
}
