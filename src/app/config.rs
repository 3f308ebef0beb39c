// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::{
    CHAIN_MONAD, CHAIN_MONAD_NAME, COINGECKO_MONAD_USD, DEFAULT_PRICE_POLL_SECS,
    DEFAULT_RECEIPT_POLL_MS, MIN_PRICE_POLL_SECS, MIN_RECEIPT_POLL_MS, MONAD_EXPLORER,
    MONAD_PUBLIC_RPC, NATIVE_DECIMALS, NATIVE_SYMBOL, VIN_DICE, VIN_LOTTO, VIN_SWAP, VIN_TOKEN,
};
use crate::domain::error::AppError;
use crate::domain::model::NetworkParams;
use crate::infrastructure::data::contracts::{DiceProfile, LottoProfile};
use crate::network::local_wallet::{ConsentPolicy, LocalWallet};
use crate::services::session::Deployment;
use alloy::primitives::Address;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,

    // Network
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: Option<String>,

    // Deployment
    #[serde(default = "default_token_address")]
    pub token_address: String,
    #[serde(default = "default_swap_address")]
    pub swap_address: String,
    #[serde(default = "default_dice_address")]
    pub dice_address: String,
    #[serde(default = "default_lotto_address")]
    pub lotto_address: String,
    /// "roll_v2" or "legacy"
    #[serde(default = "default_dice_profile")]
    pub dice_profile: String,
    /// "flat_arrays" or "struct_bets"
    #[serde(default = "default_lotto_profile")]
    pub lotto_profile: String,

    // Wallet
    pub wallet_key: Option<String>,
    #[serde(default = "default_wallet_consent")]
    pub wallet_consent: String,
    /// Chain the local wallet starts on. Defaults to the target chain.
    pub wallet_chain_id: Option<u64>,
    pub wallet_rpc_url: Option<String>,
    #[serde(default = "default_true")]
    pub wallet_authorized: bool,

    // Polling
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_price_url")]
    pub price_url: String,
    #[serde(default = "default_price_poll_secs")]
    pub price_poll_secs: u64,
}

fn default_debug() -> bool {
    false
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_chain_id() -> u64 {
    CHAIN_MONAD
}
fn default_chain_name() -> String {
    CHAIN_MONAD_NAME.to_string()
}
fn default_rpc_url() -> String {
    MONAD_PUBLIC_RPC.to_string()
}
fn default_explorer_url() -> Option<String> {
    Some(MONAD_EXPLORER.to_string())
}
fn default_token_address() -> String {
    format!("{VIN_TOKEN:#x}")
}
fn default_swap_address() -> String {
    format!("{VIN_SWAP:#x}")
}
fn default_dice_address() -> String {
    format!("{VIN_DICE:#x}")
}
fn default_lotto_address() -> String {
    format!("{VIN_LOTTO:#x}")
}
fn default_dice_profile() -> String {
    DiceProfile::default().to_string()
}
fn default_lotto_profile() -> String {
    LottoProfile::default().to_string()
}
fn default_wallet_consent() -> String {
    ConsentPolicy::default().to_string()
}
fn default_receipt_poll_ms() -> u64 {
    DEFAULT_RECEIPT_POLL_MS
}
fn default_price_url() -> String {
    COINGECKO_MONAD_USD.to_string()
}
fn default_price_poll_secs() -> u64 {
    DEFAULT_PRICE_POLL_SECS
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = resolve_config_path(path) {
            builder = builder.add_source(File::from(Path::new(&selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Precedence: CLI (in main) > env/.env > config file.
        builder = builder.add_source(Environment::default());

        let settings: GlobalSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    /// Fails on the first malformed address, profile, URL or policy.
    pub fn validate(&self) -> Result<(), AppError> {
        self.deployment()?;
        self.consent()?;
        Url::parse(&self.price_url)
            .map_err(|e| AppError::Config(format!("Invalid price_url '{}': {}", self.price_url, e)))?;
        if let Some(url) = self.wallet_rpc_url.as_deref() {
            parse_url("wallet_rpc_url", url)?;
        }
        Ok(())
    }

    pub fn network_params(&self) -> Result<NetworkParams, AppError> {
        parse_url("rpc_url", &self.rpc_url)?;
        Ok(NetworkParams {
            chain_id: self.chain_id,
            name: self.chain_name.clone(),
            rpc_url: self.rpc_url.clone(),
            explorer_url: self
                .explorer_url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            native_symbol: NATIVE_SYMBOL.to_string(),
            native_decimals: NATIVE_DECIMALS,
        })
    }

    pub fn deployment(&self) -> Result<Deployment, AppError> {
        Ok(Deployment {
            network: self.network_params()?,
            token: parse_address("token_address", &self.token_address)?,
            swap: parse_address("swap_address", &self.swap_address)?,
            dice: parse_address("dice_address", &self.dice_address)?,
            lotto: parse_address("lotto_address", &self.lotto_address)?,
            dice_profile: DiceProfile::from_str(&self.dice_profile).map_err(AppError::Config)?,
            lotto_profile: LottoProfile::from_str(&self.lotto_profile)
                .map_err(AppError::Config)?,
            receipt_poll: self.receipt_poll(),
        })
    }

    pub fn consent(&self) -> Result<ConsentPolicy, AppError> {
        ConsentPolicy::from_str(&self.wallet_consent)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms.max(MIN_RECEIPT_POLL_MS))
    }

    pub fn price_poll(&self) -> Duration {
        Duration::from_secs(self.price_poll_secs.max(MIN_PRICE_POLL_SECS))
    }

    fn wallet_key_value(&self) -> Option<String> {
        std::env::var("WALLET_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.wallet_key
                    .as_ref()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
    }

    /// Local wallet built from `wallet_key`, or `None` when no key is set.
    pub fn local_wallet(&self) -> Result<Option<LocalWallet>, AppError> {
        let Some(key) = self.wallet_key_value() else {
            return Ok(None);
        };
        let chain_id = self.wallet_chain_id.unwrap_or(self.chain_id);
        let rpc_url = self.wallet_rpc_url.as_deref().unwrap_or(&self.rpc_url);
        let wallet = LocalWallet::from_key(&key, self.consent()?, chain_id, rpc_url)?
            .with_authorized(self.wallet_authorized);
        tracing::info!(
            target: "config",
            address = %wallet.address(),
            chain_id,
            consent = %self.wallet_consent,
            "Local wallet loaded"
        );
        Ok(Some(wallet))
    }
}

fn parse_address(field: &str, raw: &str) -> Result<Address, AppError> {
    Address::from_str(raw.trim()).map_err(|_| AppError::InvalidAddress(format!("{field} -> {raw}")))
}

fn parse_url(field: &str, raw: &str) -> Result<Url, AppError> {
    Url::parse(raw.trim()).map_err(|e| AppError::Config(format!("Invalid {field} '{raw}': {e}")))
}

fn resolve_config_path(path: Option<&str>) -> Option<String> {
    if let Some(path) = path {
        return Some(path.to_string());
    }
    ["config.toml", "config.yaml", "config.json"]
        .into_iter()
        .find(|p| Path::new(p).exists())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    fn env_lock_guard() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn base_settings() -> GlobalSettings {
        GlobalSettings {
            debug: false,
            log_level: default_log_level(),
            log_json: false,
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            rpc_url: default_rpc_url(),
            explorer_url: default_explorer_url(),
            token_address: default_token_address(),
            swap_address: default_swap_address(),
            dice_address: default_dice_address(),
            lotto_address: default_lotto_address(),
            dice_profile: default_dice_profile(),
            lotto_profile: default_lotto_profile(),
            wallet_key: None,
            wallet_consent: default_wallet_consent(),
            wallet_chain_id: None,
            wallet_rpc_url: None,
            wallet_authorized: true,
            receipt_poll_ms: default_receipt_poll_ms(),
            price_url: default_price_url(),
            price_poll_secs: default_price_poll_secs(),
        }
    }

    #[test]
    fn defaults_describe_the_monad_deployment() {
        let settings = base_settings();
        let deployment = settings.deployment().unwrap();
        assert_eq!(deployment, Deployment::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn bad_address_is_rejected() {
        let mut settings = base_settings();
        settings.dice_address = "0x1234".to_string();
        match settings.deployment() {
            Err(AppError::InvalidAddress(msg)) => assert!(msg.starts_with("dice_address")),
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let mut settings = base_settings();
        settings.lotto_profile = "pachinko".to_string();
        assert!(matches!(settings.deployment(), Err(AppError::Config(_))));
        settings.lotto_profile = "struct_bets".to_string();
        assert_eq!(
            settings.deployment().unwrap().lotto_profile,
            LottoProfile::StructBets
        );
    }

    #[test]
    fn poll_intervals_have_safe_floor() {
        let mut settings = base_settings();
        settings.receipt_poll_ms = 0;
        settings.price_poll_secs = 1;
        assert_eq!(settings.receipt_poll(), Duration::from_millis(MIN_RECEIPT_POLL_MS));
        assert_eq!(settings.price_poll(), Duration::from_secs(MIN_PRICE_POLL_SECS));
    }

    #[test]
    fn empty_explorer_is_dropped() {
        let mut settings = base_settings();
        settings.explorer_url = Some("  ".to_string());
        assert_eq!(settings.network_params().unwrap().explorer_url, None);
    }

    #[test]
    fn no_key_means_no_wallet() {
        let _env_lock = env_lock_guard();
        let old = std::env::var("WALLET_KEY").ok();
        unsafe { std::env::remove_var("WALLET_KEY") };

        let settings = base_settings();
        assert!(settings.local_wallet().unwrap().is_none());

        if let Some(v) = old {
            unsafe { std::env::set_var("WALLET_KEY", v) };
        }
    }

    #[test]
    fn bad_consent_policy_fails_validation() {
        let mut settings = base_settings();
        settings.wallet_consent = "maybe".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn explicit_config_path_wins() {
        assert_eq!(
            resolve_config_path(Some("custom.toml")).as_deref(),
            Some("custom.toml")
        );
    }
}
