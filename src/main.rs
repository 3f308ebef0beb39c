// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use vin_arcade::app::config::GlobalSettings;
use vin_arcade::app::logging::setup_logging;
use vin_arcade::app::presenter::Presenter;
use vin_arcade::domain::error::{ActionError, AppError};
use vin_arcade::domain::model::{
    ConnectMode, ContractId, LottoMode, LottoRowInput, Parity, SwapDirection,
};
use vin_arcade::infrastructure::network::price_feed::{PriceFeed, PriceTicker};
use vin_arcade::infrastructure::network::provider::RpcChainReader;
use vin_arcade::infrastructure::network::wallet::WalletProvider;
use vin_arcade::services::cache::BalanceCache;
use vin_arcade::services::coordinator::Coordinator;
use vin_arcade::services::session::SessionManager;

#[derive(Parser, Debug)]
#[command(author, version, about = "VIN swap, dice and lotto on Monad")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,json})
    #[arg(long)]
    config: Option<String>,

    /// Log level or filter directives (overrides config/env)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Session, balances, allowances and pools
    Status,
    /// Ask the wallet for an account and switch it to the target network
    Connect,
    /// Let a contract spend VIN
    Approve {
        spender: SpenderArg,
        /// Whole VIN; defaults to 1,000,000
        #[arg(long)]
        amount: Option<String>,
    },
    /// Swap at the fixed rate; pass "max" to use everything available
    Swap {
        direction: DirectionArg,
        amount: String,
    },
    /// Preview a swap without sending anything
    Quote {
        direction: DirectionArg,
        amount: String,
    },
    /// Bet VIN on the parity of the roll
    Dice { amount: String, choice: ParityArg },
    /// Play one lotto ticket
    Lotto {
        #[arg(long, default_value_t = false)]
        bet27: bool,
        /// NN:AMOUNT, repeatable
        #[arg(long = "row", value_parser = parse_row, required = true)]
        rows: Vec<LottoRowInput>,
    },
    /// Current MON/VIN prices
    Price,
    /// Follow wallet events and prices until Ctrl-C
    Watch,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SpenderArg {
    Swap,
    Dice,
    Lotto,
}

impl From<SpenderArg> for ContractId {
    fn from(s: SpenderArg) -> Self {
        match s {
            SpenderArg::Swap => ContractId::Swap,
            SpenderArg::Dice => ContractId::Dice,
            SpenderArg::Lotto => ContractId::Lotto,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
    VinToMon,
    MonToVin,
}

impl From<DirectionArg> for SwapDirection {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::VinToMon => SwapDirection::TokenToNative,
            DirectionArg::MonToVin => SwapDirection::NativeToToken,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ParityArg {
    Even,
    Odd,
}

impl From<ParityArg> for Parity {
    fn from(p: ParityArg) -> Self {
        match p {
            ParityArg::Even => Parity::Even,
            ParityArg::Odd => Parity::Odd,
        }
    }
}

/// Only splits the row; the coordinator validates both halves.
fn parse_row(raw: &str) -> Result<LottoRowInput, String> {
    let (number, amount) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NN:AMOUNT, got '{raw}'"))?;
    Ok(LottoRowInput::new(number.trim(), amount.trim()))
}

async fn run(
    command: Command,
    settings: &GlobalSettings,
    coordinator: &Coordinator,
    presenter: &Presenter,
) -> Result<String, ActionError> {
    let session = coordinator.session();
    match command {
        Command::Status => {
            if let Err(e) = session.connect(ConnectMode::Silent).await {
                tracing::debug!(target: "session", error = %e, "Silent connect failed");
            }
            let current = session.session();
            let balances = coordinator.cache().refresh_display(current.account).await;
            Ok(format!("{}\n{}", presenter.session(&current), balances))
        }
        Command::Connect => {
            let current = session.connect(ConnectMode::Interactive).await?;
            Ok(presenter.session(&current))
        }
        Command::Approve { spender, amount } => {
            let outcome = coordinator
                .approve(spender.into(), amount.as_deref())
                .await?;
            Ok(presenter.approve(&outcome))
        }
        Command::Swap { direction, amount } => {
            let direction = direction.into();
            let outcome = if amount.trim().eq_ignore_ascii_case("max") {
                coordinator.swap_max(direction).await?
            } else {
                coordinator.swap(direction, &amount).await?
            };
            Ok(presenter.swap(&outcome))
        }
        Command::Quote { direction, amount } => {
            let direction = direction.into();
            let out = coordinator.quote(direction, &amount).await?;
            Ok(presenter.quote(direction, out))
        }
        Command::Dice { amount, choice } => {
            let outcome = coordinator.play_dice(&amount, choice.into()).await?;
            Ok(presenter.dice(&outcome))
        }
        Command::Lotto { bet27, rows } => {
            coordinator.edit_draft(|draft| {
                draft.reset();
                draft.set_mode(if bet27 { LottoMode::Bet27 } else { LottoMode::BetOne });
                for (idx, row) in rows.into_iter().enumerate() {
                    let slot = if idx == 0 { 0 } else { draft.add_row() };
                    draft.set_row(slot, row)?;
                }
                Ok::<_, ActionError>(())
            })?;
            let outcome = coordinator.play_draft().await?;
            Ok(presenter.lotto(&outcome))
        }
        Command::Price => {
            let feed = PriceFeed::new(&settings.price_url)
                .map_err(|e| ActionError::Rpc(e.to_string()))?;
            Ok(presenter.price(&feed.reading().await))
        }
        Command::Watch => {
            watch(settings, coordinator, presenter).await?;
            Ok("Stopped.".to_string())
        }
    }
}

async fn watch(
    settings: &GlobalSettings,
    coordinator: &Coordinator,
    presenter: &Presenter,
) -> Result<(), ActionError> {
    let session = coordinator.session();
    if let Err(e) = session.connect(ConnectMode::Silent).await {
        tracing::debug!(target: "session", error = %e, "Silent connect failed");
    }
    let feed =
        PriceFeed::new(&settings.price_url).map_err(|e| ActionError::Rpc(e.to_string()))?;
    let (mut prices, ticker) = PriceTicker::spawn(feed, settings.price_poll());
    let mut sessions = session.subscribe();
    println!("{}", presenter.session(&sessions.borrow_and_update()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = sessions.borrow_and_update().clone();
                println!("{}", presenter.session(&current));
                if current.is_connected() {
                    let balances = coordinator.cache().refresh_display(current.account).await;
                    print!("{balances}");
                }
            }
            changed = prices.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", presenter.price(&prices.borrow_and_update()));
            }
        }
    }
    ticker.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();

    let settings = GlobalSettings::load_with_path(cli.config.as_deref())?;
    let level = match cli.log_level.as_deref() {
        Some(level) => level.to_string(),
        None if settings.debug => "debug".to_string(),
        None => settings.log_level.clone(),
    };
    setup_logging(&level, settings.log_json);

    let deployment = settings.deployment()?;
    let wallet = settings
        .local_wallet()?
        .map(|w| Arc::new(w) as Arc<dyn WalletProvider>);
    if wallet.is_none() {
        tracing::warn!(target: "config", "No wallet_key configured; running read-only");
    }
    let reader = Arc::new(RpcChainReader::connect(&deployment.network.rpc_url)?);
    let session = Arc::new(SessionManager::new(wallet, reader, deployment.clone()));
    let listener = session.listen();
    let cache = Arc::new(BalanceCache::new(session.clone()));
    let coordinator = Coordinator::new(session.clone(), cache);

    let presenter = Presenter::new(
        session.token_decimals().await,
        deployment.network.explorer_url.clone(),
    );
    let mut events = coordinator.subscribe();
    let progress = presenter.clone();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => eprintln!("{}", progress.stage(&event)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = run(cli.command, &settings, &coordinator, &presenter).await;
    drop(coordinator);
    let _ = printer.await;
    if let Some(listener) = listener {
        listener.abort();
    }

    match result {
        Ok(line) => {
            println!("{line}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", presenter.error(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}
