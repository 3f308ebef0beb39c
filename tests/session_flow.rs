// SPDX-License-Identifier: MIT
// Session manager against the in-memory wallet: silent vs interactive
// connects, chain switch/add convergence, and wallet event handling.

mod support;

use alloy::primitives::Address;
use std::sync::Arc;
use std::time::Duration;
use support::{MockNode, harness, harness_with, player};
use vin_arcade::data::contracts::IVinToken;
use vin_arcade::domain::error::ActionError;
use vin_arcade::domain::model::{ConnectMode, ConnectionState, ContractId};
use vin_arcade::network::provider::ChainReader;
use vin_arcade::network::wallet::WalletEvent;
use vin_arcade::services::session::{Deployment, SessionManager};

#[tokio::test]
async fn silent_connect_never_prompts() {
    let h = harness();
    h.node.set_authorized(false);
    let session = h.session.connect(ConnectMode::Silent).await.unwrap();
    assert_eq!(session.state, ConnectionState::Disconnected);
    assert!(!h.node.requests().iter().any(|m| m == "eth_requestAccounts"));

    h.node.set_authorized(true);
    let session = h.session.connect(ConnectMode::Silent).await.unwrap();
    assert!(session.is_connected());
    assert_eq!(session.account, Some(player()));
    assert!(!h.node.requests().iter().any(|m| m == "eth_requestAccounts"));
}

#[tokio::test]
async fn interactive_connect_prompts() {
    let h = harness();
    h.node.set_authorized(false);
    let session = h.session.connect(ConnectMode::Interactive).await.unwrap();
    assert!(session.is_connected());
    assert!(h.node.requests().iter().any(|m| m == "eth_requestAccounts"));
}

#[tokio::test]
async fn wrong_chain_is_switched_before_connected() {
    let h = harness();
    h.node.set_chain(1);
    let mut updates = h.session.subscribe();

    let session = h.session.connect(ConnectMode::Interactive).await.unwrap();
    assert_eq!(session.chain_id, Some(143));
    assert_eq!(session.state, ConnectionState::Connected);

    let requests = h.node.requests();
    let switch = requests
        .iter()
        .position(|m| m == "wallet_switchEthereumChain")
        .expect("switch requested");
    let accounts = requests
        .iter()
        .position(|m| m == "eth_requestAccounts")
        .unwrap();
    assert!(accounts < switch);
    assert!(!requests.iter().any(|m| m == "wallet_addEthereumChain"));

    // Only the final state carries the account.
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().state, ConnectionState::Connected);
}

#[tokio::test]
async fn unknown_chain_is_added() {
    let h = harness();
    h.node.set_chain(1);
    h.node.forget_chain(143);
    let session = h.session.connect(ConnectMode::Interactive).await.unwrap();
    assert_eq!(session.chain_id, Some(143));
    let requests = h.node.requests();
    assert!(requests.iter().any(|m| m == "wallet_switchEthereumChain"));
    assert!(requests.iter().any(|m| m == "wallet_addEthereumChain"));
}

#[tokio::test]
async fn silent_connect_on_wrong_chain_reports_without_switching() {
    let h = harness();
    h.node.set_chain(1);
    let session = h.session.connect(ConnectMode::Silent).await.unwrap();
    assert_eq!(session.state, ConnectionState::WrongChain);
    assert!(!h.node.requests().iter().any(|m| m == "wallet_switchEthereumChain"));
    assert!(matches!(
        h.session.require_connected(),
        Err(ActionError::WrongChain {
            expected: 143,
            actual: Some(1)
        })
    ));
}

#[tokio::test]
async fn rejected_switch_leaves_wrong_chain() {
    let h = harness();
    h.node.set_chain(1);
    h.node.reject("wallet_switchEthereumChain");
    let err = h.session.connect(ConnectMode::Interactive).await.unwrap_err();
    assert_eq!(err, ActionError::UserRejected);

    let session = h.session.session();
    assert_eq!(session.state, ConnectionState::WrongChain);
    assert_eq!(session.chain_id, Some(1));
    assert!(!session.is_connected());
}

#[tokio::test]
async fn missing_wallet_is_unavailable() {
    let node = Arc::new(MockNode::new());
    let session = SessionManager::new(None, node as Arc<dyn ChainReader>, Deployment::default());
    assert_eq!(
        session.connect(ConnectMode::Silent).await.unwrap_err(),
        ActionError::WalletUnavailable
    );
    // Reads still work without a wallet.
    assert!(!session.binding(ContractId::Token).is_writable());
    assert_eq!(session.token_decimals().await, 18);
}

#[tokio::test]
async fn bindings_follow_the_session() {
    let h = harness();
    assert!(!h.session.binding(ContractId::Dice).is_writable());
    h.session.connect(ConnectMode::Silent).await.unwrap();
    let dice = h.session.binding(ContractId::Dice);
    assert_eq!(dice.signer(), Some(player()));

    h.session.on_chain_changed(1);
    assert_eq!(h.session.session().state, ConnectionState::WrongChain);
    assert!(!h.session.binding(ContractId::Dice).is_writable());

    h.session.on_chain_changed(143);
    assert!(h.session.session().is_connected());

    let other = Address::from([0x22; 20]);
    h.session.on_accounts_changed(vec![other]).await;
    assert_eq!(h.session.binding(ContractId::Dice).signer(), Some(other));

    h.session.on_accounts_changed(Vec::new()).await;
    assert_eq!(h.session.session().state, ConnectionState::Disconnected);
    assert!(!h.session.binding(ContractId::Dice).is_writable());
}

#[tokio::test]
async fn wallet_events_reach_the_session() {
    let h = harness_with(MockNode::new());
    h.session.connect(ConnectMode::Silent).await.unwrap();
    let listener = h.session.listen().expect("wallet present");
    let mut updates = h.session.subscribe();
    updates.borrow_and_update();

    h.node.emit(WalletEvent::ChainChanged(1));
    tokio::time::timeout(Duration::from_secs(1), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updates.borrow().state, ConnectionState::WrongChain);

    h.node.emit(WalletEvent::AccountsChanged(Vec::new()));
    tokio::time::timeout(Duration::from_secs(1), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updates.borrow().state, ConnectionState::Disconnected);
    listener.abort();
}

#[tokio::test]
async fn revocation_during_switch_prompt_ends_disconnected() {
    let h = harness();
    h.node.set_chain(1);
    h.node.slow_requests(true);
    h.node.revoke_during("wallet_switchEthereumChain");
    let listener = h.session.listen().expect("wallet present");

    let session = h.session.connect(ConnectMode::Interactive).await.unwrap();
    assert_eq!(session.state, ConnectionState::Disconnected);
    assert_eq!(h.session.session().state, ConnectionState::Disconnected);
    assert_eq!(h.session.require_connected(), Err(ActionError::NotConnected));
    assert!(!h.session.binding(ContractId::Dice).is_writable());
    listener.abort();
}

#[tokio::test]
async fn concurrent_connects_wait_instead_of_failing() {
    let h = harness();
    h.node.slow_requests(true);
    let (a, b) = tokio::join!(h.session.ensure_connected(), h.session.ensure_connected());
    assert_eq!(a, Ok(player()));
    assert_eq!(b, Ok(player()));
}

#[tokio::test]
async fn flaky_decimals_read_is_retried() {
    let node = MockNode::new();
    let token = support::deployment().token;
    node.respond::<IVinToken::decimalsCall>(token, &6u8);
    node.fail_first::<IVinToken::decimalsCall>(token, 1);
    let h = harness_with(node);

    assert_eq!(h.session.token_decimals().await, 6);
    assert_eq!(h.node.reads(), 2);
}
