// SPDX-License-Identifier: GPL-3.0

use dotlink_wallets::{
	AccountDescriptor, AccountEvent, AccountSlot, ActiveAccount, Eip1193Provider, Error,
	EvmState, EvmWallet, ProviderError,
	evm::{paseo_asset_hub, provider::methods},
	testing::MockEip1193Provider,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;

type Host = watch::Sender<Option<Arc<dyn Eip1193Provider>>>;

fn setup(provider: Option<Arc<MockEip1193Provider>>) -> (Host, EvmWallet, AccountSlot) {
	let (host, receiver) =
		watch::channel(provider.map(|provider| provider as Arc<dyn Eip1193Provider>));
	let slot = AccountSlot::new();
	let wallet = EvmWallet::new(receiver, slot.clone());
	(host, wallet, slot)
}

async fn wait_for(wallet: &EvmWallet, condition: impl FnMut(&EvmState) -> bool) -> EvmState {
	let mut state = wallet.subscribe();
	tokio::time::timeout(Duration::from_secs(5), state.wait_for(condition))
		.await
		.expect("timed out waiting for EVM state")
		.expect("EVM state closed")
		.clone()
}

async fn wait_for_active(slot: &AccountSlot, expected: Option<ActiveAccount>) {
	let mut active = slot.subscribe();
	tokio::time::timeout(Duration::from_secs(5), active.wait_for(|active| *active == expected))
		.await
		.expect("timed out waiting for the active account")
		.expect("account slot closed");
}

fn evm(address: &str) -> Option<ActiveAccount> {
	Some(ActiveAccount::Evm { address: address.into() })
}

#[tokio::test]
async fn mount_syncs_silently() {
	let provider = MockEip1193Provider::new();
	provider.grant_silently(&["0xABC", "0xDEF"]);
	let (_host, wallet, slot) = setup(Some(provider.clone()));

	assert!(wallet.mount());
	let state = wait_for(&wallet, |s| s.chain_id.is_some()).await;
	assert!(state.installed && state.connected);
	assert_eq!(state.accounts, ["0xABC", "0xDEF"]);
	assert_eq!(state.current_account.as_deref(), Some("0xABC"));
	assert_eq!(state.chain_id.as_deref(), Some("0x1"));
	assert_eq!(slot.get(), evm("0xABC"));
	assert!(!provider.calls().iter().any(|m| m == methods::ETH_REQUEST_ACCOUNTS));
}

#[tokio::test]
async fn mount_is_idempotent() {
	let provider = MockEip1193Provider::new();
	let (_host, wallet, _) = setup(Some(provider.clone()));

	assert!(wallet.mount());
	assert!(!wallet.mount());
	wait_for(&wallet, |s| s.chain_id.is_some()).await;
	assert!(!wallet.mount());
	assert_eq!(provider.subscriptions(), 1);
}

#[tokio::test]
async fn detects_provider_injected_later() {
	let (host, wallet, _) = setup(None);
	assert!(!wallet.state().installed);
	wallet.mount();

	let provider = MockEip1193Provider::new();
	host.send_replace(Some(provider.clone()));
	let state = wait_for(&wallet, |s| s.installed && s.chain_id.is_some()).await;
	assert!(!state.connected);
	assert_eq!(provider.subscriptions(), 1);

	host.send_replace(None);
	wait_for(&wallet, |s| !s.installed).await;
}

#[tokio::test]
async fn connect_requires_a_provider() {
	let (_host, wallet, _) = setup(None);
	assert!(matches!(wallet.connect().await, Err(Error::ProviderNotInstalled)));
	assert!(matches!(wallet.switch_account().await, Err(Error::ProviderNotInstalled)));
}

#[tokio::test]
async fn connect_reports_rejection_as_access_denied() {
	let provider = MockEip1193Provider::new();
	provider.fail(methods::ETH_REQUEST_ACCOUNTS, ProviderError::new(4001, "User rejected"));
	let (_host, wallet, slot) = setup(Some(provider));
	assert!(matches!(wallet.connect().await, Err(Error::AccessDenied(_))));
	assert!(!wallet.state().connected);
	assert_eq!(slot.get(), None);
}

#[tokio::test]
async fn connect_sets_evm_sourced_active_account() -> Result<(), Error> {
	let provider = MockEip1193Provider::new();
	provider.set_wallet_accounts(&["0xABC"]);
	let (_host, wallet, slot) = setup(Some(provider));

	assert_eq!(wallet.connect().await?, ["0xABC"]);
	let state = wallet.state();
	assert!(state.connected);
	assert_eq!(state.chain_id.as_deref(), Some("0x1"));
	assert_eq!(slot.get(), evm("0xABC"));
	Ok(())
}

#[tokio::test]
async fn disconnect_does_not_clear_injected_account() -> Result<(), Error> {
	let provider = MockEip1193Provider::new();
	provider.set_wallet_accounts(&["0xABC"]);
	let (_host, wallet, slot) = setup(Some(provider.clone()));
	wallet.connect().await?;

	let injected = AccountDescriptor {
		address: "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY".into(),
		name: None,
		wallet_id: "polkadot-js".into(),
	};
	slot.apply(AccountEvent::SelectInjected(injected.clone()));
	wallet.disconnect();
	assert!(!wallet.state().connected);
	assert_eq!(slot.get(), Some(ActiveAccount::Injected(injected)));

	// Disconnecting is local only.
	assert!(!provider.calls().iter().any(|m| m.contains("revoke")));
	Ok(())
}

#[tokio::test]
async fn disconnect_clears_evm_account() -> Result<(), Error> {
	let provider = MockEip1193Provider::new();
	provider.set_wallet_accounts(&["0xABC"]);
	let (_host, wallet, slot) = setup(Some(provider));
	wallet.connect().await?;

	wallet.disconnect();
	assert_eq!(wallet.state().current_account, None);
	assert_eq!(slot.get(), None);
	Ok(())
}

#[tokio::test]
async fn follows_account_and_chain_notifications() {
	let provider = MockEip1193Provider::new();
	let (_host, wallet, slot) = setup(Some(provider.clone()));
	wallet.mount();
	wait_for(&wallet, |s| s.chain_id.is_some()).await;

	provider.change_accounts(&["0xABC"]);
	wait_for_active(&slot, evm("0xABC")).await;
	provider.change_accounts(&["0xDEF", "0xABC"]);
	wait_for_active(&slot, evm("0xDEF")).await;

	provider.change_chain("0x190f1b46");
	let state = wait_for(&wallet, |s| s.chain_id.as_deref() == Some("0x190f1b46")).await;
	assert_eq!(state.accounts, ["0xDEF", "0xABC"]);

	provider.change_accounts(&[]);
	let state = wait_for(&wallet, |s| !s.connected).await;
	assert_eq!(state.current_account, None);
	wait_for_active(&slot, None).await;
}

#[tokio::test]
async fn focus_recheck_picks_up_silent_switch() -> Result<(), Error> {
	let provider = MockEip1193Provider::new();
	provider.set_wallet_accounts(&["0xABC"]);
	let (_host, wallet, slot) = setup(Some(provider.clone()));
	wallet.connect().await?;

	assert!(!wallet.handle_focus().await?);
	provider.grant_silently(&["0xDEF"]);
	assert!(wallet.handle_focus().await?);
	assert_eq!(wallet.state().current_account.as_deref(), Some("0xDEF"));
	assert_eq!(slot.get(), evm("0xDEF"));
	Ok(())
}

#[tokio::test]
async fn refresh_only_bumps_the_counter() {
	let (_host, wallet, _) = setup(Some(MockEip1193Provider::new()));
	let before = wallet.state();
	assert_eq!(wallet.refresh(), 1);
	assert_eq!(wallet.refresh(), 2);
	assert_eq!(wallet.state(), EvmState { refresh: 2, ..before });
}

#[tokio::test]
async fn switch_chain_reports_unknown_chains() {
	let provider = MockEip1193Provider::new();
	let (_host, wallet, _) = setup(Some(provider));
	assert!(matches!(
		wallet.switch_chain("0x190f1b46").await,
		Err(Error::UnsupportedChain(chain)) if chain == "0x190f1b46"
	));
}

#[tokio::test]
async fn ensure_chain_adds_unknown_chain() -> Result<(), Error> {
	let provider = MockEip1193Provider::new();
	let (_host, wallet, _) = setup(Some(provider.clone()));

	wallet.ensure_chain(&paseo_asset_hub()).await?;
	assert_eq!(provider.chain_id(), "0x190f1b46");
	assert_eq!(wallet.state().chain_id.as_deref(), Some("0x190f1b46"));
	assert_eq!(
		provider.calls(),
		[methods::WALLET_SWITCH_ETHEREUM_CHAIN, methods::WALLET_ADD_ETHEREUM_CHAIN]
	);

	// Known now: a plain switch suffices.
	wallet.switch_chain("0x1").await?;
	wallet.ensure_chain(&paseo_asset_hub()).await?;
	assert_eq!(provider.calls().len(), 4);
	Ok(())
}

#[tokio::test]
async fn switch_account_reports_head_change() -> Result<(), Error> {
	let provider = MockEip1193Provider::new();
	provider.set_wallet_accounts(&["0xABC"]);
	let (_host, wallet, slot) = setup(Some(provider.clone()));
	wallet.connect().await?;

	assert!(!wallet.switch_account().await?);
	provider.set_wallet_accounts(&["0xDEF"]);
	assert!(wallet.switch_account().await?);
	assert_eq!(slot.get(), evm("0xDEF"));
	assert_eq!(wallet.state().refresh, 2);

	// Wallets without permission requests still reconnect.
	provider.fail(methods::WALLET_REQUEST_PERMISSIONS, ProviderError::new(-32601, "unsupported"));
	assert!(!wallet.switch_account().await?);
	Ok(())
}

#[tokio::test]
async fn explicit_connect_reclaims_active_account() -> Result<(), Error> {
	let provider = MockEip1193Provider::new();
	provider.set_wallet_accounts(&["0xABC"]);
	let (_host, wallet, slot) = setup(Some(provider));
	wallet.connect().await?;

	let injected = AccountDescriptor {
		address: "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty".into(),
		name: None,
		wallet_id: "talisman".into(),
	};
	slot.apply(AccountEvent::SelectInjected(injected));
	wallet.connect().await?;
	assert_eq!(slot.get(), evm("0xABC"));
	Ok(())
}
