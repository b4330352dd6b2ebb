// SPDX-License-Identifier: GPL-3.0

use dotlink_wallets::{
	AccountEvent, AccountSlot, ActiveAccount, Error, InjectedWalletRegistry,
	testing::{MockInjectedWeb3, injected_account},
};
use std::sync::Arc;

const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
const CHARLIE: &str = "5FLSigC9HGRKVhB9FiEo4Y3koPsNmBmLJbpXg2mp1hXcS59Y";

fn setup() -> (Arc<MockInjectedWeb3>, InjectedWalletRegistry, AccountSlot) {
	let env = MockInjectedWeb3::new();
	env.install(
		"polkadot-js",
		vec![injected_account(ALICE, Some("Alice")), injected_account(BOB, None)],
	);
	env.install("talisman", vec![injected_account(CHARLIE, Some("Charlie"))]);
	let slot = AccountSlot::new();
	let registry = InjectedWalletRegistry::new(env.clone(), "dotlink", slot.clone());
	(env, registry, slot)
}

#[tokio::test]
async fn connect_wallet_is_idempotent() -> Result<(), Error> {
	let (env, registry, _) = setup();
	let first = registry.connect_wallet("polkadot-js").await?;
	let second = registry.connect_wallet("polkadot-js").await?;
	assert_eq!(first, second);
	assert_eq!(registry.accounts().len(), 2);
	assert_eq!(registry.connected_wallets(), ["polkadot-js"]);
	assert_eq!(env.enable_calls(), 2);
	assert!(first.iter().all(|account| account.wallet_id == "polkadot-js"));
	Ok(())
}

#[tokio::test]
async fn duplicate_addresses_are_merged() -> Result<(), Error> {
	let (env, registry, _) = setup();
	env.set_accounts(
		"polkadot-js",
		vec![injected_account(ALICE, Some("Alice")), injected_account(ALICE, Some("Again"))],
	);
	let accounts = registry.connect_wallet("polkadot-js").await?;
	assert_eq!(accounts.len(), 1);
	assert_eq!(accounts[0].name.as_deref(), Some("Alice"));
	Ok(())
}

#[tokio::test]
async fn connect_wallet_surfaces_unavailable_and_denied() {
	let (env, registry, _) = setup();
	assert!(matches!(
		registry.connect_wallet("subwallet-js").await,
		Err(Error::WalletUnavailable(id)) if id == "subwallet-js"
	));
	env.deny("talisman");
	assert!(matches!(registry.connect_wallet("talisman").await, Err(Error::AccessDenied(_))));
	assert!(registry.connected_wallets().is_empty());
}

#[tokio::test]
async fn list_wallets_reports_connection_state() -> Result<(), Error> {
	let (_, registry, _) = setup();
	registry.connect_wallet("talisman").await?;
	let wallets = registry.list_wallets();
	let talisman = wallets.iter().find(|w| w.id == "talisman").unwrap();
	assert!(talisman.installed && talisman.connected);
	assert_eq!(talisman.accounts.len(), 1);
	let polkadot_js = wallets.iter().find(|w| w.id == "polkadot-js").unwrap();
	assert!(polkadot_js.installed && !polkadot_js.connected);
	assert!(polkadot_js.accounts.is_empty());
	Ok(())
}

#[tokio::test]
async fn active_account_must_belong_to_a_connected_wallet() -> Result<(), Error> {
	let (_, registry, slot) = setup();
	let accounts = registry.connect_wallet("polkadot-js").await?;

	let mut stranger = accounts[0].clone();
	stranger.wallet_id = "talisman".into();
	assert!(matches!(registry.set_active_account(&stranger), Err(Error::UnknownAccount(_))));
	assert_eq!(slot.get(), None);

	registry.set_active_account(&accounts[1])?;
	assert_eq!(slot.get(), Some(ActiveAccount::Injected(accounts[1].clone())));
	Ok(())
}

#[tokio::test]
async fn disconnecting_a_wallet_clears_only_its_active_account() -> Result<(), Error> {
	let (_, registry, slot) = setup();
	let polkadot_js = registry.connect_wallet("polkadot-js").await?;
	registry.connect_wallet("talisman").await?;
	registry.set_active_account(&polkadot_js[0])?;

	registry.disconnect(Some("talisman"));
	assert_eq!(slot.get().map(|a| a.address().to_string()), Some(ALICE.to_string()));
	assert_eq!(registry.connected_wallets(), ["polkadot-js"]);

	registry.disconnect(Some("polkadot-js"));
	assert_eq!(slot.get(), None);
	assert!(registry.accounts().is_empty());
	Ok(())
}

#[tokio::test]
async fn disconnect_all_clears_active_account() -> Result<(), Error> {
	let (_, registry, slot) = setup();
	registry.connect_wallet("polkadot-js").await?;
	let talisman = registry.connect_wallet("talisman").await?;
	registry.set_active_account(&talisman[0])?;

	registry.disconnect(None);
	assert!(registry.connected_wallets().is_empty());
	assert_eq!(slot.get(), None);
	Ok(())
}

#[tokio::test]
async fn reconnect_replaces_accounts_and_drops_vanished_active_account() -> Result<(), Error> {
	let (env, registry, slot) = setup();
	let accounts = registry.connect_wallet("polkadot-js").await?;
	registry.set_active_account(&accounts[1])?;

	env.set_accounts("polkadot-js", vec![injected_account(ALICE, Some("Alice"))]);
	let accounts = registry.connect_wallet("polkadot-js").await?;
	assert_eq!(accounts.len(), 1);
	assert_eq!(registry.accounts(), accounts);
	assert_eq!(slot.get(), None);
	Ok(())
}

#[tokio::test]
async fn evm_events_leave_injected_selection_alone() -> Result<(), Error> {
	let (_, registry, slot) = setup();
	let accounts = registry.connect_wallet("polkadot-js").await?;
	slot.apply(AccountEvent::EvmConnected("0xABC".into()));
	registry.set_active_account(&accounts[0])?;

	assert!(!slot.apply(AccountEvent::EvmDisconnected));
	assert_eq!(slot.get(), Some(ActiveAccount::Injected(accounts[0].clone())));
	Ok(())
}
