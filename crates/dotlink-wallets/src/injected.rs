// SPDX-License-Identifier: GPL-3.0

//! Registry of injected multi-account wallets (Polkadot{.js}-style extensions).

use crate::{
	Error,
	account::{AccountDescriptor, AccountEvent, AccountSlot},
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{
	collections::HashSet,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// An account as returned by a wallet extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedAccount {
	pub address: String,
	pub name: Option<String>,
}

/// The runtime environment wallet extensions inject themselves into.
#[async_trait]
pub trait InjectedWeb3: Send + Sync {
	/// Identifiers of the extensions currently injected.
	fn injected_sources(&self) -> Vec<String>;

	/// Requests account access from `wallet_id` on behalf of `app_name`, possibly prompting the
	/// user.
	///
	/// Fails with [`Error::AccessDenied`] when the user rejects the request and with
	/// [`Error::WalletUnavailable`] when the extension isn't injected.
	async fn enable(&self, wallet_id: &str, app_name: &str) -> Result<Vec<InjectedAccount>, Error>;
}

/// Static information about a known wallet extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownWallet {
	pub id: &'static str,
	pub name: &'static str,
	pub logo: &'static str,
	pub install_url: &'static str,
}

/// Wallet extensions offered even when not installed.
pub const KNOWN_WALLETS: &[KnownWallet] = &[
	KnownWallet {
		id: "subwallet-js",
		name: "SubWallet",
		logo: "subwallet.svg",
		install_url: "https://www.subwallet.app/download.html",
	},
	KnownWallet {
		id: "talisman",
		name: "Talisman",
		logo: "talisman.svg",
		install_url: "https://talisman.xyz/download",
	},
	KnownWallet {
		id: "polkadot-js",
		name: "Polkadot{.js}",
		logo: "polkadot-js.svg",
		install_url: "https://polkadot.js.org/extension/",
	},
	KnownWallet {
		id: "enkrypt",
		name: "Enkrypt",
		logo: "enkrypt.svg",
		install_url: "https://www.enkrypt.com/",
	},
];

/// A wallet together with its installation and connection state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WalletDescriptor {
	pub id: String,
	pub name: String,
	/// Logo reference, if known.
	pub logo: Option<String>,
	pub install_url: Option<String>,
	pub installed: bool,
	pub connected: bool,
	/// Accounts exposed to the app. Empty unless connected.
	pub accounts: Vec<AccountDescriptor>,
}

/// Tracks connected injected wallets and their accounts.
pub struct InjectedWalletRegistry {
	env: Arc<dyn InjectedWeb3>,
	app_name: String,
	slot: AccountSlot,
	/// Connected wallets and their accounts, in connection order.
	connected: Mutex<IndexMap<String, Vec<AccountDescriptor>>>,
}

impl InjectedWalletRegistry {
	/// # Arguments
	/// * `env` - The environment wallets are injected into.
	/// * `app_name` - Name presented to wallets when requesting access.
	/// * `slot` - The shared active-account slot.
	pub fn new(env: Arc<dyn InjectedWeb3>, app_name: impl Into<String>, slot: AccountSlot) -> Self {
		Self { env, app_name: app_name.into(), slot, connected: Mutex::new(IndexMap::new()) }
	}

	fn connected(&self) -> MutexGuard<'_, IndexMap<String, Vec<AccountDescriptor>>> {
		self.connected.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Lists known and injected wallets, installed ones first.
	///
	/// The relative order within installed and within missing wallets is preserved.
	pub fn list_wallets(&self) -> Vec<WalletDescriptor> {
		let injected: Vec<String> = self.env.injected_sources();
		let connected = self.connected();
		let describe = |id: &str, name: &str, logo: Option<&str>, install_url: Option<&str>| {
			let accounts = connected.get(id).cloned();
			WalletDescriptor {
				id: id.to_string(),
				name: name.to_string(),
				logo: logo.map(String::from),
				install_url: install_url.map(String::from),
				installed: injected.iter().any(|source| source == id),
				connected: accounts.is_some(),
				accounts: accounts.unwrap_or_default(),
			}
		};
		let mut wallets: Vec<_> = KNOWN_WALLETS
			.iter()
			.map(|w| describe(w.id, w.name, Some(w.logo), Some(w.install_url)))
			.collect();
		// Extensions we know nothing about are listed under their identifier.
		for source in &injected {
			if !KNOWN_WALLETS.iter().any(|w| w.id == source.as_str()) {
				wallets.push(describe(source, source, None, None));
			}
		}
		wallets.sort_by_key(|wallet| !wallet.installed);
		wallets
	}

	/// Requests account access from `wallet_id` and records its accounts.
	///
	/// Reconnecting a wallet replaces its previous account list. Returns the wallet's accounts.
	pub async fn connect_wallet(&self, wallet_id: &str) -> Result<Vec<AccountDescriptor>, Error> {
		if !self.env.injected_sources().iter().any(|source| source == wallet_id) {
			return Err(Error::WalletUnavailable(wallet_id.to_string()));
		}
		let injected = self.env.enable(wallet_id, &self.app_name).await?;

		let mut seen = HashSet::new();
		let accounts: Vec<AccountDescriptor> = injected
			.into_iter()
			.filter(|account| seen.insert(account.address.clone()))
			.map(|account| AccountDescriptor {
				address: account.address,
				name: account.name,
				wallet_id: wallet_id.to_string(),
			})
			.collect();
		log::info!("Connected to {wallet_id} with {} accounts", accounts.len());

		self.connected().insert(wallet_id.to_string(), accounts.clone());
		self.slot.apply(AccountEvent::InjectedAccountsChanged {
			wallet_id: wallet_id.to_string(),
			addresses: accounts.iter().map(|a| a.address.clone()).collect(),
		});
		Ok(accounts)
	}

	/// Disconnects `wallet_id`, or every wallet and the active account when `None`.
	pub fn disconnect(&self, wallet_id: Option<&str>) {
		match wallet_id {
			Some(wallet_id) => {
				self.connected().shift_remove(wallet_id);
				self.slot.apply(AccountEvent::InjectedWalletDisconnected(wallet_id.to_string()));
			},
			None => {
				self.connected().clear();
				self.slot.apply(AccountEvent::ClearAll);
			},
		}
	}

	/// Makes `account` the active account. It must be exposed by a connected wallet.
	pub fn set_active_account(&self, account: &AccountDescriptor) -> Result<(), Error> {
		let exposed = self
			.connected()
			.get(&account.wallet_id)
			.and_then(|accounts| accounts.iter().find(|a| a.address == account.address).cloned())
			.ok_or_else(|| Error::UnknownAccount(account.address.clone()))?;
		self.slot.apply(AccountEvent::SelectInjected(exposed));
		Ok(())
	}

	/// Identifiers of the connected wallets, in connection order.
	pub fn connected_wallets(&self) -> Vec<String> {
		self.connected().keys().cloned().collect()
	}

	/// Accounts of every connected wallet, keyed by address: the first wallet exposing an
	/// address owns it.
	pub fn accounts(&self) -> Vec<AccountDescriptor> {
		let mut seen = HashSet::new();
		self.connected()
			.values()
			.flatten()
			.filter(|account| seen.insert(account.address.clone()))
			.cloned()
			.collect()
	}

	pub fn slot(&self) -> &AccountSlot {
		&self.slot
	}
}
