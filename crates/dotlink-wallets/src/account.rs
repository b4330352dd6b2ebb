// SPDX-License-Identifier: GPL-3.0

//! The single process-wide active-account slot shared by both wallet families.
//!
//! Every transition goes through [`reconcile`], applied under the slot's lock by [`AccountSlot`],
//! so the two wallet adapters never race on the slot.

use dotlink_common::format::format_address;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// An account exposed by an injected wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDescriptor {
	pub address: String,
	/// Name given to the account inside the wallet.
	pub name: Option<String>,
	/// Identifier of the wallet exposing the account.
	pub wallet_id: String,
}

/// The wallet family an active account comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSource {
	Injected,
	Evm,
}

/// The active account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ActiveAccount {
	/// Selected from an injected multi-account wallet.
	Injected(AccountDescriptor),
	/// Reported by the EVM provider.
	Evm { address: String },
}

impl ActiveAccount {
	pub fn address(&self) -> &str {
		match self {
			Self::Injected(account) => &account.address,
			Self::Evm { address } => address,
		}
	}

	pub fn source(&self) -> AccountSource {
		match self {
			Self::Injected(_) => AccountSource::Injected,
			Self::Evm { .. } => AccountSource::Evm,
		}
	}

	/// The wallet-supplied name, else a shortened address.
	pub fn display_name(&self) -> String {
		match self {
			Self::Injected(AccountDescriptor { name: Some(name), .. }) => name.clone(),
			Self::Injected(account) => format_address(&account.address, 6, 6),
			Self::Evm { address } => format_address(address, 6, 4),
		}
	}
}

/// Something that may change the active account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountEvent {
	/// The user selected an injected-wallet account.
	SelectInjected(AccountDescriptor),
	/// The EVM provider reports a connected head account.
	EvmConnected(String),
	/// The EVM provider reports no accounts, or was disconnected locally.
	EvmDisconnected,
	/// An injected wallet was disconnected.
	InjectedWalletDisconnected(String),
	/// An injected wallet now exposes only these addresses.
	InjectedAccountsChanged { wallet_id: String, addresses: Vec<String> },
	/// Everything was disconnected.
	ClearAll,
}

/// Applies `event` to the active account, returning whether it changed.
///
/// The EVM family only ever clears an account it set itself, and never replaces an active
/// account that already has the reported address.
pub fn reconcile(active: &mut Option<ActiveAccount>, event: AccountEvent) -> bool {
	let next = match event {
		AccountEvent::SelectInjected(account) => Some(ActiveAccount::Injected(account)),
		AccountEvent::EvmConnected(address) => match active {
			Some(current) if current.address() == address => return false,
			_ => Some(ActiveAccount::Evm { address }),
		},
		AccountEvent::EvmDisconnected => match active {
			Some(ActiveAccount::Evm { .. }) => None,
			_ => return false,
		},
		AccountEvent::InjectedWalletDisconnected(wallet_id) => match active {
			Some(ActiveAccount::Injected(account)) if account.wallet_id == wallet_id => None,
			_ => return false,
		},
		AccountEvent::InjectedAccountsChanged { wallet_id, addresses } => match active {
			Some(ActiveAccount::Injected(account))
				if account.wallet_id == wallet_id && !addresses.contains(&account.address) =>
				None,
			_ => return false,
		},
		AccountEvent::ClearAll => None,
	};
	if *active == next {
		return false;
	}
	*active = next;
	true
}

/// The shared active-account slot. Clones observe and mutate the same slot.
#[derive(Clone, Debug)]
pub struct AccountSlot {
	active: watch::Sender<Option<ActiveAccount>>,
}

impl Default for AccountSlot {
	fn default() -> Self {
		Self::new()
	}
}

impl AccountSlot {
	pub fn new() -> Self {
		let (active, _) = watch::channel(None);
		Self { active }
	}

	/// Applies `event`, notifying observers only if the active account changed.
	pub fn apply(&self, event: AccountEvent) -> bool {
		log::debug!("Applying account event {event:?}");
		self.active.send_if_modified(|active| reconcile(active, event))
	}

	pub fn get(&self) -> Option<ActiveAccount> {
		self.active.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<Option<ActiveAccount>> {
		self.active.subscribe()
	}
}
