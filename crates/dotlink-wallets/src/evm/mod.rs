// SPDX-License-Identifier: GPL-3.0

//! Adapter for a single injected EIP-1193 (Ethereum-style) wallet provider.
//!
//! The provider is discovered through a [`ProviderHost`], the injection point the runtime
//! populates. Once [mounted](EvmWallet::mount), the adapter tracks whether a provider is present,
//! silently syncs the permitted accounts and chain id, and follows account and chain change
//! notifications. Every change of the head account is reconciled into the shared
//! [`AccountSlot`] while the adapter's own state is locked, so EVM-originated transitions reach
//! the slot in the order they happened.

pub mod chain;
mod http;
pub mod provider;

pub use chain::{EvmChainParams, NativeCurrency, paseo_asset_hub, parse_chain_id};
pub use http::HttpProvider;
pub use provider::{Eip1193Provider, ProviderError, ProviderEvent};

use crate::{
	Error,
	account::{AccountEvent, AccountSlot},
};
use provider::methods;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{
	sync::{broadcast, watch},
	task::JoinHandle,
};

/// The runtime's provider injection point. `None` while no provider is injected.
pub type ProviderHost = watch::Receiver<Option<Arc<dyn Eip1193Provider>>>;

/// Observable state of the EVM wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvmState {
	/// Whether a provider is injected.
	pub installed: bool,
	/// Accounts the app may access, head first.
	pub accounts: Vec<String>,
	/// Whether at least one account is accessible.
	pub connected: bool,
	/// The head account.
	pub current_account: Option<String>,
	/// Hex chain id reported by the provider.
	pub chain_id: Option<String>,
	/// Bumped by [`EvmWallet::refresh`]. Consumers key derived chain data on it.
	pub refresh: u64,
}

struct Shared {
	host: ProviderHost,
	slot: AccountSlot,
	state: watch::Sender<EvmState>,
}

/// The EVM wallet adapter.
pub struct EvmWallet {
	shared: Arc<Shared>,
	driver: Mutex<Option<JoinHandle<()>>>,
}

impl EvmWallet {
	/// # Arguments
	/// * `host` - The provider injection point.
	/// * `slot` - The shared active-account slot.
	pub fn new(host: ProviderHost, slot: AccountSlot) -> Self {
		let installed = host.borrow().is_some();
		let (state, _) = watch::channel(EvmState { installed, ..Default::default() });
		Self { shared: Arc::new(Shared { host, slot, state }), driver: Mutex::new(None) }
	}

	/// Starts following the provider. Mounting again while mounted has no effect.
	///
	/// Returns whether a new driver was started. Must be called within a Tokio runtime.
	pub fn mount(&self) -> bool {
		let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
		if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
			return false;
		}
		*driver = Some(tokio::spawn(self.shared.clone().drive()));
		true
	}

	/// Stops following the provider. The state is left as is.
	pub fn unmount(&self) {
		if let Some(handle) = self.driver.lock().unwrap_or_else(PoisonError::into_inner).take() {
			handle.abort();
		}
	}

	pub fn state(&self) -> EvmState {
		self.shared.state.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<EvmState> {
		self.shared.state.subscribe()
	}

	pub fn slot(&self) -> &AccountSlot {
		&self.shared.slot
	}

	fn provider(&self) -> Result<Arc<dyn Eip1193Provider>, Error> {
		self.shared.provider().ok_or(Error::ProviderNotInstalled)
	}

	/// Re-queries the permitted accounts after the app regains focus.
	///
	/// Some wallets don't notify account switches made while the app was in the background.
	/// Returns whether the head account changed.
	pub async fn handle_focus(&self) -> Result<bool, Error> {
		let Some(provider) = self.shared.provider() else {
			return Ok(false);
		};
		let accounts = request_accounts(provider.as_ref(), methods::ETH_ACCOUNTS).await?;
		if accounts.first() == self.shared.state.borrow().current_account.as_ref() {
			return Ok(false);
		}
		log::info!("Head account changed while unfocused");
		Ok(self.shared.apply_accounts(accounts, false))
	}

	/// Requests account access, possibly prompting the user, and returns the permitted accounts.
	pub async fn connect(&self) -> Result<Vec<String>, Error> {
		let provider = self.provider()?;
		let accounts = request_accounts(provider.as_ref(), methods::ETH_REQUEST_ACCOUNTS).await?;
		self.shared.apply_accounts(accounts.clone(), true);
		match provider.request(methods::ETH_CHAIN_ID, Value::Null).await {
			Ok(Value::String(chain_id)) => self.shared.set_chain(chain_id),
			Ok(other) => log::warn!("Ignoring unexpected chain id {other}"),
			Err(e) => log::warn!("Failed to read the chain id: {e}"),
		}
		Ok(accounts)
	}

	/// Forgets the permitted accounts locally.
	///
	/// Providers offer no programmatic disconnect, so the wallet's grant stays in place.
	pub fn disconnect(&self) {
		self.shared.state.send_if_modified(|state| {
			let changed = state.connected || !state.accounts.is_empty();
			state.accounts.clear();
			state.connected = false;
			state.current_account = None;
			self.shared.slot.apply(AccountEvent::EvmDisconnected);
			changed
		});
	}

	/// Bumps the refresh counter, returning its new value.
	pub fn refresh(&self) -> u64 {
		let mut refresh = 0;
		self.shared.state.send_modify(|state| {
			state.refresh = state.refresh.saturating_add(1);
			refresh = state.refresh;
		});
		refresh
	}

	/// Asks the wallet to switch to `chain_id`.
	///
	/// Fails with [`Error::UnsupportedChain`] when the wallet doesn't know the chain.
	pub async fn switch_chain(&self, chain_id: &str) -> Result<(), Error> {
		let provider = self.provider()?;
		provider
			.request(methods::WALLET_SWITCH_ETHEREUM_CHAIN, json!([{ "chainId": chain_id }]))
			.await
			.map_err(|e| match e {
				e if e.is_unrecognized_chain() => Error::UnsupportedChain(chain_id.to_string()),
				e => provider_error(e),
			})?;
		self.shared.set_chain(chain_id.to_string());
		Ok(())
	}

	/// Switches to the chain described by `params`, adding it to the wallet first if needed.
	pub async fn ensure_chain(&self, params: &EvmChainParams) -> Result<(), Error> {
		match self.switch_chain(&params.chain_id).await {
			Err(Error::UnsupportedChain(chain_id)) => {
				log::info!("Adding chain {chain_id} to the wallet");
				let provider = self.provider()?;
				provider
					.request(methods::WALLET_ADD_ETHEREUM_CHAIN, json!([params]))
					.await
					.map_err(provider_error)?;
				self.shared.set_chain(chain_id);
				Ok(())
			},
			result => result,
		}
	}

	/// Lets the user pick other accounts, then reconnects and bumps the refresh counter.
	///
	/// Wallets that don't support permission requests fall back to a plain connect. Returns
	/// whether the head account changed.
	pub async fn switch_account(&self) -> Result<bool, Error> {
		let provider = self.provider()?;
		let previous = self.state().current_account;
		if let Err(e) = provider
			.request(methods::WALLET_REQUEST_PERMISSIONS, json!([{ "eth_accounts": {} }]))
			.await
		{
			log::debug!("Permission request failed, requesting accounts instead: {e}");
		}
		let accounts = self.connect().await?;
		self.refresh();
		Ok(accounts.first() != previous.as_ref())
	}
}

impl Drop for EvmWallet {
	fn drop(&mut self) {
		self.unmount();
	}
}

impl Shared {
	fn provider(&self) -> Option<Arc<dyn Eip1193Provider>> {
		self.host.borrow().clone()
	}

	/// Records the permitted accounts, reconciling the active account when the head changed or
	/// when `force` is set. Returns whether the head account changed.
	fn apply_accounts(&self, accounts: Vec<String>, force: bool) -> bool {
		let mut head_changed = false;
		self.state.send_if_modified(|state| {
			let head = accounts.first().cloned();
			head_changed = state.current_account != head;
			let changed = head_changed || state.accounts != accounts;
			state.connected = head.is_some();
			state.current_account = head.clone();
			state.accounts = accounts;
			if head_changed || force {
				self.slot.apply(match head {
					Some(address) => AccountEvent::EvmConnected(address),
					None => AccountEvent::EvmDisconnected,
				});
			}
			changed
		});
		head_changed
	}

	fn set_chain(&self, chain_id: String) {
		self.state.send_if_modified(|state| {
			let changed = state.chain_id.as_ref() != Some(&chain_id);
			state.chain_id = Some(chain_id);
			changed
		});
	}

	fn set_installed(&self, installed: bool) {
		self.state.send_if_modified(|state| {
			let changed = state.installed != installed;
			state.installed = installed;
			changed
		});
	}

	fn handle_event(&self, event: ProviderEvent) {
		log::debug!("Provider event {event:?}");
		match event {
			ProviderEvent::AccountsChanged(accounts) => {
				self.apply_accounts(accounts, false);
			},
			ProviderEvent::ChainChanged(chain_id) => self.set_chain(chain_id),
		}
	}

	/// Reads the permitted accounts and chain id without prompting.
	async fn sync(&self, provider: &dyn Eip1193Provider) {
		match request_accounts(provider, methods::ETH_ACCOUNTS).await {
			Ok(accounts) => {
				self.apply_accounts(accounts, false);
			},
			Err(e) => log::warn!("Initial account sync failed: {e}"),
		}
		match provider.request(methods::ETH_CHAIN_ID, Value::Null).await {
			Ok(Value::String(chain_id)) => self.set_chain(chain_id),
			Ok(other) => log::warn!("Ignoring unexpected chain id {other}"),
			Err(e) => log::warn!("Initial chain sync failed: {e}"),
		}
	}

	/// Follows the injection point, subscribing once to each injected provider.
	async fn drive(self: Arc<Self>) {
		let mut host = self.host.clone();
		let mut host_open = true;
		loop {
			let current = host.borrow_and_update().clone();
			self.set_installed(current.is_some());
			let Some(provider) = current else {
				self.apply_accounts(Vec::new(), false);
				if host.changed().await.is_err() {
					return;
				}
				continue;
			};

			let mut events = provider.subscribe();
			self.sync(provider.as_ref()).await;
			loop {
				tokio::select! {
					changed = host.changed(), if host_open => {
						if changed.is_err() {
							host_open = false;
						} else {
							let replaced = !same_provider(&host.borrow(), &provider);
							if replaced {
								break;
							}
						}
					},
					event = next_event(&mut events) => match event {
						Some(event) => self.handle_event(event),
						None => events = None,
					},
				}
				if !host_open && events.is_none() {
					return;
				}
			}
		}
	}
}

fn same_provider(
	injected: &Option<Arc<dyn Eip1193Provider>>,
	provider: &Arc<dyn Eip1193Provider>,
) -> bool {
	injected
		.as_ref()
		.is_some_and(|injected| std::ptr::addr_eq(Arc::as_ptr(injected), Arc::as_ptr(provider)))
}

async fn next_event(
	events: &mut Option<broadcast::Receiver<ProviderEvent>>,
) -> Option<ProviderEvent> {
	let Some(receiver) = events else {
		return std::future::pending().await;
	};
	loop {
		match receiver.recv().await {
			Ok(event) => return Some(event),
			Err(broadcast::error::RecvError::Lagged(skipped)) =>
				log::warn!("Missed {skipped} provider events"),
			Err(broadcast::error::RecvError::Closed) => return None,
		}
	}
}

fn provider_error(e: ProviderError) -> Error {
	if e.is_user_rejection() { Error::AccessDenied(e.message) } else { Error::Provider(e) }
}

async fn request_accounts(
	provider: &dyn Eip1193Provider,
	method: &'static str,
) -> Result<Vec<String>, Error> {
	match provider.request(method, Value::Null).await.map_err(provider_error)? {
		Value::Null => Ok(Vec::new()),
		accounts => serde_json::from_value(accounts)
			.map_err(|e| Error::InvalidResponse { method, message: e.to_string() }),
	}
}
