// SPDX-License-Identifier: GPL-3.0

//! Scripted wallet environments for tests.

use crate::{
	Error,
	evm::{Eip1193Provider, ProviderError, ProviderEvent, provider::methods},
	injected::{InjectedAccount, InjectedWeb3},
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::sync::{
	Arc, Mutex, MutexGuard, PoisonError,
	atomic::{AtomicUsize, Ordering},
};
use tokio::sync::broadcast;

/// Method not found.
const METHOD_NOT_FOUND: i64 = -32601;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds an injected account.
pub fn injected_account(address: &str, name: Option<&str>) -> InjectedAccount {
	InjectedAccount { address: address.to_string(), name: name.map(String::from) }
}

#[derive(Default)]
struct MockWallet {
	accounts: Vec<InjectedAccount>,
	deny: bool,
}

/// A scripted set of injected wallet extensions.
#[derive(Default)]
pub struct MockInjectedWeb3 {
	wallets: Mutex<IndexMap<String, MockWallet>>,
	enable_calls: AtomicUsize,
}

impl MockInjectedWeb3 {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Injects a wallet exposing `accounts`.
	pub fn install(&self, wallet_id: &str, accounts: Vec<InjectedAccount>) {
		lock(&self.wallets).insert(wallet_id.to_string(), MockWallet { accounts, deny: false });
	}

	/// Removes a wallet from the environment.
	pub fn uninstall(&self, wallet_id: &str) {
		lock(&self.wallets).shift_remove(wallet_id);
	}

	/// Replaces the accounts a wallet exposes on the next access request.
	pub fn set_accounts(&self, wallet_id: &str, accounts: Vec<InjectedAccount>) {
		if let Some(wallet) = lock(&self.wallets).get_mut(wallet_id) {
			wallet.accounts = accounts;
		}
	}

	/// Makes the user reject access requests to a wallet.
	pub fn deny(&self, wallet_id: &str) {
		if let Some(wallet) = lock(&self.wallets).get_mut(wallet_id) {
			wallet.deny = true;
		}
	}

	pub fn enable_calls(&self) -> usize {
		self.enable_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl InjectedWeb3 for MockInjectedWeb3 {
	fn injected_sources(&self) -> Vec<String> {
		lock(&self.wallets).keys().cloned().collect()
	}

	async fn enable(&self, wallet_id: &str, app_name: &str) -> Result<Vec<InjectedAccount>, Error> {
		self.enable_calls.fetch_add(1, Ordering::SeqCst);
		let wallets = lock(&self.wallets);
		match wallets.get(wallet_id) {
			None => Err(Error::WalletUnavailable(wallet_id.to_string())),
			Some(wallet) if wallet.deny =>
				Err(Error::AccessDenied(format!("{wallet_id} rejected {app_name}"))),
			Some(wallet) => Ok(wallet.accounts.clone()),
		}
	}
}

#[derive(Default)]
struct ProviderScript {
	/// Accounts the app was granted, returned by `eth_accounts`.
	permitted: Vec<String>,
	/// Accounts granted on `eth_requestAccounts`.
	wallet_accounts: Vec<String>,
	chain_id: String,
	known_chains: Vec<String>,
	failures: IndexMap<String, ProviderError>,
	calls: Vec<String>,
}

/// A scripted EIP-1193 provider.
pub struct MockEip1193Provider {
	script: Mutex<ProviderScript>,
	events: broadcast::Sender<ProviderEvent>,
	subscriptions: AtomicUsize,
}

impl MockEip1193Provider {
	/// A provider on chain `0x1` that hasn't granted any account yet.
	pub fn new() -> Arc<Self> {
		let (events, _) = broadcast::channel(16);
		Arc::new(Self {
			script: Mutex::new(ProviderScript {
				chain_id: "0x1".to_string(),
				known_chains: vec!["0x1".to_string()],
				..Default::default()
			}),
			events,
			subscriptions: AtomicUsize::new(0),
		})
	}

	/// Accounts the wallet grants when asked.
	pub fn set_wallet_accounts(&self, accounts: &[&str]) {
		lock(&self.script).wallet_accounts =
			accounts.iter().map(|a| a.to_string()).collect();
	}

	/// Grants `accounts` without emitting a notification, like a switch made while unfocused.
	pub fn grant_silently(&self, accounts: &[&str]) {
		let accounts: Vec<String> = accounts.iter().map(|a| a.to_string()).collect();
		let mut script = lock(&self.script);
		script.wallet_accounts = accounts.clone();
		script.permitted = accounts;
	}

	/// Grants `accounts` and notifies subscribers.
	pub fn change_accounts(&self, accounts: &[&str]) {
		self.grant_silently(accounts);
		let _ = self
			.events
			.send(ProviderEvent::AccountsChanged(accounts.iter().map(|a| a.to_string()).collect()));
	}

	/// Switches chain and notifies subscribers.
	pub fn change_chain(&self, chain_id: &str) {
		lock(&self.script).chain_id = chain_id.to_string();
		let _ = self.events.send(ProviderEvent::ChainChanged(chain_id.to_string()));
	}

	/// Makes `method` fail with `error`.
	pub fn fail(&self, method: &str, error: ProviderError) {
		lock(&self.script).failures.insert(method.to_string(), error);
	}

	pub fn chain_id(&self) -> String {
		lock(&self.script).chain_id.clone()
	}

	/// Methods requested so far, in order.
	pub fn calls(&self) -> Vec<String> {
		lock(&self.script).calls.clone()
	}

	pub fn subscriptions(&self) -> usize {
		self.subscriptions.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Eip1193Provider for MockEip1193Provider {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
		let mut script = lock(&self.script);
		script.calls.push(method.to_string());
		if let Some(error) = script.failures.get(method) {
			return Err(error.clone());
		}
		match method {
			methods::ETH_ACCOUNTS => Ok(json!(script.permitted)),
			methods::ETH_REQUEST_ACCOUNTS => {
				script.permitted = script.wallet_accounts.clone();
				Ok(json!(script.permitted))
			},
			methods::ETH_CHAIN_ID => Ok(json!(script.chain_id)),
			methods::WALLET_SWITCH_ETHEREUM_CHAIN => {
				let chain_id = params[0]["chainId"].as_str().unwrap_or_default().to_string();
				if !script.known_chains.contains(&chain_id) {
					return Err(ProviderError::new(4902, "Unrecognized chain ID"));
				}
				script.chain_id = chain_id;
				Ok(Value::Null)
			},
			methods::WALLET_ADD_ETHEREUM_CHAIN => {
				let chain_id = params[0]["chainId"].as_str().unwrap_or_default().to_string();
				script.known_chains.push(chain_id.clone());
				script.chain_id = chain_id;
				Ok(Value::Null)
			},
			methods::WALLET_REQUEST_PERMISSIONS =>
				Ok(json!([{ "parentCapability": "eth_accounts" }])),
			_ => Err(ProviderError::new(METHOD_NOT_FOUND, format!("{method} not supported"))),
		}
	}

	fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
		self.subscriptions.fetch_add(1, Ordering::SeqCst);
		Some(self.events.subscribe())
	}
}
