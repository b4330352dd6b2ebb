// SPDX-License-Identifier: GPL-3.0

//! The EIP-1193 provider seam: a `request` method plus account and chain change notifications.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// JSON-RPC methods issued to the provider.
pub mod methods {
	pub const ETH_ACCOUNTS: &str = "eth_accounts";
	pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
	pub const ETH_CHAIN_ID: &str = "eth_chainId";
	pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
	pub const WALLET_ADD_ETHEREUM_CHAIN: &str = "wallet_addEthereumChain";
	pub const WALLET_REQUEST_PERMISSIONS: &str = "wallet_requestPermissions";
}

/// The user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// The requested chain hasn't been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// Internal JSON-RPC error, also used for transport failures.
pub const INTERNAL_ERROR: i64 = -32603;

/// An error returned by the provider, carrying its EIP-1193 / JSON-RPC code.
#[derive(Clone, Debug, Deserialize, Error, PartialEq, Eq, Serialize)]
#[error("Provider error {code}: {message}")]
pub struct ProviderError {
	pub code: i64,
	pub message: String,
}

impl ProviderError {
	pub fn new(code: i64, message: impl Into<String>) -> Self {
		Self { code, message: message.into() }
	}

	pub fn is_user_rejection(&self) -> bool {
		self.code == USER_REJECTED
	}

	pub fn is_unrecognized_chain(&self) -> bool {
		self.code == UNRECOGNIZED_CHAIN
	}
}

/// Notifications pushed by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
	/// The permitted accounts changed. Empty when access was revoked or the wallet locked.
	AccountsChanged(Vec<String>),
	/// The active chain changed, as a hex chain id.
	ChainChanged(String),
}

/// An injected Ethereum provider.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
	/// Issues a JSON-RPC request.
	///
	/// # Arguments
	/// * `method` - The method name.
	/// * `params` - The request parameters, `Value::Null` when there are none.
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

	/// Subscribes to provider notifications, if the provider emits any.
	fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>>;
}
