// SPDX-License-Identifier: GPL-3.0

use crate::evm::ProviderError;
use thiserror::Error;

/// Errors surfaced by the wallet adapters.
#[derive(Debug, Error)]
pub enum Error {
	/// The wallet extension is not installed.
	#[error("Wallet {0} is not installed")]
	WalletUnavailable(String),
	/// The user rejected the permission prompt.
	#[error("Access denied: {0}")]
	AccessDenied(String),
	/// No EVM provider is injected.
	#[error("No EVM wallet provider is installed")]
	ProviderNotInstalled,
	/// The EVM wallet doesn't know the chain. Recoverable by adding it.
	#[error("Chain {0} has not been added to the wallet")]
	UnsupportedChain(String),
	/// The account isn't exposed by any connected wallet.
	#[error("Account {0} does not belong to a connected wallet")]
	UnknownAccount(String),
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// The provider answered with an unexpected payload.
	#[error("Invalid provider response to {method}: {message}")]
	InvalidResponse { method: &'static str, message: String },
	#[error("Storage error: {0}")]
	Storage(#[from] dotlink_common::Error),
}
