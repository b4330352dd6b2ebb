// SPDX-License-Identifier: GPL-3.0

#![doc = include_str!("../README.md")]

/// The active-account slot and its reconciliation rules.
pub mod account;
mod errors;
/// The injected EIP-1193 wallet adapter.
pub mod evm;
/// Injected multi-account wallets.
pub mod injected;
/// Account nicknames.
pub mod nicknames;
/// Scripted wallet environments for tests.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use account::{
	AccountDescriptor, AccountEvent, AccountSlot, AccountSource, ActiveAccount, reconcile,
};
pub use errors::Error;
pub use evm::{
	Eip1193Provider, EvmChainParams, EvmState, EvmWallet, HttpProvider, ProviderError,
	ProviderEvent, ProviderHost,
};
pub use injected::{InjectedAccount, InjectedWalletRegistry, InjectedWeb3, WalletDescriptor};
pub use nicknames::Nicknames;
