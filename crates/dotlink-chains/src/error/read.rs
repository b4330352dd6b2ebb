// SPDX-License-Identifier: GPL-3.0

use super::RpcClientError;
use thiserror::Error;

/// Errors produced while reading live chain state.
#[derive(Debug, Error)]
pub enum ReadError {
	/// Data arrived after its connection or watched key was invalidated. Never surfaced.
	#[error("Stale data dropped")]
	Stale,
	/// The chain doesn't include a pallet the reader depends on.
	#[error("{0} pallet not available")]
	PalletUnavailable(&'static str),
	/// Integer arithmetic on an on-chain amount overflowed.
	#[error("Arithmetic overflow computing {0}")]
	Overflow(&'static str),
	#[error(transparent)]
	Rpc(#[from] RpcClientError),
}
