// SPDX-License-Identifier: GPL-3.0

//! Error types for chain access.
//!
//! - [`rpc::RpcClientError`] - Errors from the RPC client talking to a node.
//! - [`read::ReadError`] - Errors from the live chain-state readers.
//! - [`Error`] - Errors surfaced by the connection manager.

pub mod read;
pub mod rpc;

pub use read::ReadError;
pub use rpc::RpcClientError;
use thiserror::Error;

/// Errors surfaced by the connection manager.
#[derive(Debug, Error)]
pub enum Error {
	/// Every endpoint of the network failed.
	#[error("Failed to connect to {network}: all {attempts} endpoints failed ({message})")]
	ConnectionFailure {
		/// Identifier of the network.
		network: String,
		/// Number of endpoints attempted.
		attempts: usize,
		/// The last failure.
		message: String,
	},
	/// The attempt was abandoned because a newer connect, switch or disconnect took over.
	#[error("Connection attempt to {0} was superseded")]
	Superseded(String),
	/// Persisted state could not be written or read.
	#[error("Storage error: {0}")]
	Storage(#[from] dotlink_common::Error),
}
