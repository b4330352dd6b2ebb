// SPDX-License-Identifier: GPL-3.0

//! RPC client error types.

use thiserror::Error;

/// Errors that can occur when interacting with a chain node.
#[derive(Debug, Error)]
pub enum RpcClientError {
	/// Failed to connect to the RPC endpoint.
	#[error("Failed to connect to {endpoint}: {message}")]
	ConnectionFailed {
		/// The endpoint URL that failed to connect.
		endpoint: String,
		/// The error message describing the failure.
		message: String,
	},
	/// RPC request failed.
	#[error("RPC request {method} failed: {message}")]
	RequestFailed {
		/// The RPC method that failed.
		method: &'static str,
		/// The error message describing the failure.
		message: String,
	},
	/// Invalid response from RPC.
	#[error("Invalid RPC response: {0}")]
	InvalidResponse(String),
	/// The address is not a valid SS58 address.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// A storage value could not be decoded.
	#[error("Failed to decode {item}: {message}")]
	Decode {
		/// The storage item being decoded.
		item: &'static str,
		/// The decoding failure.
		message: String,
	},
}
