// SPDX-License-Identifier: GPL-3.0

//! The seam between the connection manager and a chain client library.
//!
//! [`Connector`] opens a handle to one endpoint; [`ChainApi`] is the handle. The subxt-backed
//! implementation lives in [`crate::rpc`]; tests substitute scripted ones.

use crate::error::RpcClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Raw balance fields of an account as stored on chain.
///
/// Runtimes store the frozen amount under `frozen`; older runtimes used `fee_frozen`. Whichever
/// the runtime exposes is populated, the other is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountFields {
	pub nonce: u32,
	pub free: u128,
	pub reserved: u128,
	pub frozen: Option<u128>,
	pub fee_frozen: Option<u128>,
}

/// Raw staking values read from the `Staking` pallet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StakingFields {
	/// Index of the active era, if one has started.
	pub active_era: Option<u32>,
	pub validator_count: u32,
	pub minimum_validator_count: u32,
	/// Total stake of the active era.
	pub total_stake: u128,
	pub min_nominator_bond: u128,
}

/// An event emitted in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
	/// Pallet emitting the event, e.g. `Balances`.
	pub section: String,
	/// Event variant, e.g. `Transfer`.
	pub method: String,
	/// Hex-encoded SCALE fields of the event.
	pub data: String,
}

/// Events of a single block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockEvents {
	pub block_number: u64,
	pub events: Vec<RawEvent>,
}

/// Chain properties as reported by the node. Absent properties are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainProperties {
	pub chain: String,
	pub token_symbol: Option<String>,
	pub token_decimals: Option<u8>,
	pub ss58_format: Option<u16>,
	/// Hex-encoded genesis hash.
	pub genesis_hash: String,
}

/// A live handle to a chain node.
#[async_trait]
pub trait ChainApi: Send + Sync {
	/// Number of the best block.
	async fn best_block_number(&self) -> Result<u64, RpcClientError>;

	/// Balance fields and nonce of `address`. Unknown accounts yield zeroed fields.
	async fn account(&self, address: &str) -> Result<AccountFields, RpcClientError>;

	/// Next transaction index of `address`, accounting for the transaction pool.
	async fn account_next_index(&self, address: &str) -> Result<u64, RpcClientError>;

	/// Staking values, or `None` when the chain has no staking pallet.
	async fn staking(&self) -> Result<Option<StakingFields>, RpcClientError>;

	/// Events of the latest block.
	async fn latest_events(&self) -> Result<BlockEvents, RpcClientError>;

	async fn chain_properties(&self) -> Result<ChainProperties, RpcClientError>;

	/// Closes the handle. Further calls may fail.
	async fn close(&self) -> Result<(), RpcClientError>;
}

/// Opens handles to chain nodes.
#[async_trait]
pub trait Connector: Send + Sync {
	/// Connects to `endpoint`, resolving once the node acknowledged the connection is ready.
	async fn connect(&self, endpoint: &Url) -> Result<Arc<dyn ChainApi>, RpcClientError>;
}
