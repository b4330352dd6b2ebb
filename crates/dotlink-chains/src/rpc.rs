// SPDX-License-Identifier: GPL-3.0

//! subxt-backed [`ChainApi`] for Polkadot-SDK chains.
//!
//! Plain values are read with the legacy `state_*`/`chain_*` RPCs and decoded with SCALE, the
//! same way for every chain. Metadata is consulted only to learn whether a pallet exists and how
//! the runtime names its account balance fields.

use crate::{
	api::{
		AccountFields, BlockEvents, ChainApi, ChainProperties, Connector, RawEvent, StakingFields,
	},
	error::RpcClientError,
	strings::rpc::{fields, methods, storage},
};
use async_trait::async_trait;
use scale::{Decode, Encode};
use scale_info::TypeDef;
use serde_json::{Map, Value};
use sp_core::{blake2_128, twox_64, twox_128};
use std::{str::FromStr, sync::Arc};
use subxt::{
	OnlineClient, SubstrateConfig,
	backend::{legacy::LegacyRpcMethods, rpc::RpcClient},
	utils::AccountId32,
};
use url::Url;

/// `pallet_staking::ActiveEraInfo`.
#[derive(Decode)]
struct ActiveEraInfo {
	index: u32,
	#[allow(dead_code)]
	start: Option<u64>,
}

/// Leading counters of `frame_system::AccountInfo`, followed by the account data.
#[derive(Decode)]
struct AccountInfoHeader {
	nonce: u32,
	#[allow(dead_code)]
	consumers: u32,
	#[allow(dead_code)]
	providers: u32,
	#[allow(dead_code)]
	sufficients: u32,
}

/// RPC client for a single chain endpoint.
///
/// Construction completes the handshake: the genesis hash, runtime version and metadata have been
/// fetched, so the node has acknowledged the connection is ready.
#[derive(Clone)]
pub struct SubstrateRpcClient {
	client: OnlineClient<SubstrateConfig>,
	legacy: LegacyRpcMethods<SubstrateConfig>,
	endpoint: Url,
	/// Names of the fields of the runtime's account data, in storage order.
	account_data_fields: Vec<String>,
}

impl SubstrateRpcClient {
	/// Connect to a live Polkadot-SDK chain.
	///
	/// # Arguments
	/// * `endpoint` - WebSocket URL of the chain's RPC endpoint (e.g., `wss://rpc.polkadot.io`)
	pub async fn connect(endpoint: &Url) -> Result<Self, RpcClientError> {
		let rpc = RpcClient::from_url(endpoint.as_str())
			.await
			.map_err(|e| connection_failed(endpoint, e))?;
		let client = OnlineClient::<SubstrateConfig>::from_rpc_client(rpc.clone())
			.await
			.map_err(|e| connection_failed(endpoint, e))?;
		let legacy = LegacyRpcMethods::new(rpc);
		let account_data_fields = account_data_fields(&client);
		Ok(Self { client, legacy, endpoint: endpoint.clone(), account_data_fields })
	}

	/// Get the endpoint URL this client is connected to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Get a single storage value at the best block.
	async fn storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>, RpcClientError> {
		self.legacy.state_get_storage(key, None).await.map_err(|e| {
			RpcClientError::RequestFailed {
				method: methods::STATE_GET_STORAGE,
				message: e.to_string(),
			}
		})
	}

	/// Get and decode a single storage value at the best block.
	async fn fetch<T: Decode>(
		&self,
		key: &[u8],
		item: &'static str,
	) -> Result<Option<T>, RpcClientError> {
		match self.storage(key).await? {
			Some(bytes) => T::decode(&mut &bytes[..])
				.map(Some)
				.map_err(|e| RpcClientError::Decode { item, message: e.to_string() }),
			None => Ok(None),
		}
	}

	fn has_pallet(&self, name: &str) -> bool {
		self.client.metadata().pallet_by_name(name).is_some()
	}
}

#[async_trait]
impl ChainApi for SubstrateRpcClient {
	async fn best_block_number(&self) -> Result<u64, RpcClientError> {
		let header = self
			.legacy
			.chain_get_header(None)
			.await
			.map_err(|e| RpcClientError::RequestFailed {
				method: methods::CHAIN_GET_HEADER,
				message: e.to_string(),
			})?
			.ok_or_else(|| RpcClientError::InvalidResponse("No best header".into()))?;
		Ok(u64::from(header.number))
	}

	async fn account(&self, address: &str) -> Result<AccountFields, RpcClientError> {
		let account = parse_account(address)?;
		let key = account_storage_key(&account);
		match self.storage(&key).await? {
			Some(bytes) => decode_account(&bytes, &self.account_data_fields),
			None => Ok(AccountFields::default()),
		}
	}

	async fn account_next_index(&self, address: &str) -> Result<u64, RpcClientError> {
		let account = parse_account(address)?;
		self.legacy.system_account_next_index(&account).await.map_err(|e| {
			RpcClientError::RequestFailed {
				method: methods::SYSTEM_ACCOUNT_NEXT_INDEX,
				message: e.to_string(),
			}
		})
	}

	async fn staking(&self) -> Result<Option<StakingFields>, RpcClientError> {
		if !self.has_pallet(storage::STAKING) {
			return Ok(None);
		}
		let active_era = self
			.fetch::<ActiveEraInfo>(
				&storage_key(storage::STAKING, storage::ACTIVE_ERA),
				storage::ACTIVE_ERA,
			)
			.await?
			.map(|info| info.index);
		let validator_count = self
			.fetch::<u32>(
				&storage_key(storage::STAKING, storage::VALIDATOR_COUNT),
				storage::VALIDATOR_COUNT,
			)
			.await?
			.unwrap_or_default();
		let minimum_validator_count = self
			.fetch::<u32>(
				&storage_key(storage::STAKING, storage::MINIMUM_VALIDATOR_COUNT),
				storage::MINIMUM_VALIDATOR_COUNT,
			)
			.await?
			.unwrap_or_default();
		let min_nominator_bond = self
			.fetch::<u128>(
				&storage_key(storage::STAKING, storage::MIN_NOMINATOR_BOND),
				storage::MIN_NOMINATOR_BOND,
			)
			.await?
			.unwrap_or_default();
		let eras_total_stake = eras_total_stake_key(active_era.unwrap_or_default());
		let total_stake = self
			.fetch::<u128>(&eras_total_stake, storage::ERAS_TOTAL_STAKE)
			.await?
			.unwrap_or_default();
		Ok(Some(StakingFields {
			active_era,
			validator_count,
			minimum_validator_count,
			total_stake,
			min_nominator_bond,
		}))
	}

	async fn latest_events(&self) -> Result<BlockEvents, RpcClientError> {
		let block = self.client.blocks().at_latest().await.map_err(|e| {
			RpcClientError::RequestFailed {
				method: methods::CHAIN_GET_HEADER,
				message: e.to_string(),
			}
		})?;
		let block_number: u64 = block.number().into();
		let events = block.events().await.map_err(|e| RpcClientError::RequestFailed {
			method: methods::STATE_GET_STORAGE,
			message: e.to_string(),
		})?;
		let mut decoded = Vec::new();
		for event in events.iter() {
			let event = event.map_err(|e| RpcClientError::Decode {
				item: storage::EVENTS,
				message: e.to_string(),
			})?;
			decoded.push(RawEvent {
				section: event.pallet_name().to_string(),
				method: event.variant_name().to_string(),
				data: format!("0x{}", hex::encode(event.field_bytes())),
			});
		}
		Ok(BlockEvents { block_number, events: decoded })
	}

	async fn chain_properties(&self) -> Result<ChainProperties, RpcClientError> {
		let chain = self.legacy.system_chain().await.map_err(|e| RpcClientError::RequestFailed {
			method: methods::SYSTEM_CHAIN,
			message: e.to_string(),
		})?;
		let properties =
			self.legacy.system_properties().await.map_err(|e| RpcClientError::RequestFailed {
				method: methods::SYSTEM_PROPERTIES,
				message: e.to_string(),
			})?;
		let genesis_hash = format!("0x{}", hex::encode(self.client.genesis_hash().as_bytes()));
		Ok(parse_properties(chain, &properties, genesis_hash))
	}

	async fn close(&self) -> Result<(), RpcClientError> {
		// The websocket closes once the last clone of the client is dropped.
		log::debug!("Closing connection to {}", self.endpoint);
		Ok(())
	}
}

/// Opens [`SubstrateRpcClient`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubxtConnector;

#[async_trait]
impl Connector for SubxtConnector {
	async fn connect(&self, endpoint: &Url) -> Result<Arc<dyn ChainApi>, RpcClientError> {
		Ok(Arc::new(SubstrateRpcClient::connect(endpoint).await?))
	}
}

fn connection_failed(endpoint: &Url, error: impl ToString) -> RpcClientError {
	RpcClientError::ConnectionFailed { endpoint: endpoint.to_string(), message: error.to_string() }
}

fn parse_account(address: &str) -> Result<AccountId32, RpcClientError> {
	AccountId32::from_str(address)
		.map_err(|e| RpcClientError::InvalidAddress(format!("{address}: {e}")))
}

/// Key of a plain storage value: `twox128(pallet) ++ twox128(item)`.
pub(crate) fn storage_key(pallet: &str, item: &str) -> Vec<u8> {
	[twox_128(pallet.as_bytes()), twox_128(item.as_bytes())].concat()
}

/// Key of `System::Account(account)`, a `Blake2_128Concat` map.
fn account_storage_key(account: &AccountId32) -> Vec<u8> {
	let mut key = storage_key(storage::SYSTEM, storage::ACCOUNT);
	key.extend(blake2_128(&account.0));
	key.extend(account.0);
	key
}

/// Key of `Staking::ErasTotalStake(era)`, a `Twox64Concat` map.
fn eras_total_stake_key(era: u32) -> Vec<u8> {
	let encoded = era.encode();
	let mut key = storage_key(storage::STAKING, storage::ERAS_TOTAL_STAKE);
	key.extend(twox_64(&encoded));
	key.extend(encoded);
	key
}

/// Names the fields of the runtime's `AccountData`, falling back to the current FRAME layout.
fn account_data_fields(client: &OnlineClient<SubstrateConfig>) -> Vec<String> {
	let metadata = client.metadata();
	let types = metadata.types();
	let composite_fields = |id: u32| match types.resolve(id).map(|ty| &ty.type_def) {
		Some(TypeDef::Composite(composite)) => Some(
			composite
				.fields
				.iter()
				.map(|f| (f.name.clone().unwrap_or_default(), f.ty.id))
				.collect::<Vec<_>>(),
		),
		_ => None,
	};
	let names = metadata
		.pallet_by_name(storage::SYSTEM)
		.and_then(|pallet| pallet.storage())
		.and_then(|entries| entries.entry_by_name(storage::ACCOUNT))
		.map(|entry| entry.entry_type().value_ty())
		.and_then(composite_fields)
		.and_then(|info| info.into_iter().find(|(name, _)| name == fields::DATA))
		.and_then(|(_, data_ty)| composite_fields(data_ty))
		.map(|data| data.into_iter().map(|(name, _)| name).collect::<Vec<_>>());
	names.unwrap_or_else(|| {
		log::warn!("Unable to resolve the account data layout, assuming the current one");
		[fields::FREE, fields::RESERVED, fields::FROZEN, "flags"].map(String::from).to_vec()
	})
}

/// Decodes `frame_system::AccountInfo` whose data holds one `u128` per named field.
pub(crate) fn decode_account(
	bytes: &[u8],
	data_fields: &[String],
) -> Result<AccountFields, RpcClientError> {
	let decode_error =
		|e: scale::Error| RpcClientError::Decode { item: storage::ACCOUNT, message: e.to_string() };
	let input = &mut &bytes[..];
	let header = AccountInfoHeader::decode(input).map_err(decode_error)?;
	let mut account = AccountFields { nonce: header.nonce, ..Default::default() };
	for name in data_fields {
		let value = u128::decode(input).map_err(decode_error)?;
		match name.as_str() {
			fields::FREE => account.free = value,
			fields::RESERVED => account.reserved = value,
			fields::FROZEN => account.frozen = Some(value),
			fields::FEE_FROZEN => account.fee_frozen = Some(value),
			_ => {},
		}
	}
	Ok(account)
}

/// Interprets `system_properties`. Multi-token chains report arrays; the first entry is native.
pub(crate) fn parse_properties(
	chain: String,
	properties: &Map<String, Value>,
	genesis_hash: String,
) -> ChainProperties {
	fn first(value: Option<&Value>) -> Option<&Value> {
		match value {
			Some(Value::Array(values)) => values.first(),
			other => other,
		}
	}
	ChainProperties {
		chain,
		token_symbol: first(properties.get("tokenSymbol"))
			.and_then(Value::as_str)
			.map(String::from),
		token_decimals: first(properties.get("tokenDecimals"))
			.and_then(Value::as_u64)
			.and_then(|d| u8::try_from(d).ok()),
		ss58_format: properties
			.get("ss58Format")
			.and_then(Value::as_u64)
			.and_then(|f| u16::try_from(f).ok()),
		genesis_hash,
	}
}
