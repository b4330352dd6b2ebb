// SPDX-License-Identifier: GPL-3.0

//! Scripted [`Connector`] and [`ChainApi`] implementations for tests and offline development.

use crate::{
	api::{AccountFields, BlockEvents, ChainApi, ChainProperties, Connector, StakingFields},
	error::RpcClientError,
	registry::NetworkDescriptor,
};
use async_trait::async_trait;
use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex, MutexGuard, PoisonError,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds a test network whose endpoints are `wss://<id>-<n>.test` for `n` in `0..endpoints`.
pub fn test_network(id: &str, endpoints: usize) -> NetworkDescriptor {
	NetworkDescriptor {
		id: id.to_string(),
		name: id.to_string(),
		display_name: id.to_string(),
		token_symbol: "UNIT".into(),
		token_decimals: 12,
		ss58_format: 42,
		endpoints: (0..endpoints).map(|n| format!("wss://{id}-{n}.test")).collect(),
		explorer_url: format!("https://{id}.subscan.io"),
		color: "#000000".into(),
		testnet: true,
	}
}

#[derive(Default)]
struct ChainValues {
	block_number: u64,
	accounts: HashMap<String, AccountFields>,
	nonces: HashMap<String, u64>,
	staking: Option<StakingFields>,
	events: Option<BlockEvents>,
	properties: ChainProperties,
	failure: Option<String>,
	delay: Option<Duration>,
}

/// A chain whose values are set by the test.
#[derive(Default)]
pub struct MockChainApi {
	values: Mutex<ChainValues>,
	calls: AtomicUsize,
	closed: AtomicBool,
}

impl MockChainApi {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn set_block_number(&self, number: u64) {
		lock(&self.values).block_number = number;
	}

	pub fn set_account(&self, address: &str, fields: AccountFields) {
		lock(&self.values).accounts.insert(address.to_string(), fields);
	}

	pub fn set_nonce(&self, address: &str, nonce: u64) {
		lock(&self.values).nonces.insert(address.to_string(), nonce);
	}

	pub fn set_staking(&self, staking: Option<StakingFields>) {
		lock(&self.values).staking = staking;
	}

	pub fn set_events(&self, events: BlockEvents) {
		lock(&self.values).events = Some(events);
	}

	pub fn set_properties(&self, properties: ChainProperties) {
		lock(&self.values).properties = properties;
	}

	/// Makes every request fail with `message`, or succeed again with `None`.
	pub fn set_failure(&self, message: Option<&str>) {
		lock(&self.values).failure = message.map(String::from);
	}

	/// Delays every response by `delay`.
	pub fn set_delay(&self, delay: Option<Duration>) {
		lock(&self.values).delay = delay;
	}

	/// Number of requests served, including failed ones.
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	async fn respond<T>(
		&self,
		method: &'static str,
		read: impl FnOnce(&ChainValues) -> T,
	) -> Result<T, RpcClientError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let delay = lock(&self.values).delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		let values = lock(&self.values);
		match &values.failure {
			Some(message) =>
				Err(RpcClientError::RequestFailed { method, message: message.clone() }),
			None => Ok(read(&values)),
		}
	}
}

#[async_trait]
impl ChainApi for MockChainApi {
	async fn best_block_number(&self) -> Result<u64, RpcClientError> {
		self.respond("chain_getHeader", |v| v.block_number).await
	}

	async fn account(&self, address: &str) -> Result<AccountFields, RpcClientError> {
		self.respond("state_getStorage", |v| v.accounts.get(address).cloned().unwrap_or_default())
			.await
	}

	async fn account_next_index(&self, address: &str) -> Result<u64, RpcClientError> {
		self.respond("system_accountNextIndex", |v| {
			v.nonces.get(address).copied().unwrap_or_default()
		})
		.await
	}

	async fn staking(&self) -> Result<Option<StakingFields>, RpcClientError> {
		self.respond("state_getStorage", |v| v.staking.clone()).await
	}

	async fn latest_events(&self) -> Result<BlockEvents, RpcClientError> {
		self.respond("state_getStorage", |v| {
			v.events.clone().unwrap_or(BlockEvents { block_number: v.block_number, events: vec![] })
		})
		.await
	}

	async fn chain_properties(&self) -> Result<ChainProperties, RpcClientError> {
		self.respond("system_properties", |v| v.properties.clone()).await
	}

	async fn close(&self) -> Result<(), RpcClientError> {
		self.closed.store(true, Ordering::SeqCst);
		Ok(())
	}
}

enum Outcome {
	Accept(Arc<MockChainApi>),
	Refuse(String),
}

/// A connector whose endpoints accept or refuse connections as scripted.
///
/// Endpoints that were not scripted refuse the connection.
#[derive(Default)]
pub struct MockConnector {
	outcomes: Mutex<HashMap<String, Outcome>>,
	delays: Mutex<HashMap<String, Duration>>,
	attempts: Mutex<Vec<String>>,
}

impl MockConnector {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// `endpoint` accepts connections, served by `api`.
	pub fn accept(&self, endpoint: &str, api: Arc<MockChainApi>) {
		lock(&self.outcomes).insert(endpoint.to_string(), Outcome::Accept(api));
	}

	/// `endpoint` refuses connections with `message`.
	pub fn refuse(&self, endpoint: &str, message: &str) {
		lock(&self.outcomes).insert(endpoint.to_string(), Outcome::Refuse(message.to_string()));
	}

	/// Delays the handshake with `endpoint`.
	pub fn delay(&self, endpoint: &str, delay: Duration) {
		lock(&self.delays).insert(endpoint.to_string(), delay);
	}

	/// Endpoints attempted so far, in order.
	pub fn attempts(&self) -> Vec<String> {
		lock(&self.attempts).clone()
	}
}

#[async_trait]
impl Connector for MockConnector {
	async fn connect(&self, endpoint: &Url) -> Result<Arc<dyn ChainApi>, RpcClientError> {
		let endpoint = endpoint.as_str().trim_end_matches('/').to_string();
		lock(&self.attempts).push(endpoint.clone());
		let delay = lock(&self.delays).get(&endpoint).copied();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		let refused = |message: String| RpcClientError::ConnectionFailed {
			endpoint: endpoint.clone(),
			message,
		};
		match lock(&self.outcomes).get(&endpoint) {
			Some(Outcome::Accept(api)) => Ok(api.clone() as Arc<dyn ChainApi>),
			Some(Outcome::Refuse(message)) => Err(refused(message.clone())),
			None => Err(refused("connection refused".into())),
		}
	}
}
