// SPDX-License-Identifier: GPL-3.0

//! Live chain-state readers.
//!
//! Every reader has the same shape: a [`Query`] describing what to fetch for a watched key, driven
//! by a [`Reader`] that owns at most one subscription scoped to (connection identity, key). The
//! subscription is released whenever the connection leaves `Connected`, the connection is
//! replaced, the key changes or the reader is dropped, and a fresh one is acquired as soon as
//! the new state allows it. Results fetched under a released scope are dropped.

mod balance;
mod block;
mod cache;
mod chain_info;
mod events;
mod nonce;
mod staking;

pub use balance::{Balance, BalanceQuery};
pub use block::BlockNumberQuery;
pub use cache::{CacheKey, SnapshotCache};
pub use chain_info::{ChainInfo, ChainInfoQuery};
pub use events::{ChainEvent, EventsQuery};
pub use nonce::NonceQuery;
pub use staking::{StakingInfo, StakingQuery};

use crate::{
	api::ChainApi,
	connection::{Connection, ConnectionState},
	error::ReadError,
};
use async_trait::async_trait;
use dotlink_common::{Clock, RefreshConfig, RefreshPolicy, ScheduledRefresh};
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Something a reader fetches for a watched key.
#[async_trait]
pub trait Query: Send + Sync + 'static {
	/// Name of the resource, part of the cache key.
	const KIND: &'static str;
	/// The watched key, e.g. an address. `()` for chain-wide resources.
	type Key: Clone + Debug + PartialEq + Send + Sync + 'static;
	type Output: Clone + Debug + PartialEq + Send + Sync + 'static;

	async fn fetch(&self, api: &dyn ChainApi, key: &Self::Key) -> Result<Self::Output, ReadError>;

	/// Combines a fetched or cached value with the reader's previous snapshot. Replaces it by
	/// default.
	fn merge(&self, _previous: Option<&Self::Output>, fetched: Self::Output) -> Self::Output {
		fetched
	}
}

/// Lifecycle of a reader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadStatus {
	/// No subscription.
	#[default]
	Idle,
	/// Subscribed, no data yet.
	Loading,
	/// Subscribed, data present.
	Ready,
}

/// The latest snapshot of a reader.
///
/// `error` is a side channel: it records the last failed fetch without changing the status, and
/// is cleared by the next successful one.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadState<T> {
	pub status: ReadStatus,
	pub data: Option<T>,
	pub error: Option<String>,
}

impl<T> Default for ReadState<T> {
	fn default() -> Self {
		Self { status: ReadStatus::Idle, data: None, error: None }
	}
}

impl<T> ReadState<T> {
	pub fn is_loading(&self) -> bool {
		self.status == ReadStatus::Loading
	}
}

/// Drives a [`Query`] against the live connection.
///
/// The driver task is aborted when the reader is dropped, releasing its subscription.
pub struct Reader<Q: Query> {
	state: watch::Receiver<ReadState<Q::Output>>,
	key: watch::Sender<Option<Q::Key>>,
	task: JoinHandle<()>,
}

impl<Q: Query> Reader<Q> {
	/// Spawns a reader. Must be called within a Tokio runtime.
	///
	/// # Arguments
	/// * `query` - What to fetch.
	/// * `policy` - Refetch interval and staleness window.
	/// * `connection` - Observes the connection manager.
	/// * `key` - The initial watched key; `None` keeps the reader idle.
	/// * `cache` - Snapshot cache shared between readers.
	pub fn spawn(
		query: Q,
		policy: RefreshPolicy,
		connection: watch::Receiver<ConnectionState>,
		key: Option<Q::Key>,
		cache: Arc<SnapshotCache>,
	) -> Self {
		let (state_tx, state) = watch::channel(ReadState::default());
		let (key, key_rx) = watch::channel(key);
		let driver = Driver { query: Arc::new(query), policy, cache, state: state_tx };
		let task = tokio::spawn(driver.run(connection, key_rx));
		Self { state, key, task }
	}

	/// Changes the watched key. Setting the same key again keeps the subscription.
	pub fn set_key(&self, key: Option<Q::Key>) {
		self.key.send_if_modified(|current| {
			if *current == key {
				return false;
			}
			*current = key;
			true
		});
	}

	/// The latest snapshot.
	pub fn state(&self) -> ReadState<Q::Output> {
		self.state.borrow().clone()
	}

	/// The latest data, if any.
	pub fn data(&self) -> Option<Q::Output> {
		self.state.borrow().data.clone()
	}

	/// Observes the snapshots.
	pub fn subscribe(&self) -> watch::Receiver<ReadState<Q::Output>> {
		self.state.clone()
	}
}

impl<Q: Query> Drop for Reader<Q> {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// A subscription scope: the connection and key it was acquired for.
type Scope<K> = (u64, K);

struct Driver<Q: Query> {
	query: Arc<Q>,
	policy: RefreshPolicy,
	cache: Arc<SnapshotCache>,
	state: watch::Sender<ReadState<Q::Output>>,
}

/// A scope's running refresh task; cancelled on drop.
struct Subscription {
	token: CancellationToken,
	task: JoinHandle<()>,
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.token.cancel();
		self.task.abort();
	}
}

impl<Q: Query> Driver<Q> {
	async fn run(
		self,
		mut connection: watch::Receiver<ConnectionState>,
		mut key: watch::Receiver<Option<Q::Key>>,
	) {
		let mut scope: Option<Scope<Q::Key>> = None;
		let mut subscription: Option<Subscription> = None;
		loop {
			let target = {
				let connection = connection.borrow_and_update();
				let key = key.borrow_and_update();
				match (connection.connected(), key.as_ref()) {
					(Some(connection), Some(key)) => Some((connection.clone(), key.clone())),
					_ => None,
				}
			};
			let target_scope = target.as_ref().map(|(c, k)| (c.id(), k.clone()));
			if target_scope != scope {
				// Release before acquiring, so no two scopes are ever live together.
				drop(subscription.take());
				scope = target_scope;
				subscription = match target {
					Some((live, watched)) => {
						Some(self.subscribe(live, watched, connection.clone(), key.clone()))
					},
					None => {
						self.state.send_replace(ReadState::default());
						None
					},
				};
			}
			tokio::select! {
				changed = connection.changed() => if changed.is_err() { break },
				changed = key.changed() => if changed.is_err() { break },
			}
		}
		drop(subscription);
		self.state.send_replace(ReadState::default());
	}

	fn subscribe(
		&self,
		live: Connection,
		watched: Q::Key,
		connection: watch::Receiver<ConnectionState>,
		key: watch::Receiver<Option<Q::Key>>,
	) -> Subscription {
		let cache_key = CacheKey::new(Q::KIND, live.network_id(), &watched);
		let cached = self
			.cache
			.fresh::<Q::Output>(&cache_key, self.policy.stale_time)
			.map(|snapshot| self.query.merge(None, snapshot));
		self.state.send_replace(ReadState {
			status: if cached.is_some() { ReadStatus::Ready } else { ReadStatus::Loading },
			data: cached,
			error: None,
		});
		log::debug!("Subscribing {} for {watched:?} on connection {}", Q::KIND, live.id());

		let token = CancellationToken::new();
		let tick = Tick {
			query: self.query.clone(),
			stale_time: self.policy.stale_time,
			cache: self.cache.clone(),
			cache_key,
			state: self.state.clone(),
			live,
			watched,
			connection,
			key,
		};
		let refresh = ScheduledRefresh::new(self.policy);
		let task = tokio::spawn({
			let token = token.clone();
			async move {
				let tick = &tick;
				refresh.run(&token, || tick.run()).await;
			}
		});
		Subscription { token, task }
	}
}

/// One refresh of a subscription scope.
struct Tick<Q: Query> {
	query: Arc<Q>,
	stale_time: Duration,
	cache: Arc<SnapshotCache>,
	cache_key: CacheKey,
	state: watch::Sender<ReadState<Q::Output>>,
	live: Connection,
	watched: Q::Key,
	connection: watch::Receiver<ConnectionState>,
	key: watch::Receiver<Option<Q::Key>>,
}

impl<Q: Query> Tick<Q> {
	async fn run(&self) {
		if let Some(cached) = self.cache.fresh::<Q::Output>(&self.cache_key, self.stale_time) {
			self.publish(Ok(cached), false);
			return;
		}
		let result = self.query.fetch(self.live.api().as_ref(), &self.watched).await;
		self.publish(result, true);
	}

	/// Merges a snapshot into the reader state, or records a failed read.
	///
	/// The scope is checked while the state is locked, so nothing lands once the driver has
	/// moved on to another scope. Only changes notify observers.
	fn publish(&self, result: Result<Q::Output, ReadError>, fetched: bool) {
		self.state.send_if_modified(|state| {
			if let Err(e) = self.ensure_live() {
				log::debug!("{} for {:?}: {e}", Q::KIND, self.watched);
				return false;
			}
			match result {
				Ok(snapshot) => {
					if fetched {
						self.cache.put(self.cache_key.clone(), snapshot.clone(), self.stale_time);
					}
					let merged = self.query.merge(state.data.as_ref(), snapshot);
					let modified = state.status != ReadStatus::Ready ||
						state.error.is_some() ||
						state.data.as_ref() != Some(&merged);
					state.status = ReadStatus::Ready;
					state.data = Some(merged);
					state.error = None;
					modified
				},
				Err(e) => {
					log::warn!("Failed to read {} for {:?}: {e}", Q::KIND, self.watched);
					state.error = Some(e.to_string());
					true
				},
			}
		});
	}

	/// Fails with [`ReadError::Stale`] once the connection or key this tick was scheduled for
	/// has been replaced, even if the driver has not released the subscription yet.
	fn ensure_live(&self) -> Result<(), ReadError> {
		let connected = self.connection.borrow().connected().map(Connection::id);
		let same_key = self.key.borrow().as_ref() == Some(&self.watched);
		match connected == Some(self.live.id()) && same_key {
			true => Ok(()),
			false => Err(ReadError::Stale),
		}
	}
}

/// Creates readers bound to one connection manager.
#[derive(Clone)]
pub struct ReaderFactory {
	connection: watch::Receiver<ConnectionState>,
	refresh: RefreshConfig,
	cache: Arc<SnapshotCache>,
	clock: Arc<dyn Clock>,
	max_events: usize,
}

impl ReaderFactory {
	/// # Arguments
	/// * `connection` - Observes the connection manager.
	/// * `config` - Supplies the refresh policies and the event log size.
	/// * `clock` - Timestamps event log entries.
	pub fn new(
		connection: watch::Receiver<ConnectionState>,
		config: &dotlink_common::Config,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			connection,
			refresh: config.refresh.clone(),
			cache: Arc::new(SnapshotCache::new()),
			clock,
			max_events: config.max_events,
		}
	}

	pub fn cache(&self) -> &Arc<SnapshotCache> {
		&self.cache
	}

	fn spawn<Q: Query>(&self, query: Q, policy: RefreshPolicy, key: Option<Q::Key>) -> Reader<Q> {
		Reader::spawn(query, policy, self.connection.clone(), key, self.cache.clone())
	}

	/// Balance of `address`.
	pub fn balance(&self, address: Option<String>) -> Reader<BalanceQuery> {
		self.spawn(BalanceQuery, self.refresh.balance, address)
	}

	/// Next transaction index of `address`.
	pub fn nonce(&self, address: Option<String>) -> Reader<NonceQuery> {
		self.spawn(NonceQuery, self.refresh.nonce, address)
	}

	pub fn block_number(&self) -> Reader<BlockNumberQuery> {
		self.spawn(BlockNumberQuery, self.refresh.block_number, Some(()))
	}

	pub fn staking(&self) -> Reader<StakingQuery> {
		self.spawn(StakingQuery, self.refresh.staking, Some(()))
	}

	/// Recent events, newest first.
	pub fn events(&self) -> Reader<EventsQuery> {
		let query = EventsQuery::new(self.max_events, self.clock.clone());
		self.spawn(query, self.refresh.events, Some(()))
	}

	pub fn chain_info(&self) -> Reader<ChainInfoQuery> {
		self.spawn(ChainInfoQuery, self.refresh.chain_info, Some(()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		ConnectionManager,
		testing::{MockChainApi, MockConnector, test_network},
	};
	use dotlink_common::{Config, MemoryStore};

	const STALE: Duration = Duration::from_secs(5);

	/// A tick bound to a connection to `a`, after the manager has moved on to `b`.
	async fn released_tick() -> (Tick<BlockNumberQuery>, watch::Receiver<ReadState<u64>>) {
		let connector = MockConnector::new();
		let (a, b) = (test_network("a", 1), test_network("b", 1));
		connector.accept(&a.endpoints[0], MockChainApi::new());
		connector.accept(&b.endpoints[0], MockChainApi::new());
		let manager =
			ConnectionManager::new(connector, Arc::new(MemoryStore::new()), &Config::default());
		let live = manager.connect(&a).await.unwrap();
		let connection = manager.subscribe();
		let (_, key) = watch::channel(Some(()));
		let (state, states) = watch::channel(ReadState::default());
		let tick = Tick {
			query: Arc::new(BlockNumberQuery),
			stale_time: STALE,
			cache: Arc::new(SnapshotCache::new()),
			cache_key: CacheKey::new(BlockNumberQuery::KIND, live.network_id(), &()),
			state,
			live,
			watched: (),
			connection,
			key,
		};
		manager.switch_network(&b).await.unwrap();
		(tick, states)
	}

	#[tokio::test]
	async fn fetched_data_of_a_released_scope_is_dropped() {
		let (tick, states) = released_tick().await;
		tick.publish(Ok(42), true);
		assert!(!states.has_changed().unwrap());
		assert_eq!(*states.borrow(), ReadState::default());
		assert!(tick.cache.is_empty());
	}

	#[tokio::test]
	async fn cached_data_of_a_released_scope_is_dropped() {
		let (tick, states) = released_tick().await;
		tick.cache.put(tick.cache_key.clone(), 42u64, STALE);
		tick.run().await;
		assert_eq!(states.borrow().data, None);
	}

	#[tokio::test]
	async fn failures_of_a_released_scope_are_dropped() {
		let (tick, states) = released_tick().await;
		tick.publish(Err(ReadError::Stale), true);
		assert_eq!(states.borrow().error, None);
	}
}
