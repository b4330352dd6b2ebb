// SPDX-License-Identifier: GPL-3.0

//! Snapshot cache shared by the readers.

use moka::{Expiry, sync::Cache};
use std::{any::Any, fmt::Debug, sync::Arc, time::Duration};
use tokio::time::Instant;

/// Upper bound on the number of (kind, network, key) snapshots kept.
const MAX_ENTRIES: u64 = 1_024;

/// Identifies a cached snapshot. The network and the watched key are always part of it, so two
/// readers of the same kind never share an entry across addresses or networks.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CacheKey {
	pub kind: &'static str,
	pub network: String,
	pub key: String,
}

impl CacheKey {
	pub fn new(kind: &'static str, network: &str, key: &impl Debug) -> Self {
		Self { kind, network: network.to_string(), key: format!("{key:?}") }
	}
}

#[derive(Clone)]
struct Entry {
	value: Arc<dyn Any + Send + Sync>,
	fetched_at: Instant,
	stale_time: Duration,
}

/// Evicts an entry once its reader would consider it stale.
struct StaleAfter;

impl Expiry<CacheKey, Entry> for StaleAfter {
	fn expire_after_create(
		&self,
		_key: &CacheKey,
		entry: &Entry,
		_created_at: std::time::Instant,
	) -> Option<Duration> {
		Some(entry.stale_time)
	}

	fn expire_after_update(
		&self,
		_key: &CacheKey,
		entry: &Entry,
		_updated_at: std::time::Instant,
		_duration_until_expiry: Option<Duration>,
	) -> Option<Duration> {
		Some(entry.stale_time)
	}
}

/// Latest fetched snapshot of every (kind, network, key), bounded in size and evicted once stale.
pub struct SnapshotCache {
	entries: Cache<CacheKey, Entry>,
}

impl Default for SnapshotCache {
	fn default() -> Self {
		Self::with_capacity(MAX_ENTRIES)
	}
}

impl SnapshotCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// A cache holding at most `capacity` snapshots.
	pub fn with_capacity(capacity: u64) -> Self {
		let entries = Cache::builder().max_capacity(capacity).expire_after(StaleAfter).build();
		Self { entries }
	}

	/// Returns the snapshot stored under `key` if it was fetched less than `stale_time` ago.
	pub fn fresh<T: Clone + 'static>(&self, key: &CacheKey, stale_time: Duration) -> Option<T> {
		let entry = self.entries.get(key)?;
		if entry.fetched_at.elapsed() >= stale_time {
			return None;
		}
		entry.value.downcast_ref::<T>().cloned()
	}

	/// Stores a freshly fetched snapshot, kept until it is `stale_time` old.
	pub fn put<T: Send + Sync + 'static>(&self, key: CacheKey, value: T, stale_time: Duration) {
		let entry = Entry { value: Arc::new(value), fetched_at: Instant::now(), stale_time };
		self.entries.insert(key, entry);
	}

	/// Number of snapshots held, after pending evictions are applied.
	pub fn len(&self) -> u64 {
		self.entries.run_pending_tasks();
		self.entries.entry_count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
