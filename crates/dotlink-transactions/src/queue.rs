// SPDX-License-Identifier: GPL-3.0

//! The transaction queue.
//!
//! Entries are kept most recent first and persisted under
//! [`keys::TRANSACTION_HISTORY`](dotlink_common::keys::TRANSACTION_HISTORY) on every mutation
//! leaving the queue non-empty. An empty queue is never written, so the last non-empty
//! snapshot is what a later session restores.
//!
//! A finalized entry expires `auto_remove_delay_ms` after it was *created*. An entry that
//! finalizes after that point is removed on the next scheduler tick.

use crate::{Error, TxStatus};
use dotlink_common::{Clock, KeyValueStore, QueueConfig, keys, load_json, save_json};
use serde::{Deserialize, Serialize};
use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex, MutexGuard, PoisonError, Weak,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};

/// A transaction tracked by the queue.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedTransaction {
	pub id: String,
	/// Extrinsic hash, once broadcast.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hash: Option<String>,
	/// Hash of the including block.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub block_hash: Option<String>,
	pub status: TxStatus,
	/// Kind of operation, e.g. `transfer`.
	#[serde(rename = "type")]
	pub kind: String,
	pub description: String,
	/// Creation time, in milliseconds since the Unix epoch.
	pub timestamp: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub explorer_url: Option<String>,
}

/// A transaction about to be added to the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransaction {
	pub kind: String,
	pub description: String,
	pub hash: Option<String>,
	pub explorer_url: Option<String>,
}

impl NewTransaction {
	pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
		Self { kind: kind.into(), description: description.into(), hash: None, explorer_url: None }
	}
}

/// Fields merged into an existing entry. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionUpdate {
	pub status: Option<TxStatus>,
	pub hash: Option<String>,
	pub block_hash: Option<String>,
	pub explorer_url: Option<String>,
	pub error: Option<String>,
	pub description: Option<String>,
}

impl TransactionUpdate {
	pub fn status(status: TxStatus) -> Self {
		Self { status: Some(status), ..Default::default() }
	}

	pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = Some(hash.into());
		self
	}

	pub fn with_block_hash(mut self, block_hash: impl Into<String>) -> Self {
		self.block_hash = Some(block_hash.into());
		self
	}

	pub fn with_explorer_url(mut self, url: impl Into<String>) -> Self {
		self.explorer_url = Some(url.into());
		self
	}

	pub fn with_error(mut self, error: impl Into<String>) -> Self {
		self.error = Some(error.into());
		self
	}

	/// Merges the update into `entry`. A status that isn't a forward move is ignored.
	fn apply(self, entry: &mut QueuedTransaction) {
		if let Some(status) = self.status {
			if entry.status.can_transition_to(status) {
				entry.status = status;
			} else {
				log::warn!("Ignoring transition of {} from {} to {status}", entry.id, entry.status);
			}
		}
		let fields = [
			(&mut entry.hash, self.hash),
			(&mut entry.block_hash, self.block_hash),
			(&mut entry.explorer_url, self.explorer_url),
			(&mut entry.error, self.error),
		];
		for (field, value) in fields {
			if value.is_some() {
				*field = value;
			}
		}
		if let Some(description) = self.description {
			entry.description = description;
		}
	}
}

struct Inner {
	entries: watch::Sender<Vec<QueuedTransaction>>,
	store: Arc<dyn KeyValueStore>,
	clock: Arc<dyn Clock>,
	config: QueueConfig,
	timers: Mutex<HashMap<String, JoinHandle<()>>>,
	seq: AtomicU64,
}

/// The transaction queue. Clones share the same queue.
#[derive(Clone)]
pub struct TransactionQueue {
	inner: Arc<Inner>,
}

impl TransactionQueue {
	/// Restores the queue persisted in `store`.
	///
	/// An unreadable snapshot is treated as an empty queue. Finalized entries are scheduled for
	/// expiry, which requires a Tokio runtime.
	///
	/// # Arguments
	/// * `store` - Durable storage.
	/// * `clock` - Source of creation timestamps.
	/// * `config` - Queue options.
	pub fn load(
		store: Arc<dyn KeyValueStore>,
		clock: Arc<dyn Clock>,
		config: &QueueConfig,
	) -> Self {
		let entries: Vec<QueuedTransaction> =
			match load_json(store.as_ref(), keys::TRANSACTION_HISTORY) {
				Ok(entries) => entries.unwrap_or_default(),
				Err(e) => {
					log::warn!("Ignoring unreadable transaction history: {e}");
					Vec::new()
				},
			};
		let finalized: Vec<_> = entries
			.iter()
			.filter(|entry| entry.status == TxStatus::Finalized)
			.map(|entry| (entry.id.clone(), entry.timestamp))
			.collect();
		let (sender, _) = watch::channel(entries);
		let queue = Self {
			inner: Arc::new(Inner {
				entries: sender,
				store,
				clock,
				config: config.clone(),
				timers: Mutex::new(HashMap::new()),
				seq: AtomicU64::new(0),
			}),
		};
		for (id, created) in finalized {
			queue.schedule_expiry(id, created);
		}
		queue
	}

	/// Adds a pending transaction at the front of the queue, returning its identifier.
	pub fn add(&self, transaction: NewTransaction) -> String {
		let timestamp = self.inner.clock.now_millis();
		let mut id = String::new();
		self.mutate(|entries| {
			id = loop {
				let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
				let candidate = format!("{timestamp:x}-{seq:x}");
				if !entries.iter().any(|entry| entry.id == candidate) {
					break candidate;
				}
			};
			entries.insert(
				0,
				QueuedTransaction {
					id: id.clone(),
					hash: transaction.hash,
					block_hash: None,
					status: TxStatus::Pending,
					kind: transaction.kind,
					description: transaction.description,
					timestamp,
					error: None,
					explorer_url: transaction.explorer_url,
				},
			);
			true
		});
		log::debug!("Queued transaction {id}");
		id
	}

	/// Merges `update` into the entry with identifier `id`.
	///
	/// Returns whether an entry was found. Status moves that aren't forward are ignored.
	pub fn update(&self, id: &str, update: TransactionUpdate) -> bool {
		let mut finalized = None;
		let mut found = false;
		self.mutate(|entries| {
			let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) else {
				return false;
			};
			found = true;
			let before = entry.clone();
			update.apply(entry);
			if before.status != TxStatus::Finalized && entry.status == TxStatus::Finalized {
				finalized = Some(entry.timestamp);
			}
			*entry != before
		});
		if let Some(created) = finalized {
			self.schedule_expiry(id.to_string(), created);
		}
		found
	}

	/// Removes the entry with identifier `id`, returning whether it existed.
	pub fn remove(&self, id: &str) -> bool {
		self.cancel_expiry(id);
		self.mutate(|entries| {
			let len = entries.len();
			entries.retain(|entry| entry.id != id);
			entries.len() != len
		})
	}

	/// Removes a settled entry on behalf of the user. In-flight entries are kept.
	pub fn dismiss(&self, id: &str) -> Result<bool, Error> {
		match self.get(id) {
			Some(entry) if entry.status.is_active() => Err(Error::InProgress(id.to_string())),
			Some(_) => Ok(self.remove(id)),
			None => Ok(false),
		}
	}

	/// Removes every finalized and failed entry, returning how many were removed.
	pub fn clear_completed(&self) -> usize {
		let mut removed = Vec::new();
		self.mutate(|entries| {
			entries.retain(|entry| {
				let keep = entry.status.is_active();
				if !keep {
					removed.push(entry.id.clone());
				}
				keep
			});
			!removed.is_empty()
		});
		for id in &removed {
			self.cancel_expiry(id);
		}
		removed.len()
	}

	/// Every entry, most recent first.
	pub fn entries(&self) -> Vec<QueuedTransaction> {
		self.inner.entries.borrow().clone()
	}

	/// The entries to display: the first `max_visible` unless `expanded`.
	pub fn visible(&self, expanded: bool) -> Vec<QueuedTransaction> {
		let entries = self.inner.entries.borrow();
		let shown = if expanded { entries.len() } else { self.inner.config.max_visible };
		entries.iter().take(shown).cloned().collect()
	}

	pub fn get(&self, id: &str) -> Option<QueuedTransaction> {
		self.inner.entries.borrow().iter().find(|entry| entry.id == id).cloned()
	}

	/// Number of in-flight entries.
	pub fn pending_count(&self) -> usize {
		self.inner.entries.borrow().iter().filter(|entry| entry.status.is_active()).count()
	}

	pub fn len(&self) -> usize {
		self.inner.entries.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.entries.borrow().is_empty()
	}

	pub fn subscribe(&self) -> watch::Receiver<Vec<QueuedTransaction>> {
		self.inner.entries.subscribe()
	}

	/// Applies `change` to the entries, persisting and notifying when it reports a modification.
	fn mutate(&self, change: impl FnOnce(&mut Vec<QueuedTransaction>) -> bool) -> bool {
		self.inner.entries.send_if_modified(|entries| {
			let modified = change(entries);
			if modified && !entries.is_empty() {
				if let Err(e) = persist(self.inner.store.as_ref(), entries) {
					log::warn!("Failed to persist the transaction queue: {e}");
				}
			}
			modified
		})
	}

	fn timers(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
		self.inner.timers.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Schedules removal of `id` once `auto_remove_delay_ms` have elapsed since `created`.
	fn schedule_expiry(&self, id: String, created: u64) {
		let elapsed = self.inner.clock.now_millis().saturating_sub(created);
		let remaining =
			Duration::from_millis(self.inner.config.auto_remove_delay_ms.saturating_sub(elapsed));
		let Ok(runtime) = Handle::try_current() else {
			log::warn!("No runtime to expire transaction {id}");
			return;
		};
		log::debug!("Transaction {id} expires in {remaining:?}");
		let queue = Arc::downgrade(&self.inner);
		// Held until the task is registered, so an immediate expiry can't race the insert.
		let mut timers = self.timers();
		let task = runtime.spawn({
			let id = id.clone();
			async move {
				tokio::time::sleep(remaining).await;
				expire(queue, &id);
			}
		});
		if let Some(previous) = timers.insert(id, task) {
			previous.abort();
		}
	}

	fn cancel_expiry(&self, id: &str) {
		if let Some(task) = self.timers().remove(id) {
			task.abort();
		}
	}
}

fn expire(queue: Weak<Inner>, id: &str) {
	let Some(inner) = queue.upgrade() else {
		return;
	};
	let queue = TransactionQueue { inner };
	queue.timers().remove(id);
	if queue.remove(id) {
		log::debug!("Expired transaction {id}");
	}
}

fn persist(store: &dyn KeyValueStore, entries: &[QueuedTransaction]) -> Result<(), Error> {
	save_json(store, keys::TRANSACTION_HISTORY, entries)?;
	Ok(())
}

impl Drop for Inner {
	fn drop(&mut self) {
		for (_, task) in self.timers.get_mut().unwrap_or_else(PoisonError::into_inner).drain() {
			task.abort();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dotlink_common::{ManualClock, MemoryStore};

	fn queue(clock: &ManualClock) -> (Arc<MemoryStore>, TransactionQueue) {
		let store = Arc::new(MemoryStore::new());
		let queue = TransactionQueue::load(
			store.clone(),
			Arc::new(clock.clone()),
			&QueueConfig { max_visible: 2, auto_remove_delay_ms: 5_000 },
		);
		(store, queue)
	}

	#[test]
	fn add_prepends_pending_entries_with_unique_ids() {
		let clock = ManualClock::new(1_000);
		let (_, queue) = queue(&clock);
		let first = queue.add(NewTransaction::new("transfer", "Transfer 1 DOT"));
		let second = queue.add(NewTransaction::new("transfer", "Transfer 2 DOT"));
		assert_ne!(first, second);

		let entries = queue.entries();
		assert_eq!(entries[0].id, second);
		assert_eq!(entries[1].id, first);
		assert!(entries.iter().all(|e| e.status == TxStatus::Pending && e.timestamp == 1_000));
		assert_eq!(queue.pending_count(), 2);
	}

	#[test]
	fn update_merges_fields_and_ignores_regressions() {
		let clock = ManualClock::new(1_000);
		let (_, queue) = queue(&clock);
		let id = queue.add(NewTransaction::new("remark", "Say hello"));

		let in_block = TransactionUpdate::status(TxStatus::InBlock).with_block_hash("0x01");
		assert!(queue.update(&id, in_block));
		let regression = TransactionUpdate::status(TxStatus::Broadcasting).with_hash("0xaa");
		assert!(queue.update(&id, regression));
		let entry = queue.get(&id).unwrap();
		assert_eq!(entry.status, TxStatus::InBlock);
		assert_eq!(entry.hash.as_deref(), Some("0xaa"));
		assert_eq!(entry.block_hash.as_deref(), Some("0x01"));

		assert!(!queue.update("missing", TransactionUpdate::status(TxStatus::Error)));
	}

	#[test]
	fn error_is_terminal() {
		let clock = ManualClock::new(1_000);
		let (_, queue) = queue(&clock);
		let id = queue.add(NewTransaction::new("remark", "Say hello"));
		queue.update(&id, TransactionUpdate::status(TxStatus::Error).with_error("Bad origin"));
		queue.update(&id, TransactionUpdate::status(TxStatus::Finalized));
		let entry = queue.get(&id).unwrap();
		assert_eq!(entry.status, TxStatus::Error);
		assert_eq!(entry.error.as_deref(), Some("Bad origin"));
	}

	#[test]
	fn visible_caps_unless_expanded() {
		let clock = ManualClock::new(1_000);
		let (_, queue) = queue(&clock);
		for i in 0..3 {
			queue.add(NewTransaction::new("remark", format!("#{i}")));
		}
		let visible: Vec<_> = queue.visible(false).into_iter().map(|e| e.description).collect();
		assert_eq!(visible, ["#2", "#1"]);
		assert_eq!(queue.visible(true).len(), 3);
	}

	#[test]
	fn clear_completed_keeps_in_flight_entries() {
		let clock = ManualClock::new(1_000);
		let (_, queue) = queue(&clock);
		let pending = queue.add(NewTransaction::new("remark", "pending"));
		let failed = queue.add(NewTransaction::new("remark", "failed"));
		let in_block = queue.add(NewTransaction::new("remark", "in block"));
		queue.update(&failed, TransactionUpdate::status(TxStatus::Error));
		queue.update(&in_block, TransactionUpdate::status(TxStatus::InBlock));

		assert_eq!(queue.clear_completed(), 1);
		let ids: Vec<_> = queue.entries().into_iter().map(|e| e.id).collect();
		assert_eq!(ids, [in_block, pending]);
		assert_eq!(queue.clear_completed(), 0);
	}

	#[test]
	fn dismiss_refuses_in_flight_entries() -> Result<(), Error> {
		let clock = ManualClock::new(1_000);
		let (_, queue) = queue(&clock);
		let id = queue.add(NewTransaction::new("remark", "Say hello"));
		assert!(matches!(queue.dismiss(&id), Err(Error::InProgress(_))));
		queue.update(&id, TransactionUpdate::status(TxStatus::Error));
		assert!(queue.dismiss(&id)?);
		assert!(!queue.dismiss(&id)?);
		Ok(())
	}

	#[test]
	fn empty_queue_is_never_persisted() -> Result<(), Error> {
		let clock = ManualClock::new(1_000);
		let (store, queue) = queue(&clock);
		let id = queue.add(NewTransaction::new("remark", "Say hello"));
		assert!(queue.remove(&id));
		assert!(queue.is_empty());

		// The last non-empty snapshot survives.
		let stored: Vec<QueuedTransaction> =
			load_json(store.as_ref(), keys::TRANSACTION_HISTORY)?.unwrap_or_default();
		assert_eq!(stored.len(), 1);
		assert_eq!(stored[0].id, id);
		Ok(())
	}

	#[test]
	fn serializes_with_camel_case_fields() -> Result<(), Error> {
		let entry = QueuedTransaction {
			id: "abc".into(),
			hash: Some("0x01".into()),
			block_hash: Some("0x02".into()),
			status: TxStatus::InBlock,
			kind: "transfer".into(),
			description: "Transfer".into(),
			timestamp: 42,
			error: None,
			explorer_url: None,
		};
		let json = serde_json::to_value(&entry).map_err(dotlink_common::Error::from)?;
		assert_eq!(json["blockHash"], "0x02");
		assert_eq!(json["type"], "transfer");
		assert_eq!(json["status"], "inBlock");
		assert!(json.get("error").is_none());
		Ok(())
	}
}
