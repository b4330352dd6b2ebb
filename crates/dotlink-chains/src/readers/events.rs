// SPDX-License-Identifier: GPL-3.0

use super::Query;
use crate::{api::ChainApi, error::ReadError};
use async_trait::async_trait;
use dotlink_common::Clock;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// An event observed in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
	pub section: String,
	pub method: String,
	/// Hex-encoded SCALE fields.
	pub data: String,
	pub block_number: u64,
	/// When the event was observed, in milliseconds since the Unix epoch.
	pub timestamp: u64,
}

/// Reads the events of the latest block into a bounded log, newest first.
///
/// A block is added once, however many times it is observed.
pub struct EventsQuery {
	max_events: usize,
	clock: Arc<dyn Clock>,
}

impl EventsQuery {
	/// # Arguments
	/// * `max_events` - Maximum number of events retained.
	/// * `clock` - Timestamps observed events.
	pub fn new(max_events: usize, clock: Arc<dyn Clock>) -> Self {
		Self { max_events, clock }
	}
}

impl fmt::Debug for EventsQuery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventsQuery").field("max_events", &self.max_events).finish()
	}
}

#[async_trait]
impl Query for EventsQuery {
	const KIND: &'static str = "events";
	type Key = ();
	type Output = Vec<ChainEvent>;

	async fn fetch(&self, api: &dyn ChainApi, _: &()) -> Result<Vec<ChainEvent>, ReadError> {
		let block = api.latest_events().await?;
		let timestamp = self.clock.now_millis();
		Ok(block
			.events
			.into_iter()
			.map(|event| ChainEvent {
				section: event.section,
				method: event.method,
				data: event.data,
				block_number: block.block_number,
				timestamp,
			})
			.collect())
	}

	fn merge(
		&self,
		previous: Option<&Vec<ChainEvent>>,
		fetched: Vec<ChainEvent>,
	) -> Vec<ChainEvent> {
		let previous = previous.map(Vec::as_slice).unwrap_or_default();
		let newest_seen = previous.first().map(|event| event.block_number);
		let is_new = match (fetched.first(), newest_seen) {
			(Some(event), Some(seen)) => event.block_number > seen,
			(Some(_), None) => true,
			(None, _) => false,
		};
		if !is_new {
			return previous.to_vec();
		}
		fetched.into_iter().chain(previous.iter().cloned()).take(self.max_events).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dotlink_common::ManualClock;

	fn events(block_number: u64, count: usize) -> Vec<ChainEvent> {
		(0..count)
			.map(|i| ChainEvent {
				section: "System".into(),
				method: format!("Event{i}"),
				data: "0x".into(),
				block_number,
				timestamp: 0,
			})
			.collect()
	}

	#[test]
	fn merge_prepends_new_blocks_and_caps() {
		let query = EventsQuery::new(5, Arc::new(ManualClock::new(0)));
		let log = query.merge(None, events(1, 3));
		assert_eq!(log.len(), 3);
		let log = query.merge(Some(&log), events(2, 3));
		assert_eq!(log.len(), 5);
		assert!(log[..3].iter().all(|e| e.block_number == 2));
		assert!(log[3..].iter().all(|e| e.block_number == 1));
	}

	#[test]
	fn merge_ignores_already_seen_blocks() {
		let query = EventsQuery::new(50, Arc::new(ManualClock::new(0)));
		let log = query.merge(None, events(7, 2));
		assert_eq!(query.merge(Some(&log), events(7, 2)), log);
		assert_eq!(query.merge(Some(&log), events(6, 4)), log);
		assert_eq!(query.merge(Some(&log), Vec::new()), log);
	}
}
