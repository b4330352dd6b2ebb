// SPDX-License-Identifier: GPL-3.0

use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::{SystemTime, UNIX_EPOCH},
};

/// A source of wall-clock time, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
	fn now_millis(&self) -> u64;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_millis(&self) -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis() as u64)
			.unwrap_or_default()
	}
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
	now: Arc<AtomicU64>,
}

impl ManualClock {
	pub fn new(now_millis: u64) -> Self {
		Self { now: Arc::new(AtomicU64::new(now_millis)) }
	}

	pub fn set(&self, now_millis: u64) {
		self.now.store(now_millis, Ordering::SeqCst);
	}

	pub fn advance(&self, millis: u64) {
		self.now.fetch_add(millis, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_millis(&self) -> u64 {
		self.now.load(Ordering::SeqCst)
	}
}
