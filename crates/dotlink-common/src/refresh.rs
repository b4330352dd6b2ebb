// SPDX-License-Identifier: GPL-3.0

//! A single scheduled-refresh utility shared by every chain-state reader.
//!
//! Each reader is parameterized by a [`RefreshPolicy`]: how often it refetches and for how long
//! a fetched value is considered fresh. [`ScheduledRefresh`] drives the periodic ticks until
//! its cancellation token fires.

use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// The smallest interval accepted by [`ScheduledRefresh`].
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Refetch interval and staleness window of a reader.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct RefreshPolicy {
	/// Time between two refetches.
	#[serde(rename = "interval_ms", with = "millis")]
	pub interval: Duration,
	/// How long a fetched value may be served from cache without refetching.
	#[serde(rename = "stale_ms", with = "millis")]
	pub stale_time: Duration,
}

impl RefreshPolicy {
	pub const fn from_millis(interval: u64, stale_time: u64) -> Self {
		Self {
			interval: Duration::from_millis(interval),
			stale_time: Duration::from_millis(stale_time),
		}
	}
}

/// Periodically invokes a tick until cancelled.
#[derive(Clone, Copy, Debug)]
pub struct ScheduledRefresh {
	policy: RefreshPolicy,
}

impl ScheduledRefresh {
	pub fn new(policy: RefreshPolicy) -> Self {
		Self { policy }
	}

	pub fn policy(&self) -> RefreshPolicy {
		self.policy
	}

	/// Runs `tick` immediately and then once per interval, until `token` is cancelled.
	///
	/// A tick that is still running when the token fires is dropped at its next suspension
	/// point. Ticks never overlap: a slow tick delays the next one rather than stacking up.
	///
	/// # Arguments
	/// * `token` - Cancellation token ending the schedule.
	/// * `tick` - Produces the future run on each tick.
	pub async fn run<F, Fut>(&self, token: &CancellationToken, mut tick: F)
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = ()>,
	{
		let mut interval = tokio::time::interval(self.policy.interval.max(MIN_INTERVAL));
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
		loop {
			tokio::select! {
				biased;
				_ = token.cancelled() => break,
				_ = interval.tick() => {},
			}
			tokio::select! {
				biased;
				_ = token.cancelled() => break,
				_ = tick() => {},
			}
		}
	}
}

mod millis {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub(super) fn serialize<S: Serializer>(
		value: &Duration,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_millis() as u64)
	}

	pub(super) fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Duration, D::Error> {
		Ok(Duration::from_millis(u64::deserialize(deserializer)?))
	}
}
