// SPDX-License-Identifier: GPL-3.0

//! Shared building blocks used by the dotlink crates: durable key/value storage, configuration,
//! a scheduled-refresh utility, a clock abstraction and display formatting helpers.

pub mod clock;
pub mod config;
pub mod errors;
pub mod format;
pub mod refresh;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, QueueConfig, RefreshConfig};
pub use errors::Error;
pub use refresh::{RefreshPolicy, ScheduledRefresh};
pub use storage::{FileStore, KeyValueStore, MemoryStore, keys, load_json, save_json};
