// SPDX-License-Identifier: GPL-3.0

use crate::{Error, RefreshPolicy};
use serde::{Deserialize, Serialize};
use std::{
	fs,
	path::{Path, PathBuf},
};

/// Environment variable overriding the network used when nothing was persisted.
pub const DEFAULT_CHAIN_ENV: &str = "DOTLINK_DEFAULT_CHAIN";
/// Environment variable overriding the storage directory.
pub const DATA_DIR_ENV: &str = "DOTLINK_DATA_DIR";

const DEFAULT_CHAIN: &str = "polkadot";
const DEFAULT_APP_NAME: &str = "dotlink";
const DATA_DIR_NAME: &str = "dotlink";

/// Application configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
	/// Identifier of the network to connect to when no selection was persisted.
	pub default_chain: String,
	/// Directory for durable storage. Defaults to the platform data directory.
	pub data_dir: Option<PathBuf>,
	/// Name presented to wallet extensions when requesting account access.
	pub app_name: String,
	/// Maximum number of chain events retained by the event log.
	pub max_events: usize,
	pub queue: QueueConfig,
	pub refresh: RefreshConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			default_chain: DEFAULT_CHAIN.to_string(),
			data_dir: None,
			app_name: DEFAULT_APP_NAME.to_string(),
			max_events: 50,
			queue: QueueConfig::default(),
			refresh: RefreshConfig::default(),
		}
	}
}

impl Config {
	/// Loads the configuration from a TOML file, then applies environment overrides.
	///
	/// # Arguments
	/// * `path` - Location of the configuration file.
	pub fn load(path: &Path) -> Result<Self, Error> {
		let contents = fs::read_to_string(path)?;
		let mut config: Config = toml::from_str(&contents)?;
		config.apply_env();
		Ok(config)
	}

	/// The default configuration with environment overrides applied.
	pub fn from_env() -> Self {
		let mut config = Config::default();
		config.apply_env();
		config
	}

	fn apply_env(&mut self) {
		if let Ok(chain) = std::env::var(DEFAULT_CHAIN_ENV) {
			if !chain.trim().is_empty() {
				self.default_chain = chain.trim().to_string();
			}
		}
		if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
			if !dir.trim().is_empty() {
				self.data_dir = Some(PathBuf::from(dir.trim()));
			}
		}
	}

	/// Resolves the storage directory.
	pub fn data_dir(&self) -> Result<PathBuf, Error> {
		match &self.data_dir {
			Some(dir) => Ok(dir.clone()),
			None => dirs::data_dir()
				.map(|dir| dir.join(DATA_DIR_NAME))
				.ok_or_else(|| Error::Config("unable to determine a data directory".into())),
		}
	}
}

/// Transaction queue options.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct QueueConfig {
	/// Number of entries shown unless the queue is expanded.
	pub max_visible: usize,
	/// Delay, measured from an entry's creation, after which a finalized entry is removed.
	pub auto_remove_delay_ms: u64,
}

impl Default for QueueConfig {
	fn default() -> Self {
		Self { max_visible: 5, auto_remove_delay_ms: 5_000 }
	}
}

/// Refresh policies of the chain-state readers.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
	pub block_number: RefreshPolicy,
	pub nonce: RefreshPolicy,
	pub balance: RefreshPolicy,
	pub staking: RefreshPolicy,
	pub events: RefreshPolicy,
	pub chain_info: RefreshPolicy,
}

impl Default for RefreshConfig {
	fn default() -> Self {
		Self {
			block_number: RefreshPolicy::from_millis(6_000, 5_000),
			nonce: RefreshPolicy::from_millis(10_000, 8_000),
			balance: RefreshPolicy::from_millis(12_000, 10_000),
			staking: RefreshPolicy::from_millis(30_000, 20_000),
			events: RefreshPolicy::from_millis(6_000, 5_000),
			chain_info: RefreshPolicy::from_millis(300_000, 300_000),
		}
	}
}
