// SPDX-License-Identifier: GPL-3.0

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("Lock acquisition error")]
	LockAcquisitionError,
	#[error("Failed to (de)serialize stored value: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("TomlError: {0}")]
	TomlError(#[from] toml::de::Error),
}
