// SPDX-License-Identifier: GPL-3.0

//! Durable, string-keyed local storage.
//!
//! Each component owns its own key and stores a JSON-serialized value under it. The
//! [`FileStore`] keeps one file per key inside a data directory, while the [`MemoryStore`]
//! keeps everything in process memory and is used by tests and ephemeral sessions.

use crate::Error;
use serde::{Serialize, de::DeserializeOwned};
use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
	sync::Mutex,
};

/// Storage keys owned by the dotlink components.
pub mod keys {
	/// The identifier of the network selected by the user.
	pub const SELECTED_NETWORK: &str = "selected_network";
	/// Address to nickname mapping.
	pub const ACCOUNT_NICKNAMES: &str = "account_nicknames";
	/// The persisted transaction queue.
	pub const TRANSACTION_HISTORY: &str = "transaction_history";
}

/// A string-keyed store of serialized values.
pub trait KeyValueStore: Send + Sync {
	/// Returns the raw value stored under `key`, if any.
	fn get(&self, key: &str) -> Result<Option<String>, Error>;
	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), Error>;
	/// Removes the value stored under `key`. Removing a missing key is not an error.
	fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Reads and deserializes the JSON value stored under `key`.
///
/// # Arguments
/// * `store` - The store to read from.
/// * `key` - The storage key.
pub fn load_json<T: DeserializeOwned>(
	store: &dyn KeyValueStore,
	key: &str,
) -> Result<Option<T>, Error> {
	match store.get(key)? {
		Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
		None => Ok(None),
	}
}

/// Serializes `value` as JSON and stores it under `key`.
///
/// # Arguments
/// * `store` - The store to write to.
/// * `key` - The storage key.
/// * `value` - The value to persist.
pub fn save_json<T: Serialize + ?Sized>(
	store: &dyn KeyValueStore,
	key: &str,
	value: &T,
) -> Result<(), Error> {
	let raw = serde_json::to_string(value)?;
	store.set(key, &raw)
}

/// A store keeping one `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
	dir: PathBuf,
}

impl FileStore {
	/// Opens a store rooted at `dir`, creating the directory if it doesn't exist.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
		let dir = dir.into();
		fs::create_dir_all(&dir)?;
		Ok(Self { dir })
	}

	/// The directory backing this store.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path(&self, key: &str) -> PathBuf {
		self.dir.join(format!("{key}.json"))
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, Error> {
		match fs::read_to_string(self.path(key)) {
			Ok(raw) => Ok(Some(raw)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	fn set(&self, key: &str, value: &str) -> Result<(), Error> {
		// Write to a sibling file first so a crash never leaves a truncated value behind.
		let tmp = self.dir.join(format!(".{key}.json.tmp"));
		fs::write(&tmp, value)?;
		fs::rename(&tmp, self.path(key))?;
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), Error> {
		match fs::remove_file(self.path(key)) {
			Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
			_ => Ok(()),
		}
	}
}

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
	values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, Error> {
		let values = self.values.lock().map_err(|_| Error::LockAcquisitionError)?;
		Ok(values.get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), Error> {
		let mut values = self.values.lock().map_err(|_| Error::LockAcquisitionError)?;
		values.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), Error> {
		let mut values = self.values.lock().map_err(|_| Error::LockAcquisitionError)?;
		values.remove(key);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;

	#[test]
	fn file_store_round_trips_values() -> Result<(), Error> {
		let temp_dir = tempfile::tempdir()?;
		let store = FileStore::open(temp_dir.path().join("data"))?;

		assert_eq!(store.get(keys::SELECTED_NETWORK)?, None);
		store.set(keys::SELECTED_NETWORK, "\"kusama\"")?;
		assert_eq!(store.get(keys::SELECTED_NETWORK)?.as_deref(), Some("\"kusama\""));
		assert!(temp_dir.path().join("data/selected_network.json").exists());

		store.remove(keys::SELECTED_NETWORK)?;
		assert_eq!(store.get(keys::SELECTED_NETWORK)?, None);
		// Removing twice is fine.
		store.remove(keys::SELECTED_NETWORK)?;
		Ok(())
	}

	#[test]
	fn file_store_survives_reopen() -> Result<(), Error> {
		let temp_dir = tempfile::tempdir()?;
		FileStore::open(temp_dir.path())?.set(keys::ACCOUNT_NICKNAMES, "{}")?;
		let reopened = FileStore::open(temp_dir.path())?;
		assert_eq!(reopened.get(keys::ACCOUNT_NICKNAMES)?.as_deref(), Some("{}"));
		Ok(())
	}

	#[test]
	fn json_helpers_work() -> Result<(), Error> {
		let store = MemoryStore::new();
		let mut nicknames = BTreeMap::new();
		nicknames.insert("5Grw".to_string(), "alice".to_string());

		save_json(&store, keys::ACCOUNT_NICKNAMES, &nicknames)?;
		let loaded: Option<BTreeMap<String, String>> =
			load_json(&store, keys::ACCOUNT_NICKNAMES)?;
		assert_eq!(loaded, Some(nicknames));
		assert_eq!(load_json::<BTreeMap<String, String>>(&store, "missing")?, None);
		Ok(())
	}

	#[test]
	fn load_json_reports_unreadable_values() -> Result<(), Error> {
		let store = MemoryStore::new();
		store.set(keys::TRANSACTION_HISTORY, "not json")?;
		assert!(matches!(
			load_json::<Vec<String>>(&store, keys::TRANSACTION_HISTORY),
			Err(Error::Serialization(_))
		));
		Ok(())
	}
}
