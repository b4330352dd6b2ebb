// SPDX-License-Identifier: GPL-3.0

use crate::{Error, account::ActiveAccount};
use dotlink_common::{KeyValueStore, keys, load_json, save_json};
use std::{
	collections::BTreeMap,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// User-assigned account nicknames, persisted as an address to nickname map.
pub struct Nicknames {
	store: Arc<dyn KeyValueStore>,
	names: Mutex<BTreeMap<String, String>>,
}

impl Nicknames {
	/// Loads the nicknames persisted in `store`. An unreadable value is treated as empty.
	pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
		let names = match load_json(store.as_ref(), keys::ACCOUNT_NICKNAMES) {
			Ok(names) => names.unwrap_or_default(),
			Err(e) => {
				log::warn!("Ignoring unreadable account nicknames: {e}");
				BTreeMap::new()
			},
		};
		Self { store, names: Mutex::new(names) }
	}

	fn names(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
		self.names.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Sets the nickname of `address`. A blank nickname removes it.
	pub fn set(&self, address: &str, nickname: &str) -> Result<(), Error> {
		let nickname = nickname.trim();
		if nickname.is_empty() {
			return self.remove(address);
		}
		self.commit(|names| {
			names.insert(address.to_string(), nickname.to_string());
			true
		})
	}

	pub fn get(&self, address: &str) -> Option<String> {
		self.names().get(address).cloned()
	}

	pub fn remove(&self, address: &str) -> Result<(), Error> {
		self.commit(|names| names.remove(address).is_some())
	}

	/// Applies `change` to a copy of the map and keeps it only once it has been persisted.
	fn commit(
		&self,
		change: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
	) -> Result<(), Error> {
		let mut names = self.names();
		let mut updated = names.clone();
		if change(&mut updated) {
			save_json(self.store.as_ref(), keys::ACCOUNT_NICKNAMES, &updated)?;
			*names = updated;
		}
		Ok(())
	}

	pub fn all(&self) -> BTreeMap<String, String> {
		self.names().clone()
	}

	/// The nickname of `account` if it has one, else its wallet name or shortened address.
	pub fn display_name(&self, account: &ActiveAccount) -> String {
		self.get(account.address()).unwrap_or_else(|| account.display_name())
	}
}
