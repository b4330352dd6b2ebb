// SPDX-License-Identifier: GPL-3.0

//! Ownership of the single live chain connection.
//!
//! The [`ConnectionManager`] tries a network's endpoints strictly in order, publishes its
//! [`ConnectionState`] through a watch channel and persists the selected network. Every
//! operation takes a fresh epoch; a state write is only applied while its epoch is still the
//! latest, so an attempt that was overtaken by a newer connect, switch or disconnect can never
//! clobber newer state.

use crate::{
	api::{ChainApi, Connector},
	error::Error,
	registry::{self, NetworkDescriptor},
};
use dotlink_common::{Config, KeyValueStore, keys, load_json, save_json};
use std::{
	fmt,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};
use strum_macros::Display;
use tokio::sync::{Mutex, watch};
use url::Url;

/// Status of the connection.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ConnectionStatus {
	Disconnected,
	Connecting,
	Connected,
	Error,
}

/// A live connection, acknowledged ready by the remote endpoint.
///
/// Every successful connect yields a new identity; readers use it to detect that the connection
/// they subscribed against has been replaced.
#[derive(Clone)]
pub struct Connection {
	id: u64,
	network_id: String,
	endpoint: String,
	api: Arc<dyn ChainApi>,
}

impl Connection {
	/// Identity of this connection, unique within the manager.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Identifier of the network connected to.
	pub fn network_id(&self) -> &str {
		&self.network_id
	}

	/// Endpoint that accepted the connection.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	pub(crate) fn api(&self) -> &Arc<dyn ChainApi> {
		&self.api
	}
}

impl fmt::Debug for Connection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connection")
			.field("id", &self.id)
			.field("network_id", &self.network_id)
			.field("endpoint", &self.endpoint)
			.finish_non_exhaustive()
	}
}

impl PartialEq for Connection {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

/// Snapshot of the connection published to observers.
///
/// `status` is [`ConnectionStatus::Connected`] if and only if `connection` is present.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionState {
	pub network: NetworkDescriptor,
	pub status: ConnectionStatus,
	pub connection: Option<Connection>,
	/// The failure that ended the last connect, if it failed.
	pub last_error: Option<String>,
}

impl ConnectionState {
	fn new(network: NetworkDescriptor) -> Self {
		Self { network, status: ConnectionStatus::Disconnected, connection: None, last_error: None }
	}

	/// The live connection, if connected.
	pub fn connected(&self) -> Option<&Connection> {
		match self.status {
			ConnectionStatus::Connected => self.connection.as_ref(),
			_ => None,
		}
	}
}

/// Owns the single live connection to a chain node.
pub struct ConnectionManager {
	connector: Arc<dyn Connector>,
	store: Arc<dyn KeyValueStore>,
	state: watch::Sender<ConnectionState>,
	epoch: Mutex<u64>,
	next_id: AtomicU64,
}

impl ConnectionManager {
	/// Creates a disconnected manager targeting the persisted network, or the configured default.
	///
	/// # Arguments
	/// * `connector` - Opens handles to chain nodes.
	/// * `store` - Durable storage holding the selected network.
	/// * `config` - Application configuration.
	pub fn new(
		connector: Arc<dyn Connector>,
		store: Arc<dyn KeyValueStore>,
		config: &Config,
	) -> Self {
		let network = restore_network(store.as_ref(), config);
		let (state, _) = watch::channel(ConnectionState::new(network));
		Self { connector, store, state, epoch: Mutex::new(0), next_id: AtomicU64::new(1) }
	}

	/// Observes the connection state.
	pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
		self.state.subscribe()
	}

	/// The current connection state.
	pub fn state(&self) -> ConnectionState {
		self.state.borrow().clone()
	}

	pub fn status(&self) -> ConnectionStatus {
		self.state.borrow().status
	}

	/// The network currently targeted.
	pub fn network(&self) -> NetworkDescriptor {
		self.state.borrow().network.clone()
	}

	/// Connects to the currently targeted network.
	pub async fn start(&self) -> Result<Connection, Error> {
		let network = self.network();
		self.connect(&network).await
	}

	/// Connects to `network`, trying its endpoints strictly in order.
	///
	/// Returns the existing connection if already connected to `network`. Any connection to
	/// another network is closed first. Fails with [`Error::ConnectionFailure`] once every
	/// endpoint failed, or [`Error::Superseded`] if another operation took over meanwhile.
	pub async fn connect(&self, network: &NetworkDescriptor) -> Result<Connection, Error> {
		{
			let state = self.state.borrow();
			if state.network.id == network.id {
				if let Some(connection) = state.connected() {
					return Ok(connection.clone());
				}
			}
		}

		let epoch = self.begin().await;
		let mut previous = None;
		self.write_if_current(epoch, |state| {
			previous = state.connection.take();
			state.network = network.clone();
			state.status = ConnectionStatus::Connecting;
			state.last_error = None;
		})
		.await;
		if let Some(previous) = previous {
			close(previous).await;
		}

		let mut attempts = 0;
		let mut last_error = String::from("no endpoints configured");
		for endpoint in &network.endpoints {
			let url = match Url::parse(endpoint) {
				Ok(url) => url,
				Err(e) => {
					log::warn!("Skipping invalid endpoint {endpoint}: {e}");
					last_error = e.to_string();
					continue;
				},
			};
			attempts += 1;
			log::info!("Attempting to connect to {endpoint}");
			match self.connector.connect(&url).await {
				Ok(api) => {
					let connection = Connection {
						id: self.next_id.fetch_add(1, Ordering::Relaxed),
						network_id: network.id.clone(),
						endpoint: endpoint.clone(),
						api,
					};
					let applied = self
						.write_if_current(epoch, |state| {
							state.status = ConnectionStatus::Connected;
							state.connection = Some(connection.clone());
						})
						.await;
					if !applied {
						log::debug!("Discarding superseded connection to {endpoint}");
						close(connection).await;
						return Err(Error::Superseded(network.id.clone()));
					}
					log::info!("Successfully connected to {endpoint}");
					return Ok(connection);
				},
				Err(e) => {
					log::warn!("Failed to connect to {endpoint}: {e}");
					last_error = e.to_string();
				},
			}
			if !self.is_current(epoch).await {
				return Err(Error::Superseded(network.id.clone()));
			}
		}

		log::error!("Failed to connect to any endpoint of {}: {last_error}", network.id);
		self.write_if_current(epoch, |state| {
			state.status = ConnectionStatus::Error;
			state.connection = None;
			state.last_error = Some(last_error.clone());
		})
		.await;
		Err(Error::ConnectionFailure { network: network.id.clone(), attempts, message: last_error })
	}

	/// Switches to `network` and persists it as the selected network.
	///
	/// A no-op when `network` is already the targeted network.
	pub async fn switch_network(&self, network: &NetworkDescriptor) -> Result<(), Error> {
		if self.state.borrow().network.id == network.id {
			return Ok(());
		}
		if let Err(e) = save_json(self.store.as_ref(), keys::SELECTED_NETWORK, &network.id) {
			log::warn!("Failed to persist the selected network {}: {e}", network.id);
		}
		self.connect(network).await.map(|_| ())
	}

	/// Closes the connection, if any.
	pub async fn disconnect(&self) {
		let epoch = self.begin().await;
		let mut previous = None;
		self.write_if_current(epoch, |state| {
			previous = state.connection.take();
			state.status = ConnectionStatus::Disconnected;
		})
		.await;
		if let Some(previous) = previous {
			close(previous).await;
		}
	}

	/// Starts a new operation, invalidating every older one.
	async fn begin(&self) -> u64 {
		let mut epoch = self.epoch.lock().await;
		*epoch += 1;
		*epoch
	}

	async fn is_current(&self, epoch: u64) -> bool {
		*self.epoch.lock().await == epoch
	}

	/// Applies `write` if `epoch` is still the latest operation.
	async fn write_if_current(&self, epoch: u64, write: impl FnOnce(&mut ConnectionState)) -> bool {
		let current = self.epoch.lock().await;
		if *current != epoch {
			return false;
		}
		self.state.send_modify(write);
		true
	}
}

/// Best-effort close: failures are logged, never returned.
async fn close(connection: Connection) {
	if let Err(e) = connection.api.close().await {
		log::warn!("Failed to close connection to {}: {e}", connection.endpoint);
	}
}

/// Resolves the network to start with: the persisted selection when known, else the default.
///
/// The selection is persisted by identifier; a display name is accepted as well.
pub fn restore_network(store: &dyn KeyValueStore, config: &Config) -> NetworkDescriptor {
	match load_json::<String>(store, keys::SELECTED_NETWORK) {
		Ok(Some(selected)) => match registry::find(&selected) {
			Some(network) => return network.clone(),
			None => log::warn!("Ignoring unknown persisted network {selected}"),
		},
		Ok(None) => {},
		Err(e) => log::warn!("Ignoring unreadable persisted network: {e}"),
	}
	registry::default_network(&config.default_chain).clone()
}
