// SPDX-License-Identifier: GPL-3.0

use dotlink_chains::{
	ConnectionManager, ConnectionStatus, Error,
	testing::{MockChainApi, MockConnector, test_network},
};
use dotlink_common::{Config, KeyValueStore, MemoryStore, keys, load_json};
use std::{sync::Arc, time::Duration};
use tokio_test::{assert_err, assert_ok};

fn manager(connector: &Arc<MockConnector>) -> (ConnectionManager, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::new());
	let manager = ConnectionManager::new(connector.clone(), store.clone(), &Config::default());
	(manager, store)
}

#[tokio::test]
async fn connect_falls_back_through_endpoints_in_order() {
	let network = test_network("fallback", 4);
	let connector = MockConnector::new();
	connector.refuse(&network.endpoints[0], "timeout");
	connector.refuse(&network.endpoints[1], "handshake failed");
	connector.refuse(&network.endpoints[2], "closed");
	connector.accept(&network.endpoints[3], MockChainApi::new());
	let (manager, _) = manager(&connector);

	let connection = assert_ok!(manager.connect(&network).await);

	assert_eq!(connection.endpoint(), network.endpoints[3]);
	assert_eq!(connector.attempts(), network.endpoints);
	let state = manager.state();
	assert_eq!(state.status, ConnectionStatus::Connected);
	assert_eq!(state.connected(), Some(&connection));
	assert_eq!(state.last_error, None);
}

#[tokio::test]
async fn connect_stops_at_first_successful_endpoint() {
	let network = test_network("primary", 3);
	let connector = MockConnector::new();
	connector.accept(&network.endpoints[0], MockChainApi::new());
	connector.accept(&network.endpoints[1], MockChainApi::new());
	let (manager, _) = manager(&connector);

	assert_ok!(manager.connect(&network).await);
	assert_eq!(connector.attempts(), network.endpoints[..1]);
}

#[tokio::test]
async fn exhausted_endpoints_end_in_error_without_a_handle() {
	let network = test_network("down", 3);
	let connector = MockConnector::new();
	connector.refuse(&network.endpoints[2], "service unavailable");
	let (manager, _) = manager(&connector);

	let error = assert_err!(manager.connect(&network).await);

	assert!(matches!(error, Error::ConnectionFailure { attempts: 3, .. }), "{error}");
	assert_eq!(connector.attempts().len(), 3);
	let state = manager.state();
	assert_eq!(state.status, ConnectionStatus::Error);
	assert!(state.connection.is_none());
	assert!(state.last_error.unwrap().contains("service unavailable"));
}

#[tokio::test]
async fn network_without_endpoints_fails() {
	let network = test_network("empty", 0);
	let (manager, _) = manager(&MockConnector::new());
	let error = assert_err!(manager.connect(&network).await);
	assert!(matches!(error, Error::ConnectionFailure { attempts: 0, .. }));
	assert_eq!(manager.status(), ConnectionStatus::Error);
}

#[tokio::test]
async fn connect_is_idempotent_when_connected() {
	let network = test_network("idempotent", 2);
	let connector = MockConnector::new();
	connector.accept(&network.endpoints[0], MockChainApi::new());
	let (manager, _) = manager(&connector);

	let first = assert_ok!(manager.connect(&network).await);
	let second = assert_ok!(manager.connect(&network).await);

	assert_eq!(first.id(), second.id());
	assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test]
async fn retry_after_error_requires_an_explicit_connect() {
	let network = test_network("flaky", 1);
	let connector = MockConnector::new();
	let (manager, _) = manager(&connector);
	assert_err!(manager.connect(&network).await);

	connector.accept(&network.endpoints[0], MockChainApi::new());
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(manager.status(), ConnectionStatus::Error);

	assert_ok!(manager.connect(&network).await);
	assert_eq!(manager.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn switch_network_closes_previous_handle_and_persists_selection() {
	let a = test_network("network-a", 1);
	let b = test_network("network-b", 1);
	let (api_a, api_b) = (MockChainApi::new(), MockChainApi::new());
	let connector = MockConnector::new();
	connector.accept(&a.endpoints[0], api_a.clone());
	connector.accept(&b.endpoints[0], api_b.clone());
	let (manager, store) = manager(&connector);
	assert_ok!(manager.connect(&a).await);

	assert_ok!(manager.switch_network(&b).await);

	assert!(api_a.is_closed());
	assert!(!api_b.is_closed());
	let state = manager.state();
	assert_eq!(state.network.id, "network-b");
	assert_eq!(state.connected().map(|c| c.network_id()), Some("network-b"));
	let persisted: Option<String> = load_json(store.as_ref(), keys::SELECTED_NETWORK).unwrap();
	assert_eq!(persisted.as_deref(), Some("network-b"));
}

#[tokio::test]
async fn switch_to_current_network_is_a_noop() {
	let a = test_network("network-a", 1);
	let connector = MockConnector::new();
	connector.accept(&a.endpoints[0], MockChainApi::new());
	let (manager, store) = manager(&connector);
	assert_ok!(manager.connect(&a).await);

	assert_ok!(manager.switch_network(&a).await);

	assert_eq!(connector.attempts().len(), 1);
	assert_eq!(store.get(keys::SELECTED_NETWORK).unwrap(), None);
}

#[tokio::test]
async fn switch_network_persists_even_when_connection_fails() {
	let b = test_network("unreachable", 2);
	let (manager, store) = manager(&MockConnector::new());

	assert_err!(manager.switch_network(&b).await);

	assert_eq!(manager.status(), ConnectionStatus::Error);
	let persisted: Option<String> = load_json(store.as_ref(), keys::SELECTED_NETWORK).unwrap();
	assert_eq!(persisted.as_deref(), Some("unreachable"));
}

#[tokio::test]
async fn disconnect_closes_the_handle() {
	let network = test_network("bye", 1);
	let api = MockChainApi::new();
	let connector = MockConnector::new();
	connector.accept(&network.endpoints[0], api.clone());
	let (manager, _) = manager(&connector);
	assert_ok!(manager.connect(&network).await);

	manager.disconnect().await;

	assert!(api.is_closed());
	let state = manager.state();
	assert_eq!(state.status, ConnectionStatus::Disconnected);
	assert!(state.connection.is_none());
}

#[tokio::test(start_paused = true)]
async fn superseded_attempt_never_overwrites_newer_state() {
	let slow = test_network("slow", 1);
	let fast = test_network("fast", 1);
	let (slow_api, fast_api) = (MockChainApi::new(), MockChainApi::new());
	let connector = MockConnector::new();
	connector.accept(&slow.endpoints[0], slow_api.clone());
	connector.delay(&slow.endpoints[0], Duration::from_secs(30));
	connector.accept(&fast.endpoints[0], fast_api.clone());
	let (manager, _) = manager(&connector);
	let manager = Arc::new(manager);

	let pending = tokio::spawn({
		let manager = manager.clone();
		async move { manager.connect(&slow).await }
	});
	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(manager.status(), ConnectionStatus::Connecting);

	assert_ok!(manager.switch_network(&fast).await);
	let result = pending.await.unwrap();

	assert!(matches!(result, Err(Error::Superseded(ref id)) if id == "slow"));
	assert!(slow_api.is_closed());
	let state = manager.state();
	assert_eq!(state.network.id, "fast");
	assert_eq!(
		state.connected().map(|c| c.endpoint().to_string()),
		Some(fast.endpoints[0].clone())
	);
}

#[tokio::test]
async fn observers_see_connecting_then_connected() {
	let network = test_network("observed", 1);
	let connector = MockConnector::new();
	connector.accept(&network.endpoints[0], MockChainApi::new());
	let (manager, _) = manager(&connector);
	let mut states = manager.subscribe();
	assert_eq!(states.borrow_and_update().status, ConnectionStatus::Disconnected);

	assert_ok!(manager.connect(&network).await);

	assert!(states.has_changed().unwrap());
	assert_eq!(states.borrow_and_update().status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn start_uses_the_restored_network() {
	let store = Arc::new(MemoryStore::new());
	store.set(keys::SELECTED_NETWORK, "\"kusama\"").unwrap();
	let connector = MockConnector::new();
	let manager = ConnectionManager::new(connector.clone(), store, &Config::default());
	assert_eq!(manager.network().id, "kusama");

	assert_err!(manager.start().await);

	assert_eq!(
		connector.attempts().first().map(String::as_str),
		Some("wss://kusama-rpc.polkadot.io")
	);
}
