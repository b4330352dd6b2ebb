// SPDX-License-Identifier: GPL-3.0

//! Static catalog of known networks.
//!
//! Every network has a primary endpoint followed by an ordered list of fallbacks, token metadata
//! and an explorer base URL. The catalog is built once and never mutated.

use serde::Serialize;
use std::sync::OnceLock;

/// Identifier of the network used when neither configuration nor persisted state names one.
pub const DEFAULT_NETWORK_ID: &str = "polkadot";

/// An immutable description of a network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetworkDescriptor {
	/// Stable identifier, e.g. `assethub-polkadot`.
	pub id: String,
	/// Short display name, e.g. `AssetHub Polkadot`.
	pub name: String,
	/// Long display name.
	pub display_name: String,
	pub token_symbol: String,
	pub token_decimals: u8,
	/// SS58 address format prefix.
	pub ss58_format: u16,
	/// Endpoint URLs, primary first.
	pub endpoints: Vec<String>,
	/// Base URL of the block explorer.
	pub explorer_url: String,
	/// Accent colour used by the presentation layer.
	pub color: String,
	pub testnet: bool,
}

impl NetworkDescriptor {
	/// The primary endpoint of the network.
	pub fn primary_endpoint(&self) -> Option<&str> {
		self.endpoints.first().map(String::as_str)
	}
}

// Shorthand used by the registrar below.
#[allow(clippy::too_many_arguments)]
fn network(
	id: &str,
	name: &str,
	display_name: &str,
	endpoints: &[&str],
	token_symbol: &str,
	token_decimals: u8,
	ss58_format: u16,
	color: &str,
	testnet: bool,
) -> NetworkDescriptor {
	NetworkDescriptor {
		id: id.to_string(),
		name: name.to_string(),
		display_name: display_name.to_string(),
		token_symbol: token_symbol.to_string(),
		token_decimals,
		ss58_format,
		endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
		explorer_url: format!("https://{id}.subscan.io"),
		color: color.to_string(),
		testnet,
	}
}

const REGISTRAR: fn() -> Vec<NetworkDescriptor> = || {
	vec![
		// Relay chains
		network(
			"polkadot",
			"Polkadot",
			"Polkadot Relay Chain",
			&[
				"wss://rpc.polkadot.io",
				"wss://polkadot-rpc.dwellir.com",
				"wss://polkadot.public.curie.radiumblock.co/ws",
				"wss://polkadot-rpc-tn.dwellir.com",
			],
			"DOT",
			10,
			0,
			"#E6007A",
			false,
		),
		network(
			"kusama",
			"Kusama",
			"Kusama Network",
			&[
				"wss://kusama-rpc.polkadot.io",
				"wss://kusama-rpc.dwellir.com",
				"wss://kusama.public.curie.radiumblock.co/ws",
				"wss://kusama-rpc-tn.dwellir.com",
			],
			"KSM",
			12,
			2,
			"#000000",
			false,
		),
		network(
			"westend",
			"Westend",
			"Westend Testnet",
			&[
				"wss://westend-rpc.polkadot.io",
				"wss://westend-rpc.dwellir.com",
				"wss://westend.public.curie.radiumblock.co/ws",
			],
			"WND",
			12,
			42,
			"#DA68A7",
			true,
		),
		network(
			"paseo",
			"Paseo",
			"Paseo Testnet",
			&["wss://paseo.rpc.amforc.com", "wss://paseo-rpc.dwellir.com"],
			"PAS",
			10,
			42,
			"#6D3AEE",
			true,
		),
		// System chains
		network(
			"assethub-polkadot",
			"AssetHub Polkadot",
			"AssetHub Polkadot",
			&[
				"wss://polkadot-asset-hub-rpc.polkadot.io",
				"wss://sys.ibp.network/asset-hub-polkadot",
				"wss://statemint-rpc.dwellir.com",
			],
			"DOT",
			10,
			0,
			"#E6007A",
			false,
		),
		network(
			"assethub-kusama",
			"AssetHub Kusama",
			"AssetHub Kusama",
			&[
				"wss://kusama-asset-hub-rpc.polkadot.io",
				"wss://sys.ibp.network/asset-hub-kusama",
				"wss://statemine-rpc.dwellir.com",
			],
			"KSM",
			12,
			2,
			"#000000",
			false,
		),
		network(
			"assethub-westend",
			"AssetHub Westend",
			"AssetHub Westend Testnet",
			&[
				"wss://westend-asset-hub-rpc.polkadot.io",
				"wss://sys.ibp.network/asset-hub-westend",
			],
			"WND",
			12,
			42,
			"#DA68A7",
			true,
		),
		network(
			"assethub-paseo",
			"AssetHub Paseo",
			"AssetHub Paseo Testnet",
			&["wss://paseo-asset-hub-rpc.polkadot.io", "wss://sys.ibp.network/asset-hub-paseo"],
			"PAS",
			10,
			42,
			"#6D3AEE",
			true,
		),
	]
};

/// Returns every known network, in catalog order.
pub fn networks() -> &'static [NetworkDescriptor] {
	static REGISTRY: OnceLock<Vec<NetworkDescriptor>> = OnceLock::new();
	REGISTRY.get_or_init(REGISTRAR)
}

/// Looks up a network by identifier.
pub fn get(id: &str) -> Option<&'static NetworkDescriptor> {
	networks().iter().find(|n| n.id == id)
}

/// Looks up a network by its short display name.
pub fn by_name(name: &str) -> Option<&'static NetworkDescriptor> {
	networks().iter().find(|n| n.name == name)
}

/// Looks up a network by identifier, falling back to its short display name.
pub fn find(id_or_name: &str) -> Option<&'static NetworkDescriptor> {
	get(id_or_name).or_else(|| by_name(id_or_name))
}

/// Returns the network owning `endpoint`, if any.
pub fn by_endpoint(endpoint: &str) -> Option<&'static NetworkDescriptor> {
	networks().iter().find(|n| n.endpoints.iter().any(|e| e == endpoint))
}

/// All production networks.
pub fn mainnets() -> impl Iterator<Item = &'static NetworkDescriptor> {
	networks().iter().filter(|n| !n.testnet)
}

/// All test networks.
pub fn testnets() -> impl Iterator<Item = &'static NetworkDescriptor> {
	networks().iter().filter(|n| n.testnet)
}

/// Resolves the default network, falling back to Polkadot when `id` is unknown.
pub fn default_network(id: &str) -> &'static NetworkDescriptor {
	match get(id).or_else(|| get(DEFAULT_NETWORK_ID)) {
		Some(network) => network,
		// The catalog always contains Polkadot.
		None => &networks()[0],
	}
}
