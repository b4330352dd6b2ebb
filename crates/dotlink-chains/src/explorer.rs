// SPDX-License-Identifier: GPL-3.0

//! Block explorer links.

use crate::registry::{self, NetworkDescriptor};
use strum_macros::{AsRefStr, Display, EnumString};

/// Explorer used when a network is unknown.
const FALLBACK_EXPLORER: &str = "https://polkadot.subscan.io";

/// The kind of resource linked to.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum ExplorerKind {
	Account,
	Block,
	Extrinsic,
	Event,
}

/// A named explorer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Explorer {
	pub name: String,
	pub url: String,
}

/// A link together with its (optionally shortened) label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorerLink {
	pub url: String,
	pub text: String,
}

/// Builds an explorer URL for a resource on `network`.
///
/// # Arguments
/// * `network` - The network the resource lives on.
/// * `kind` - The kind of resource.
/// * `value` - Address, block number or hash identifying the resource.
pub fn explorer_link(network: &NetworkDescriptor, kind: ExplorerKind, value: &str) -> String {
	format!("{}/{}/{}", network.explorer_url.trim_end_matches('/'), kind.as_ref(), value)
}

/// Builds an explorer URL for a resource on the network with the given short name.
///
/// Unknown networks link to the Polkadot explorer.
pub fn explorer_link_by_name(network_name: &str, kind: ExplorerKind, value: &str) -> String {
	match registry::by_name(network_name) {
		Some(network) => explorer_link(network, kind, value),
		None => format!("{FALLBACK_EXPLORER}/{}/{value}", kind.as_ref()),
	}
}

/// Builds an explorer link whose label is shortened for display.
pub fn format_explorer_link(
	network: &NetworkDescriptor,
	kind: ExplorerKind,
	value: &str,
	shorten: bool,
) -> ExplorerLink {
	let url = explorer_link(network, kind, value);
	let text = match (shorten, kind) {
		(true, ExplorerKind::Account) => dotlink_common::format::format_address(value, 6, 4),
		(true, ExplorerKind::Extrinsic | ExplorerKind::Block) =>
			dotlink_common::format::format_address(value, 8, 6),
		_ => value.to_string(),
	};
	ExplorerLink { url, text }
}

/// Names the explorer behind a URL.
pub fn explorer_name(url: &str) -> &'static str {
	if url.contains("subscan") {
		"Subscan"
	} else if url.contains("polkascan") {
		"Polkascan"
	} else if url.contains("polkaholic") {
		"Polkaholic"
	} else {
		"Block Explorer"
	}
}

/// Lists the explorers available for a network: its primary explorer plus known alternatives.
pub fn chain_explorers(network: &NetworkDescriptor) -> Vec<Explorer> {
	let mut explorers = vec![Explorer {
		name: explorer_name(&network.explorer_url).to_string(),
		url: network.explorer_url.clone(),
	}];
	if matches!(network.id.as_str(), "polkadot" | "kusama") {
		for (name, host) in [("Polkascan", "polkascan"), ("Polkaholic", "polkaholic")] {
			explorers.push(Explorer {
				name: name.to_string(),
				url: format!("https://{}.{host}.io", network.id),
			});
		}
	}
	explorers
}

/// Whether `value` looks like a block hash: `0x` followed by 64 hex digits.
pub fn is_block_hash(value: &str) -> bool {
	value
		.strip_prefix("0x")
		.is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Whether `value` looks like an extrinsic hash.
pub fn is_extrinsic_hash(value: &str) -> bool {
	is_block_hash(value)
}

/// Whether `value` is a block number.
pub fn is_block_number(value: &str) -> bool {
	!value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
