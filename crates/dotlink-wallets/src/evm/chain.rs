// SPDX-License-Identifier: GPL-3.0

use serde::{Deserialize, Serialize};

/// Native currency of an EVM chain.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
}

/// Parameters of `wallet_addEthereumChain` (EIP-3085).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmChainParams {
	/// Hex chain id, e.g. `0x190f1b46`.
	pub chain_id: String,
	pub chain_name: String,
	pub native_currency: NativeCurrency,
	pub rpc_urls: Vec<String>,
	pub block_explorer_urls: Vec<String>,
}

impl EvmChainParams {
	/// The chain id as a number, if it is valid hex.
	pub fn chain_id_number(&self) -> Option<u64> {
		parse_chain_id(&self.chain_id)
	}
}

/// Parses a `0x`-prefixed hex chain id.
pub fn parse_chain_id(chain_id: &str) -> Option<u64> {
	let digits = chain_id.strip_prefix("0x").or_else(|| chain_id.strip_prefix("0X"))?;
	u64::from_str_radix(digits, 16).ok()
}

/// The Paseo Asset Hub smart-contract testnet.
pub fn paseo_asset_hub() -> EvmChainParams {
	EvmChainParams {
		chain_id: "0x190f1b46".to_string(),
		chain_name: "Paseo Asset Hub".to_string(),
		native_currency: NativeCurrency {
			name: "PAS".to_string(),
			symbol: "PAS".to_string(),
			decimals: 18,
		},
		rpc_urls: vec!["https://testnet-passet-hub-eth-rpc.polkadot.io".to_string()],
		block_explorer_urls: vec![
			"https://blockscout-passet-hub.parity-testnet.parity.io/".to_string(),
		],
	}
}
