// SPDX-License-Identifier: GPL-3.0

use super::Query;
use crate::{api::ChainApi, error::ReadError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_TOKEN_SYMBOL: &str = "UNIT";
const DEFAULT_TOKEN_DECIMALS: u8 = 12;
const DEFAULT_SS58_FORMAT: u16 = 42;

/// Identity and token metadata of the connected chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
	pub chain: String,
	pub token_symbol: String,
	pub token_decimals: u8,
	pub ss58_format: u16,
	pub genesis_hash: String,
}

/// Reads [`ChainInfo`], defaulting properties the node doesn't report.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainInfoQuery;

#[async_trait]
impl Query for ChainInfoQuery {
	const KIND: &'static str = "chain_info";
	type Key = ();
	type Output = ChainInfo;

	async fn fetch(&self, api: &dyn ChainApi, _: &()) -> Result<ChainInfo, ReadError> {
		let properties = api.chain_properties().await?;
		Ok(ChainInfo {
			chain: properties.chain,
			token_symbol: properties
				.token_symbol
				.unwrap_or_else(|| DEFAULT_TOKEN_SYMBOL.to_string()),
			token_decimals: properties.token_decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS),
			ss58_format: properties.ss58_format.unwrap_or(DEFAULT_SS58_FORMAT),
			genesis_hash: properties.genesis_hash,
		})
	}
}
