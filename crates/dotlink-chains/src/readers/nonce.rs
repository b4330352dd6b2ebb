// SPDX-License-Identifier: GPL-3.0

use super::Query;
use crate::{api::ChainApi, error::ReadError};
use async_trait::async_trait;

/// Reads the next transaction index of an SS58 address.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonceQuery;

#[async_trait]
impl Query for NonceQuery {
	const KIND: &'static str = "nonce";
	type Key = String;
	type Output = u64;

	async fn fetch(&self, api: &dyn ChainApi, address: &String) -> Result<u64, ReadError> {
		Ok(api.account_next_index(address).await?)
	}
}
