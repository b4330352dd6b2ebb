// SPDX-License-Identifier: GPL-3.0

use super::Query;
use crate::{api::ChainApi, error::ReadError};
use async_trait::async_trait;

/// Reads the best block number.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockNumberQuery;

#[async_trait]
impl Query for BlockNumberQuery {
	const KIND: &'static str = "block_number";
	type Key = ();
	type Output = u64;

	async fn fetch(&self, api: &dyn ChainApi, _: &()) -> Result<u64, ReadError> {
		Ok(api.best_block_number().await?)
	}
}
