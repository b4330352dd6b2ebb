// SPDX-License-Identifier: GPL-3.0

use super::Query;
use crate::{api::ChainApi, error::ReadError, strings::rpc::storage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Staking metrics of the active era.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingInfo {
	/// Index of the active era, zero before the first era starts.
	pub active_era: u32,
	pub validator_count: u32,
	pub minimum_validator_count: u32,
	pub total_stake: u128,
	pub min_nominator_bond: u128,
}

/// Reads [`StakingInfo`]. Fails on chains without a staking pallet.
#[derive(Clone, Copy, Debug, Default)]
pub struct StakingQuery;

#[async_trait]
impl Query for StakingQuery {
	const KIND: &'static str = "staking";
	type Key = ();
	type Output = StakingInfo;

	async fn fetch(&self, api: &dyn ChainApi, _: &()) -> Result<StakingInfo, ReadError> {
		let fields = api.staking().await?.ok_or(ReadError::PalletUnavailable(storage::STAKING))?;
		Ok(StakingInfo {
			active_era: fields.active_era.unwrap_or_default(),
			validator_count: fields.validator_count,
			minimum_validator_count: fields.minimum_validator_count,
			total_stake: fields.total_stake,
			min_nominator_bond: fields.min_nominator_bond,
		})
	}
}
