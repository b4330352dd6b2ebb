// SPDX-License-Identifier: GPL-3.0

use super::Query;
use crate::{
	api::{AccountFields, ChainApi},
	error::ReadError,
};
use async_trait::async_trait;
use dotlink_common::format::format_balance;
use serde::{Deserialize, Serialize};

/// Balance of an account, in the chain's smallest unit.
///
/// `total` is always exactly `free + reserved`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
	pub free: u128,
	pub reserved: u128,
	pub frozen: u128,
	pub total: u128,
}

impl Balance {
	/// Derives the balance from raw account fields.
	///
	/// `frozen` is taken from the current field name, then the legacy one, else zero.
	pub fn from_fields(fields: &AccountFields) -> Result<Self, ReadError> {
		let total = fields
			.free
			.checked_add(fields.reserved)
			.ok_or(ReadError::Overflow("total balance"))?;
		Ok(Self {
			free: fields.free,
			reserved: fields.reserved,
			frozen: fields.frozen.or(fields.fee_frozen).unwrap_or_default(),
			total,
		})
	}

	/// The free balance not locked by freezes.
	pub fn transferable(&self) -> u128 {
		self.free.saturating_sub(self.frozen)
	}

	/// Formats the free balance for display.
	pub fn format_free(&self, decimals: u8, symbol: &str) -> String {
		format_balance(self.free, decimals, Some(symbol))
	}
}

/// Reads the balance of an SS58 address.
#[derive(Clone, Copy, Debug, Default)]
pub struct BalanceQuery;

#[async_trait]
impl Query for BalanceQuery {
	const KIND: &'static str = "balance";
	type Key = String;
	type Output = Balance;

	async fn fetch(&self, api: &dyn ChainApi, address: &String) -> Result<Balance, ReadError> {
		Balance::from_fields(&api.account(address).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn total_is_exact_sum_of_free_and_reserved() {
		for decimals in [0u8, 10, 12, 18] {
			let fields = AccountFields { free: 1_000, reserved: 250, ..Default::default() };
			let balance = Balance::from_fields(&fields).unwrap();
			assert_eq!(balance.total, 1_250, "decimals {decimals}");
		}
		// Beyond the integer precision of an f64.
		let fields = AccountFields {
			free: 9_007_199_254_740_993,
			reserved: 1,
			..Default::default()
		};
		assert_eq!(Balance::from_fields(&fields).unwrap().total, 9_007_199_254_740_994);
	}

	#[test]
	fn frozen_falls_back_to_legacy_field() {
		let current = AccountFields { frozen: Some(5), fee_frozen: Some(9), ..Default::default() };
		assert_eq!(Balance::from_fields(&current).unwrap().frozen, 5);
		let legacy = AccountFields { fee_frozen: Some(9), ..Default::default() };
		assert_eq!(Balance::from_fields(&legacy).unwrap().frozen, 9);
		let neither = AccountFields::default();
		assert_eq!(Balance::from_fields(&neither).unwrap().frozen, 0);
	}

	#[test]
	fn overflowing_total_is_an_error() {
		let fields = AccountFields { free: u128::MAX, reserved: 1, ..Default::default() };
		assert!(matches!(Balance::from_fields(&fields), Err(ReadError::Overflow(_))));
	}

	#[test]
	fn transferable_and_formatting() {
		let balance = Balance::from_fields(&AccountFields {
			free: 15_000_000_000,
			reserved: 0,
			frozen: Some(5_000_000_000),
			..Default::default()
		})
		.unwrap();
		assert_eq!(balance.transferable(), 10_000_000_000);
		assert_eq!(balance.format_free(10, "DOT"), "1.5 DOT");
	}
}
