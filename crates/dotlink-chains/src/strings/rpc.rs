// SPDX-License-Identifier: GPL-3.0

//! String constants for the RPC client module.

/// JSON-RPC method names used for error reporting.
///
/// Legacy JSON-RPC method names served by Polkadot SDK nodes.
pub mod methods {
	pub const CHAIN_GET_HEADER: &str = "chain_getHeader";
	pub const STATE_GET_STORAGE: &str = "state_getStorage";
	pub const SYSTEM_ACCOUNT_NEXT_INDEX: &str = "system_accountNextIndex";
	pub const SYSTEM_CHAIN: &str = "system_chain";
	pub const SYSTEM_PROPERTIES: &str = "system_properties";
}

/// Pallet and storage item names queried by the readers.
pub mod storage {
	pub const SYSTEM: &str = "System";
	pub const ACCOUNT: &str = "Account";
	pub const EVENTS: &str = "Events";
	pub const STAKING: &str = "Staking";
	pub const ACTIVE_ERA: &str = "ActiveEra";
	pub const VALIDATOR_COUNT: &str = "ValidatorCount";
	pub const MINIMUM_VALIDATOR_COUNT: &str = "MinimumValidatorCount";
	pub const MIN_NOMINATOR_BOND: &str = "MinNominatorBond";
	pub const ERAS_TOTAL_STAKE: &str = "ErasTotalStake";
}

/// Account data field names.
pub mod fields {
	pub const DATA: &str = "data";
	pub const FREE: &str = "free";
	pub const RESERVED: &str = "reserved";
	pub const FROZEN: &str = "frozen";
	/// Pre-`frozen` runtimes tracked the fee-frozen amount under this name.
	pub const FEE_FROZEN: &str = "fee_frozen";
}
