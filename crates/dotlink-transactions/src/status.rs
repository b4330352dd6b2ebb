// SPDX-License-Identifier: GPL-3.0

use serde::{Deserialize, Serialize};
use strum::EnumMessage as _;
use strum_macros::{AsRefStr, Display, EnumMessage, EnumString, VariantArray};

/// Lifecycle status of a queued transaction.
///
/// Progresses `Pending → Broadcasting → InBlock → Finalized`. `Error` may be reached from any
/// non-terminal status. `Finalized` and `Error` are terminal.
#[derive(
	AsRefStr,
	Clone,
	Copy,
	Debug,
	Deserialize,
	Display,
	EnumMessage,
	EnumString,
	Eq,
	Hash,
	PartialEq,
	Serialize,
	VariantArray,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TxStatus {
	#[strum(message = "Pending")]
	Pending,
	#[strum(message = "Broadcasting")]
	Broadcasting,
	#[strum(message = "In Block")]
	InBlock,
	#[strum(message = "Finalized")]
	Finalized,
	#[strum(message = "Failed")]
	Error,
}

impl TxStatus {
	fn rank(self) -> u8 {
		match self {
			Self::Pending => 0,
			Self::Broadcasting => 1,
			Self::InBlock => 2,
			Self::Finalized | Self::Error => 3,
		}
	}

	/// Whether the transaction is still in flight.
	pub fn is_active(self) -> bool {
		matches!(self, Self::Pending | Self::Broadcasting | Self::InBlock)
	}

	pub fn is_terminal(self) -> bool {
		!self.is_active()
	}

	/// Whether an entry in this status may move to `next`.
	///
	/// Only forward moves are allowed. Re-applying the current status of an active entry is
	/// accepted as a no-op.
	pub fn can_transition_to(self, next: TxStatus) -> bool {
		if self.is_terminal() {
			return false;
		}
		next == Self::Error || next.rank() >= self.rank()
	}

	/// Human readable label.
	pub fn label(self) -> &'static str {
		self.get_message().unwrap_or_default()
	}
}
