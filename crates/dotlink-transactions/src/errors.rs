// SPDX-License-Identifier: GPL-3.0

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	/// The transaction is still in flight and can't be dismissed.
	#[error("Transaction {0} is still in progress")]
	InProgress(String),
	#[error("Storage error: {0}")]
	Storage(#[from] dotlink_common::Error),
}
