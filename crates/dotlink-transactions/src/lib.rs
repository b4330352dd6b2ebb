// SPDX-License-Identifier: GPL-3.0

#![doc = include_str!("../README.md")]

mod errors;
/// The persisted transaction queue.
pub mod queue;
mod status;
/// Submission progress tracking.
pub mod tracker;

pub use errors::Error;
pub use queue::{NewTransaction, QueuedTransaction, TransactionQueue, TransactionUpdate};
pub use status::TxStatus;
pub use tracker::{TxProgress, submit, track};
