// SPDX-License-Identifier: GPL-3.0

//! Maps submission progress onto queue updates.

use crate::{NewTransaction, TransactionQueue, TransactionUpdate, TxStatus};
use dotlink_chains::{
	NetworkDescriptor,
	explorer::{ExplorerKind, explorer_link},
};
use futures::{Stream, StreamExt};
use std::{fmt::Display, future::Future};

/// Progress of a submitted transaction, as reported by the submitting code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxProgress {
	/// Accepted by the node and gossiped.
	Broadcast { hash: String },
	/// Included in a block.
	InBlock { block_hash: String },
	/// The including block was finalized.
	Finalized { block_hash: String },
	/// Rejected, dropped or reverted.
	Failed { message: String },
}

impl TxProgress {
	/// The queue update describing this progress.
	///
	/// # Arguments
	/// * `network` - The network submitted to, used for explorer links.
	pub fn to_update(&self, network: Option<&NetworkDescriptor>) -> TransactionUpdate {
		match self {
			Self::Broadcast { hash } => {
				let update = TransactionUpdate::status(TxStatus::Broadcasting).with_hash(hash);
				match network {
					Some(network) => {
						let url = explorer_link(network, ExplorerKind::Extrinsic, hash);
						update.with_explorer_url(url)
					},
					None => update,
				}
			},
			Self::InBlock { block_hash } =>
				TransactionUpdate::status(TxStatus::InBlock).with_block_hash(block_hash),
			Self::Finalized { block_hash } =>
				TransactionUpdate::status(TxStatus::Finalized).with_block_hash(block_hash),
			Self::Failed { message } =>
				TransactionUpdate::status(TxStatus::Error).with_error(message),
		}
	}
}

/// Applies `progress` to the queue entry `id` until the transaction settles.
///
/// A stream ending before the transaction settles marks the entry failed. Returns the entry's
/// final status.
///
/// # Arguments
/// * `queue` - The transaction queue.
/// * `id` - Identifier of the queue entry.
/// * `progress` - Progress events, in order.
/// * `network` - The network submitted to, used for explorer links.
pub async fn track<S>(
	queue: &TransactionQueue,
	id: &str,
	progress: S,
	network: Option<&NetworkDescriptor>,
) -> TxStatus
where
	S: Stream<Item = TxProgress>,
{
	let mut progress = std::pin::pin!(progress);
	while let Some(event) = progress.next().await {
		log::debug!("Transaction {id}: {event:?}");
		queue.update(id, event.to_update(network));
		match queue.get(id) {
			Some(entry) if entry.status.is_terminal() => return entry.status,
			Some(_) => {},
			None => {
				log::debug!("Transaction {id} was removed while being tracked");
				return TxStatus::Error;
			},
		}
	}
	log::warn!("Progress of transaction {id} ended before it settled");
	queue.update(
		id,
		TransactionUpdate::status(TxStatus::Error)
			.with_error("Transaction status stream ended unexpectedly"),
	);
	queue.get(id).map_or(TxStatus::Error, |entry| entry.status)
}

/// Queues `transaction`, awaits its submission and tracks its progress.
///
/// A failed submission is recorded as the entry's error rather than returned. Returns the
/// entry's identifier and final status.
///
/// # Arguments
/// * `queue` - The transaction queue.
/// * `transaction` - The transaction to queue.
/// * `network` - The network submitted to, used for explorer links.
/// * `submission` - Submits the transaction, resolving to its progress events.
pub async fn submit<F, S, E>(
	queue: &TransactionQueue,
	transaction: NewTransaction,
	network: Option<&NetworkDescriptor>,
	submission: F,
) -> (String, TxStatus)
where
	F: Future<Output = Result<S, E>>,
	S: Stream<Item = TxProgress>,
	E: Display,
{
	let id = queue.add(transaction);
	match submission.await {
		Ok(progress) => {
			let status = track(queue, &id, progress, network).await;
			(id, status)
		},
		Err(e) => {
			log::warn!("Submission of transaction {id} failed: {e}");
			queue.update(&id, TransactionUpdate::status(TxStatus::Error).with_error(e.to_string()));
			(id, TxStatus::Error)
		},
	}
}
