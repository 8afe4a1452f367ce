//! Registry of submitted transactions awaiting receipts.
//!
//! Entries are keyed by hash and never removed. Every mutation happens under a
//! short write lock; callers snapshot entries and release the lock before any
//! RPC is issued.

use relay_types::{PendingTransaction, TransactionHash, TransactionReceipt};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct PendingRegistry {
	entries: RwLock<HashMap<TransactionHash, PendingTransaction>>,
}

impl PendingRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts tracking `hash`. Returns false if it is already tracked, in
	/// which case the existing entry is left untouched.
	pub async fn register(&self, chain_id: u64, hash: TransactionHash, added_time: u64) -> bool {
		let mut entries = self.entries.write().await;
		if entries.contains_key(&hash) {
			return false;
		}
		entries.insert(
			hash.clone(),
			PendingTransaction::new(chain_id, hash, added_time),
		);
		true
	}

	pub async fn get(&self, hash: &TransactionHash) -> Option<PendingTransaction> {
		self.entries.read().await.get(hash).cloned()
	}

	/// Receipt-less entries on `chain_id`, ordered by hash.
	pub async fn pending_for_chain(&self, chain_id: u64) -> Vec<PendingTransaction> {
		let mut pending: Vec<PendingTransaction> = self
			.entries
			.read()
			.await
			.values()
			.filter(|tx| tx.chain_id == chain_id && !tx.is_confirmed())
			.cloned()
			.collect();
		pending.sort_by(|a, b| a.hash.cmp(&b.hash));
		pending
	}

	/// Records an unsuccessful check at `block_number`.
	///
	/// Ignored for unknown or confirmed entries and for blocks older than the
	/// last recorded one. Returns whether the entry changed.
	pub async fn mark_checked(&self, hash: &TransactionHash, block_number: u64) -> bool {
		let mut entries = self.entries.write().await;
		let Some(tx) = entries.get_mut(hash) else {
			return false;
		};
		if tx.is_confirmed() {
			return false;
		}
		if tx
			.last_checked_block_number
			.is_some_and(|last| block_number < last)
		{
			return false;
		}
		tx.last_checked_block_number = Some(block_number);
		true
	}

	/// Attaches a receipt. Only the first receipt is kept; returns whether
	/// this call was the one that confirmed the entry.
	pub async fn mark_confirmed(&self, hash: &TransactionHash, receipt: TransactionReceipt) -> bool {
		let mut entries = self.entries.write().await;
		match entries.get_mut(hash) {
			Some(tx) if !tx.is_confirmed() => {
				tx.receipt = Some(receipt);
				true
			},
			_ => false,
		}
	}

	pub async fn all(&self) -> Vec<PendingTransaction> {
		self.entries.read().await.values().cloned().collect()
	}

	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}
}
