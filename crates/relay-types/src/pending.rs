//! Pending transaction records tracked by the receipt poller.

use crate::{TransactionHash, TransactionReceipt};
use serde::{Deserialize, Serialize};

/// A submitted transaction awaiting its receipt.
///
/// Once `receipt` is set the record is terminal and never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
	pub hash: TransactionHash,
	pub chain_id: u64,
	/// Submission time in milliseconds since the Unix epoch.
	pub added_time: u64,
	/// Block height of the most recent unsuccessful receipt check.
	pub last_checked_block_number: Option<u64>,
	pub receipt: Option<TransactionReceipt>,
}

impl PendingTransaction {
	pub fn new(chain_id: u64, hash: TransactionHash, added_time: u64) -> Self {
		Self {
			hash,
			chain_id,
			added_time,
			last_checked_block_number: None,
			receipt: None,
		}
	}

	pub fn is_confirmed(&self) -> bool {
		self.receipt.is_some()
	}
}
