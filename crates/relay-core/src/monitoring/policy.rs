//! Due-check policy for pending transactions.
//!
//! Fresh transactions are checked on every new block. The cadence decays as a
//! transaction ages: every third block after five minutes, every tenth block
//! after an hour.

use relay_types::{utils::minutes_between, PendingTransaction};

const SLOW_AFTER_MINUTES: f64 = 5.0;
const SLOWEST_AFTER_MINUTES: f64 = 60.0;
const SLOW_BLOCK_INTERVAL: u64 = 3;
const SLOWEST_BLOCK_INTERVAL: u64 = 10;

/// Whether `tx` should get a receipt check at `current_block`.
pub fn should_check(tx: &PendingTransaction, current_block: u64, now_ms: u64) -> bool {
	if tx.is_confirmed() {
		return false;
	}

	let Some(last_checked) = tx.last_checked_block_number else {
		return true;
	};

	let blocks_since_check = current_block.saturating_sub(last_checked);
	if blocks_since_check < 1 {
		return false;
	}

	let minutes_pending = minutes_between(tx.added_time, now_ms);
	if minutes_pending > SLOWEST_AFTER_MINUTES {
		blocks_since_check >= SLOWEST_BLOCK_INTERVAL
	} else if minutes_pending > SLOW_AFTER_MINUTES {
		blocks_since_check >= SLOW_BLOCK_INTERVAL
	} else {
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::{TransactionHash, TransactionReceipt};

	const MINUTE_MS: u64 = 60_000;

	fn tx(added_time: u64, last_checked: Option<u64>) -> PendingTransaction {
		let mut tx = PendingTransaction::new(1, TransactionHash(vec![0xaa; 32]), added_time);
		tx.last_checked_block_number = last_checked;
		tx
	}

	/// Walks blocks from `start` to `end`, recording a check whenever one is
	/// due, and returns the blocks that were checked.
	fn simulate(added_time: u64, now_ms: u64, start: u64, end: u64) -> Vec<u64> {
		let mut pending = tx(added_time, Some(start));
		let mut checked = Vec::new();
		for block in start..=end {
			if should_check(&pending, block, now_ms) {
				checked.push(block);
				pending.last_checked_block_number = Some(block);
			}
		}
		checked
	}

	#[test]
	fn test_never_checked_is_due() {
		assert!(should_check(&tx(0, None), 0, 120 * MINUTE_MS));
	}

	#[test]
	fn test_confirmed_is_never_due() {
		let mut confirmed = tx(0, None);
		confirmed.receipt = Some(TransactionReceipt {
			hash: confirmed.hash.clone(),
			block_number: 1,
			success: true,
		});
		assert!(!should_check(&confirmed, 1_000, MINUTE_MS));
	}

	#[test]
	fn test_same_block_is_not_due() {
		assert!(!should_check(&tx(0, Some(10)), 10, 0));
		// a lagging node reports an older block
		assert!(!should_check(&tx(0, Some(10)), 8, 0));
	}

	#[test]
	fn test_fresh_transactions_checked_every_block() {
		assert_eq!(simulate(0, 2 * MINUTE_MS, 100, 105), vec![101, 102, 103, 104, 105]);
	}

	#[test]
	fn test_cadence_after_five_minutes() {
		assert_eq!(simulate(0, 30 * MINUTE_MS, 100, 110), vec![103, 106, 109]);
	}

	#[test]
	fn test_cadence_after_an_hour() {
		assert_eq!(simulate(0, 61 * MINUTE_MS, 100, 130), vec![110, 120, 130]);
	}

	#[test]
	fn test_thresholds_are_exclusive() {
		// exactly five minutes still counts as fresh
		assert!(should_check(&tx(0, Some(10)), 11, 5 * MINUTE_MS));
		// exactly an hour still uses the three-block cadence
		assert!(should_check(&tx(0, Some(10)), 13, 60 * MINUTE_MS));
		assert!(!should_check(&tx(0, Some(10)), 12, 60 * MINUTE_MS));
	}

	#[test]
	fn test_clock_before_added_time_counts_as_fresh() {
		assert!(should_check(&tx(10 * MINUTE_MS, Some(1)), 2, 0));
	}
}
