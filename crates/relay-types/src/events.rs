//! Event types for inter-service communication.
//!
//! The poller and dispatcher report outcomes as events on the engine's event
//! bus instead of invoking callbacks. Consumers (the engine's registry updater,
//! API layers, tests) subscribe and react.

use crate::{Address, ErrorKind, TransactionHash, TransactionReceipt};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all relay events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelayEvent {
	/// Events from receipt tracking.
	Tracking(TrackingEvent),
	/// Events from intent dispatch.
	Dispatch(DispatchEvent),
}

/// Events related to receipt tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackingEvent {
	/// A hash was added to the registry.
	Registered {
		chain_id: u64,
		tx_hash: TransactionHash,
	},
	/// A check ran out of retries without finding a receipt.
	Checked {
		chain_id: u64,
		tx_hash: TransactionHash,
		block_number: u64,
	},
	/// A receipt was found.
	Confirmed {
		chain_id: u64,
		tx_hash: TransactionHash,
		receipt: TransactionReceipt,
	},
}

/// Events related to intent dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchEvent {
	/// An intent produced a transaction hash.
	Submitted {
		intent_id: String,
		chain_id: u64,
		tx_hash: TransactionHash,
		fallback_used: bool,
	},
	/// A self-funded wallet needs native token for gas.
	FundingRequired { chain_id: u64, address: Address },
	/// An intent failed with a user-visible error.
	Failed {
		intent_id: String,
		kind: ErrorKind,
		message: String,
	},
}
