//! Transaction delivery types.
//!
//! Hashes, receipts and the conventional transaction request submitted by
//! a directly signing wallet.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Blockchain transaction hash.
///
/// Stored as raw bytes and rendered as a 0x-prefixed hex string, which is also
/// the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// Returns the 0x-prefixed hex representation.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.0))
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

/// Error returned when a transaction hash string is not valid hex.
#[derive(Debug, thiserror::Error)]
#[error("Invalid transaction hash: {0}")]
pub struct ParseHashError(String);

impl FromStr for TransactionHash {
	type Err = ParseHashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let raw = crate::without_0x_prefix(s);
		if raw.is_empty() {
			return Err(ParseHashError("empty hash".to_string()));
		}
		// odd-length hex gets its implied leading zero
		let padded = if raw.len() % 2 == 1 {
			format!("0{}", raw)
		} else {
			raw.to_string()
		};
		hex::decode(padded)
			.map(TransactionHash)
			.map_err(|e| ParseHashError(e.to_string()))
	}
}

impl Serialize for TransactionHash {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for TransactionHash {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Transaction receipt containing execution details.
///
/// Presence of a receipt is what marks a pending transaction as confirmed; the
/// poller does not interpret the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// A transaction signed and sent directly by a conventional wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Target network.
	pub chain_id: u64,
	/// Destination address.
	pub to: Address,
	/// Pre-encoded call payload.
	pub data: Bytes,
	/// Native token amount to send.
	pub value: U256,
}
