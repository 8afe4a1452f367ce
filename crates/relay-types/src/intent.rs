//! Transaction intents and sponsorship decisions.
//!
//! An intent is created per user action and consumed once by the dispatcher.
//! The dispatcher answers with a [`SponsorshipDecision`] describing which path
//! was taken and how it ended.

use crate::{ErrorKind, TransactionHash};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Kind of wallet that will carry an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletType {
	/// Externally owned account signing its own transactions.
	Conventional,
	/// Contract account whose operations may be gas-sponsored.
	SmartAccount,
}

/// A contract call requested by the user.
///
/// `data` is already ABI-encoded by the caller and is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
	/// Correlation id used in logs and events.
	pub id: String,
	pub chain_id: u64,
	pub target: Address,
	pub data: Bytes,
	pub value: Option<U256>,
	pub wallet_type: WalletType,
}

impl TransactionIntent {
	/// Creates an intent with a fresh correlation id.
	pub fn new(
		chain_id: u64,
		target: Address,
		data: Bytes,
		value: Option<U256>,
		wallet_type: WalletType,
	) -> Self {
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			chain_id,
			target,
			data,
			value,
			wallet_type,
		}
	}

	/// Converts the intent into a conventional signed transaction request.
	pub fn to_transaction(&self) -> crate::Transaction {
		crate::Transaction {
			chain_id: self.chain_id,
			to: self.target,
			data: self.data.clone(),
			value: self.value.unwrap_or_default(),
		}
	}
}

/// Factory call needed to deploy a smart account on its first operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitCode {
	pub factory: Address,
	pub factory_data: Bytes,
}

/// On-chain context of a smart account for one operation.
///
/// Built fresh for every submission; the nonce is never reused across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountContext {
	pub sender: Address,
	pub nonce: u64,
	/// Present only while the account has no code on-chain.
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub init_code: Option<InitCode>,
}

/// Operation handed to a smart-account relay.
///
/// With a `policy_id` the relay is asked to sponsor gas; without one the
/// account pays for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
	pub chain_id: u64,
	pub target: Address,
	pub data: Bytes,
	pub value: U256,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub policy_id: Option<String>,
	pub account: AccountContext,
}

impl OperationRequest {
	pub fn from_intent(
		intent: &TransactionIntent,
		policy_id: Option<String>,
		account: AccountContext,
	) -> Self {
		Self {
			chain_id: intent.chain_id,
			target: intent.target,
			data: intent.data.clone(),
			value: intent.value.unwrap_or_default(),
			policy_id,
			account,
		}
	}

	pub fn is_sponsored(&self) -> bool {
		self.policy_id.is_some()
	}
}

/// Outcome of dispatching one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipDecision {
	/// Whether the sponsored relay path was tried.
	pub attempted: bool,
	pub succeeded: bool,
	/// Whether the hash came from the self-funded fallback.
	pub fallback_used: bool,
	pub result_hash: Option<TransactionHash>,
	pub error_kind: Option<ErrorKind>,
	pub error_message: Option<String>,
}

impl SponsorshipDecision {
	pub fn success(hash: TransactionHash, attempted: bool, fallback_used: bool) -> Self {
		Self {
			attempted,
			succeeded: true,
			fallback_used,
			result_hash: Some(hash),
			error_kind: None,
			error_message: None,
		}
	}

	pub fn failure(
		kind: ErrorKind,
		message: impl Into<String>,
		attempted: bool,
		fallback_used: bool,
	) -> Self {
		Self {
			attempted,
			succeeded: false,
			fallback_used,
			result_hash: None,
			error_kind: Some(kind),
			error_message: Some(message.into()),
		}
	}
}
