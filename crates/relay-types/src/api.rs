//! API types for the relay HTTP API.
//!
//! Request and response bodies for transaction tracking and intent
//! submission, plus the shared error body.

use crate::{PendingTransaction, TransactionHash, TransactionReceipt, WalletType};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request to track a transaction submitted outside the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTransactionRequest {
	pub chain_id: u64,
	pub hash: TransactionHash,
}

/// Request to dispatch a contract call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitIntentRequest {
	pub chain_id: u64,
	pub target: Address,
	pub data: Bytes,
	#[serde(default)]
	pub value: Option<U256>,
	pub wallet_type: WalletType,
}

/// Tracking status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
	Pending,
	Confirmed,
	Reverted,
}

/// A tracked transaction as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusResponse {
	pub hash: TransactionHash,
	pub chain_id: u64,
	pub status: TransactionStatus,
	pub added_time: u64,
	pub last_checked_block_number: Option<u64>,
	pub receipt: Option<TransactionReceipt>,
}

impl From<PendingTransaction> for TransactionStatusResponse {
	fn from(tx: PendingTransaction) -> Self {
		let status = match &tx.receipt {
			None => TransactionStatus::Pending,
			Some(receipt) if receipt.success => TransactionStatus::Confirmed,
			Some(_) => TransactionStatus::Reverted,
		};
		Self {
			hash: tx.hash,
			chain_id: tx.chain_id,
			status,
			added_time: tx.added_time,
			last_checked_block_number: tx.last_checked_block_number,
			receipt: tx.receipt,
		}
	}
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

/// API error with its HTTP status.
#[derive(Debug, Clone)]
pub enum APIError {
	/// 400
	BadRequest { error_type: String, message: String },
	/// 404
	NotFound { error_type: String, message: String },
	/// 422
	UnprocessableEntity { error_type: String, message: String },
	/// 500
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let body = self.to_error_response();
		write!(f, "{} ({}): {}", body.error, self.status_code(), body.message)
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
