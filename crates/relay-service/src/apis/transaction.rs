//! Transaction tracking endpoints.
//!
//! Callers that broadcast a transaction themselves register its hash here and
//! poll its status until a receipt is recorded.

use relay_core::{EngineError, RelayEngine, TransactionError};
use relay_types::{
	APIError, RegisterTransactionRequest, TransactionHash, TransactionStatusResponse,
};
use std::str::FromStr;

const HASH_LENGTH: usize = 32;

/// Handles POST /api/transactions.
pub async fn register_transaction(
	request: RegisterTransactionRequest,
	engine: &RelayEngine,
) -> Result<TransactionStatusResponse, APIError> {
	if request.hash.0.len() != HASH_LENGTH {
		return Err(APIError::BadRequest {
			error_type: "INVALID_HASH".to_string(),
			message: format!(
				"Transaction hash must be {} bytes, got {}",
				HASH_LENGTH,
				request.hash.0.len()
			),
		});
	}

	engine
		.track_transaction(request.chain_id, request.hash)
		.await
		.map(TransactionStatusResponse::from)
		.map_err(|e| match e {
			EngineError::Tracking(TransactionError::UnsupportedChain(chain_id)) => {
				APIError::BadRequest {
					error_type: "UNSUPPORTED_CHAIN".to_string(),
					message: format!("Chain {} is not served by this relay", chain_id),
				}
			},
			other => APIError::InternalServerError {
				error_type: "INTERNAL_ERROR".to_string(),
				message: other.to_string(),
			},
		})
}

/// Handles GET /api/transactions/{hash}.
pub async fn get_transaction(
	hash: &str,
	engine: &RelayEngine,
) -> Result<TransactionStatusResponse, APIError> {
	let hash = TransactionHash::from_str(hash).map_err(|e| APIError::BadRequest {
		error_type: "INVALID_HASH".to_string(),
		message: e.to_string(),
	})?;

	engine
		.transaction(&hash)
		.await
		.map(TransactionStatusResponse::from)
		.ok_or_else(|| APIError::NotFound {
			error_type: "TRANSACTION_NOT_FOUND".to_string(),
			message: format!("Transaction {} is not tracked", hash),
		})
}
