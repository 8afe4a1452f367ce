//! Intent submission endpoint.

use relay_core::{EngineError, IntentError, RelayEngine};
use relay_types::{
	APIError, SponsorshipDecision, SubmitIntentRequest, TransactionIntent,
};

/// Handles POST /api/intents.
///
/// Every dispatched intent answers with its decision, successful or not, so
/// `attempted` and `fallback_used` reach the caller. Kinds that are never shown
/// to users get a generic retry message instead of the provider text.
pub async fn submit_intent(
	request: SubmitIntentRequest,
	engine: &RelayEngine,
) -> Result<SponsorshipDecision, APIError> {
	let intent = TransactionIntent::new(
		request.chain_id,
		request.target,
		request.data,
		request.value,
		request.wallet_type,
	);

	let mut decision = engine.submit_intent(intent).await.map_err(|e| match e {
		EngineError::Intent(IntentError::UnsupportedChain(chain_id)) => APIError::BadRequest {
			error_type: "UNSUPPORTED_CHAIN".to_string(),
			message: format!("Chain {} is not served by this relay", chain_id),
		},
		other => APIError::InternalServerError {
			error_type: "INTERNAL_ERROR".to_string(),
			message: other.to_string(),
		},
	})?;

	if decision
		.error_kind
		.is_some_and(|kind| !kind.is_user_visible())
	{
		decision.error_message = Some("Temporary sponsorship issue, please retry".to_string());
	}
	Ok(decision)
}
