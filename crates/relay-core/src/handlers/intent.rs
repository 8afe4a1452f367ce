//! Intent handler for dispatching user intents.
//!
//! Dispatches each intent through its wallet and tracks the resulting hash so
//! the receipt pollers follow it to confirmation.

use crate::dispatch::Dispatcher;
use crate::handlers::transaction::{TransactionError, TransactionHandler};
use relay_delivery::DeliveryService;
use relay_types::{truncate_id, SponsorshipDecision, TransactionIntent};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum IntentError {
	#[error("Chain {0} is not served by this relay")]
	UnsupportedChain(u64),
	#[error("Tracking error: {0}")]
	Tracking(#[from] TransactionError),
}

pub struct IntentHandler {
	dispatcher: Arc<Dispatcher>,
	transactions: Arc<TransactionHandler>,
	delivery: Arc<DeliveryService>,
}

impl IntentHandler {
	pub fn new(
		dispatcher: Arc<Dispatcher>,
		transactions: Arc<TransactionHandler>,
		delivery: Arc<DeliveryService>,
	) -> Self {
		Self {
			dispatcher,
			transactions,
			delivery,
		}
	}

	/// Dispatches `intent`. A failed dispatch is an `Ok` decision; errors are
	/// reserved for intents the relay cannot take at all.
	#[instrument(skip_all, fields(intent_id = %truncate_id(&intent.id)))]
	pub async fn handle(&self, intent: TransactionIntent) -> Result<SponsorshipDecision, IntentError> {
		if !self.delivery.supports(intent.chain_id) {
			return Err(IntentError::UnsupportedChain(intent.chain_id));
		}

		let decision = self.dispatcher.dispatch(&intent).await;
		if let Some(hash) = &decision.result_hash {
			self.transactions
				.register(intent.chain_id, hash.clone())
				.await?;
		}
		Ok(decision)
	}
}
