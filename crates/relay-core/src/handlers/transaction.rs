//! Transaction handler for adding submitted hashes to the registry.
//!
//! Hashes arrive from the intent path or from callers that submitted the
//! transaction themselves. Each is tracked once; the receipt pollers pick it
//! up on their next tick.

use crate::engine::event_bus::EventBus;
use crate::state::PendingRegistry;
use relay_delivery::DeliveryService;
use relay_types::{
	current_timestamp_ms, truncate_id, PendingTransaction, RelayEvent, TrackingEvent,
	TransactionHash,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum TransactionError {
	#[error("Chain {0} is not served by this relay")]
	UnsupportedChain(u64),
	#[error("State error: {0}")]
	State(String),
}

pub struct TransactionHandler {
	registry: Arc<PendingRegistry>,
	delivery: Arc<DeliveryService>,
	event_bus: EventBus,
}

impl TransactionHandler {
	pub fn new(
		registry: Arc<PendingRegistry>,
		delivery: Arc<DeliveryService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			registry,
			delivery,
			event_bus,
		}
	}

	/// Tracks `hash` on `chain_id` and returns its entry. Registering a hash
	/// twice returns the existing entry without publishing again.
	#[instrument(skip_all, fields(chain_id = chain_id, tx_hash = %truncate_id(&hash.to_hex())))]
	pub async fn register(
		&self,
		chain_id: u64,
		hash: TransactionHash,
	) -> Result<PendingTransaction, TransactionError> {
		if !self.delivery.supports(chain_id) {
			return Err(TransactionError::UnsupportedChain(chain_id));
		}

		if self
			.registry
			.register(chain_id, hash.clone(), current_timestamp_ms())
			.await
		{
			tracing::info!("Tracking transaction");
			self.event_bus
				.publish(RelayEvent::Tracking(TrackingEvent::Registered {
					chain_id,
					tx_hash: hash.clone(),
				}))
				.ok();
		}

		self.registry.get(&hash).await.ok_or_else(|| {
			TransactionError::State(format!("Transaction {} vanished from registry", hash))
		})
	}

	pub async fn get(&self, hash: &TransactionHash) -> Option<PendingTransaction> {
		self.registry.get(hash).await
	}
}
