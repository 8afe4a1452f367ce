//! Relay engine tying the pollers, the dispatcher and the registry together.
//!
//! [`RelayEngine::run`] starts one receipt poller per served chain and
//! follows the event bus until shutdown. Intents and externally submitted
//! hashes enter through [`RelayEngine::submit_intent`] and
//! [`RelayEngine::track_transaction`].

pub mod event_bus;
pub mod lifecycle;

use crate::handlers::{IntentError, IntentHandler, TransactionError, TransactionHandler};
use crate::monitoring::ReceiptPoller;
use crate::state::PendingRegistry;
use crate::utils::{cancel_pair, CancelHandle};
use relay_account::SmartAccountInterface;
use relay_config::Config;
use relay_delivery::DeliveryService;
use relay_types::{
	networks::retry_budget, truncate_id, DispatchEvent, PendingTransaction, RelayEvent,
	SponsorshipDecision, TrackingEvent, TransactionHash, TransactionIntent,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
	#[error("Intent error: {0}")]
	Intent(#[from] IntentError),
	#[error("Tracking error: {0}")]
	Tracking(#[from] TransactionError),
}

/// Main relay engine.
#[derive(Clone)]
pub struct RelayEngine {
	pub(crate) config: Config,
	pub(crate) registry: Arc<PendingRegistry>,
	pub(crate) delivery: Arc<DeliveryService>,
	pub(crate) smart_account: Option<Arc<dyn SmartAccountInterface>>,
	pub(crate) event_bus: event_bus::EventBus,
	pub(crate) intent_handler: Arc<IntentHandler>,
	pub(crate) transaction_handler: Arc<TransactionHandler>,
	pub(crate) shutdown: Arc<CancelHandle>,
}

impl RelayEngine {
	pub fn new(
		config: Config,
		registry: Arc<PendingRegistry>,
		delivery: Arc<DeliveryService>,
		smart_account: Option<Arc<dyn SmartAccountInterface>>,
		event_bus: event_bus::EventBus,
		intent_handler: Arc<IntentHandler>,
		transaction_handler: Arc<TransactionHandler>,
	) -> Self {
		let (shutdown, _) = cancel_pair();
		Self {
			config,
			registry,
			delivery,
			smart_account,
			event_bus,
			intent_handler,
			transaction_handler,
			shutdown: Arc::new(shutdown),
		}
	}

	/// Runs the pollers and the event loop until [`shutdown`](Self::shutdown)
	/// is called or the process receives ctrl-c.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut events = self.event_bus.subscribe();
		let stop = self.shutdown.signal();

		let mut pollers = JoinSet::new();
		for chain_id in self.delivery.chain_ids() {
			let poller = ReceiptPoller::new(
				chain_id,
				self.delivery.clone(),
				self.registry.clone(),
				self.event_bus.clone(),
				retry_budget(&self.config.networks, chain_id),
			);
			pollers.spawn(poller.run(self.config.poller.interval(), stop.clone()));
			tracing::info!(chain_id, "Receipt poller started");
		}

		loop {
			tokio::select! {
				_ = stop.cancelled() => break,

				event = events.recv() => match event {
					Ok(event) => self.log_event(&event),
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(skipped, "Event loop lagging behind");
					},
					Err(RecvError::Closed) => break,
				},

				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Received shutdown signal");
					break;
				}
			}
		}

		self.shutdown.cancel();
		while let Some(result) = pollers.join_next().await {
			if let Err(e) = result {
				tracing::error!(error = %e, "Receipt poller failed");
			}
		}
		Ok(())
	}

	fn log_event(&self, event: &RelayEvent) {
		match event {
			RelayEvent::Tracking(TrackingEvent::Confirmed {
				chain_id,
				tx_hash,
				receipt,
			}) => {
				tracing::info!(
					chain_id,
					tx_hash = %truncate_id(&tx_hash.to_hex()),
					block_number = receipt.block_number,
					success = receipt.success,
					"Transaction confirmed"
				);
			},
			RelayEvent::Dispatch(DispatchEvent::FundingRequired { chain_id, address }) => {
				tracing::warn!(chain_id, %address, "Funding required");
			},
			RelayEvent::Dispatch(DispatchEvent::Failed {
				intent_id,
				kind,
				..
			}) => {
				tracing::info!(intent_id = %truncate_id(intent_id), kind = %kind, "Intent failed");
			},
			other => tracing::debug!(event = ?other, "Event"),
		}
	}

	/// Dispatches an intent and tracks the resulting hash.
	pub async fn submit_intent(
		&self,
		intent: TransactionIntent,
	) -> Result<SponsorshipDecision, EngineError> {
		Ok(self.intent_handler.handle(intent).await?)
	}

	/// Tracks a hash submitted outside the relay.
	pub async fn track_transaction(
		&self,
		chain_id: u64,
		hash: TransactionHash,
	) -> Result<PendingTransaction, EngineError> {
		Ok(self.transaction_handler.register(chain_id, hash).await?)
	}

	pub async fn transaction(&self, hash: &TransactionHash) -> Option<PendingTransaction> {
		self.transaction_handler.get(hash).await
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn registry(&self) -> &Arc<PendingRegistry> {
		&self.registry
	}
}
