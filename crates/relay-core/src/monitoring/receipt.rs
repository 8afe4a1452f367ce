//! Per-chain receipt poller.
//!
//! Each tick reads the chain head, snapshots the chain's pending entries and,
//! when either changed since the previous tick, replaces the previous tick's
//! checks with fresh ones for every due transaction. A check looks up the
//! receipt with bounded retries, applies the outcome to the registry and
//! publishes it only if the registry accepted it.

use crate::engine::event_bus::EventBus;
use crate::monitoring::policy::should_check;
use crate::state::PendingRegistry;
use crate::utils::{cancel_pair, retry, Attempt, CancelHandle, CancelSignal, RetryError};
use relay_delivery::{DeliveryError, DeliveryService};
use relay_types::{
	current_timestamp_ms, truncate_id, RelayEvent, RetryBudget, TrackingEvent, TransactionHash,
	TransactionReceipt,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

#[derive(Debug, Error)]
enum LookupError {
	#[error("Receipt not available yet")]
	NotMined,
	#[error(transparent)]
	Rpc(#[from] DeliveryError),
}

/// Inputs a tick's checks depend on.
#[derive(Debug, PartialEq, Eq)]
struct TickKey {
	block_number: u64,
	hashes: Vec<TransactionHash>,
}

/// What a single check needs, cloned into its task.
#[derive(Clone)]
struct ReceiptCheck {
	chain_id: u64,
	delivery: Arc<DeliveryService>,
	registry: Arc<PendingRegistry>,
	event_bus: EventBus,
	budget: RetryBudget,
}

impl ReceiptCheck {
	#[instrument(skip_all, fields(chain_id = self.chain_id, tx_hash = %truncate_id(&hash.to_hex())))]
	async fn run(self, hash: TransactionHash, block_number: u64, cancel: CancelSignal) {
		let result = {
			let delivery = &self.delivery;
			let hash = &hash;
			let chain_id = self.chain_id;
			retry(self.budget, &cancel, || async move {
				match delivery.get_receipt(hash, chain_id).await {
					Ok(Some(receipt)) => Ok(receipt),
					Ok(None) => Err(Attempt::Retryable(LookupError::NotMined)),
					Err(e) => Err(Attempt::Fatal(LookupError::Rpc(e))),
				}
			})
			.await
		};

		if cancel.is_cancelled() {
			tracing::debug!("Check cancelled");
			return;
		}

		match result {
			Ok(receipt) => self.confirm(hash, receipt).await,
			Err(RetryError::Exhausted(_)) => self.record_check(hash, block_number).await,
			Err(RetryError::Fatal(e)) => {
				tracing::warn!(error = %e, "Receipt lookup failed; transaction stays pending");
			},
			Err(RetryError::Cancelled) => {
				tracing::debug!("Check cancelled");
			},
		}
	}

	async fn confirm(&self, hash: TransactionHash, receipt: TransactionReceipt) {
		if !self.registry.mark_confirmed(&hash, receipt.clone()).await {
			return;
		}
		tracing::info!(
			block_number = receipt.block_number,
			success = receipt.success,
			"Confirmed"
		);
		self.event_bus
			.publish(RelayEvent::Tracking(TrackingEvent::Confirmed {
				chain_id: self.chain_id,
				tx_hash: hash,
				receipt,
			}))
			.ok();
	}

	async fn record_check(&self, hash: TransactionHash, block_number: u64) {
		if !self.registry.mark_checked(&hash, block_number).await {
			return;
		}
		tracing::debug!(block_number, "Not mined yet");
		self.event_bus
			.publish(RelayEvent::Tracking(TrackingEvent::Checked {
				chain_id: self.chain_id,
				tx_hash: hash,
				block_number,
			}))
			.ok();
	}
}

/// Receipt poller for one chain.
pub struct ReceiptPoller {
	check: ReceiptCheck,
	in_flight: JoinSet<()>,
	handles: Vec<CancelHandle>,
	last_key: Option<TickKey>,
}

impl ReceiptPoller {
	pub fn new(
		chain_id: u64,
		delivery: Arc<DeliveryService>,
		registry: Arc<PendingRegistry>,
		event_bus: EventBus,
		budget: RetryBudget,
	) -> Self {
		Self {
			check: ReceiptCheck {
				chain_id,
				delivery,
				registry,
				event_bus,
				budget,
			},
			in_flight: JoinSet::new(),
			handles: Vec::new(),
			last_key: None,
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.check.chain_id
	}

	/// Checks started and not yet joined.
	pub fn in_flight(&self) -> usize {
		self.in_flight.len()
	}

	/// Runs one tick against the current chain head. Returns the number of
	/// checks started; a failed head lookup skips the tick.
	pub async fn tick(&mut self) -> usize {
		let block_number = match self.check.delivery.get_block_number(self.check.chain_id).await {
			Ok(block_number) => block_number,
			Err(e) => {
				tracing::warn!(
					chain_id = self.check.chain_id,
					error = %e,
					"Failed to read block number; skipping tick"
				);
				return 0;
			},
		};
		self.tick_at(block_number, current_timestamp_ms()).await
	}

	/// Runs one tick as if the chain head were `block_number` at `now_ms`.
	pub async fn tick_at(&mut self, block_number: u64, now_ms: u64) -> usize {
		self.reap();

		let pending = self.check.registry.pending_for_chain(self.check.chain_id).await;
		let key = TickKey {
			block_number,
			hashes: pending.iter().map(|tx| tx.hash.clone()).collect(),
		};
		if self.last_key.as_ref() == Some(&key) {
			return 0;
		}

		self.cancel_all().await;
		self.last_key = Some(key);

		let mut started = 0;
		for tx in pending
			.into_iter()
			.filter(|tx| should_check(tx, block_number, now_ms))
		{
			let (handle, signal) = cancel_pair();
			self.handles.push(handle);
			self.in_flight
				.spawn(self.check.clone().run(tx.hash, block_number, signal));
			started += 1;
		}

		if started > 0 {
			tracing::debug!(
				chain_id = self.check.chain_id,
				block_number,
				started,
				"Started receipt checks"
			);
		}
		started
	}

	/// Cancels every in-flight check and waits until all have stopped.
	pub async fn cancel_all(&mut self) {
		for handle in self.handles.drain(..) {
			handle.cancel();
		}
		while let Some(result) = self.in_flight.join_next().await {
			log_join_error(result);
		}
	}

	/// Waits for in-flight checks to finish on their own.
	pub async fn settle(&mut self) {
		while let Some(result) = self.in_flight.join_next().await {
			log_join_error(result);
		}
		self.handles.clear();
	}

	fn reap(&mut self) {
		while let Some(result) = self.in_flight.try_join_next() {
			log_join_error(result);
		}
	}

	/// Ticks every `interval` until `shutdown` fires, then cancels whatever
	/// is still in flight.
	#[instrument(skip_all, fields(chain_id = self.check.chain_id))]
	pub async fn run(mut self, interval: Duration, shutdown: CancelSignal) {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = shutdown.cancelled() => break,
				_ = ticker.tick() => {
					self.tick().await;
				}
			}
		}

		self.cancel_all().await;
		tracing::info!("Receipt poller stopped");
	}
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
	if let Err(e) = result {
		if e.is_panic() {
			tracing::error!(error = %e, "Receipt check panicked");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{drain_events, Lookup, ScriptedChain};
	use relay_delivery::DeliveryInterface;
	use tokio::sync::broadcast;

	const CHAIN: u64 = 42161;
	const MINUTE_MS: u64 = 60_000;

	struct Harness {
		chain: Arc<ScriptedChain>,
		registry: Arc<PendingRegistry>,
		events: broadcast::Receiver<RelayEvent>,
		poller: ReceiptPoller,
	}

	fn harness(budget: RetryBudget) -> Harness {
		let chain = Arc::new(ScriptedChain::new(CHAIN));
		let delivery = Arc::new(DeliveryService::from_implementations(vec![
			chain.clone() as Arc<dyn DeliveryInterface>,
		]));
		let registry = Arc::new(PendingRegistry::new());
		let event_bus = EventBus::new(64);
		let events = event_bus.subscribe();
		let poller = ReceiptPoller::new(CHAIN, delivery, registry.clone(), event_bus, budget);
		Harness {
			chain,
			registry,
			events,
			poller,
		}
	}

	fn hash(byte: u8) -> TransactionHash {
		TransactionHash(vec![byte; 32])
	}

	fn confirmed(events: &[RelayEvent]) -> Vec<TransactionHash> {
		events
			.iter()
			.filter_map(|event| match event {
				RelayEvent::Tracking(TrackingEvent::Confirmed { tx_hash, .. }) => Some(tx_hash.clone()),
				_ => None,
			})
			.collect()
	}

	fn checked(events: &[RelayEvent]) -> Vec<(TransactionHash, u64)> {
		events
			.iter()
			.filter_map(|event| match event {
				RelayEvent::Tracking(TrackingEvent::Checked {
					tx_hash,
					block_number,
					..
				}) => Some((tx_hash.clone(), *block_number)),
				_ => None,
			})
			.collect()
	}

	#[tokio::test(start_paused = true)]
	async fn test_flaky_lookup_confirms_exactly_once() {
		let mut h = harness(RetryBudget::new(10, 10, 20));
		h.registry.register(CHAIN, hash(1), 0).await;
		h.chain
			.script(&hash(1), [Lookup::NotMined, Lookup::NotMined, Lookup::Found]);

		assert_eq!(h.poller.tick_at(100, MINUTE_MS).await, 1);
		h.poller.settle().await;

		let events = drain_events(&mut h.events);
		assert_eq!(confirmed(&events), vec![hash(1)]);
		assert!(checked(&events).is_empty());
		assert_eq!(h.chain.lookups(&hash(1)), 3);
		assert!(h.registry.get(&hash(1)).await.unwrap().is_confirmed());
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirmed_transactions_are_not_polled() {
		let mut h = harness(RetryBudget::new(3, 0, 0));
		h.registry.register(CHAIN, hash(1), 0).await;
		h.chain.script(&hash(1), [Lookup::Found]);

		h.poller.tick_at(100, 0).await;
		h.poller.settle().await;
		assert_eq!(h.chain.lookups(&hash(1)), 1);

		for block in 101..120 {
			assert_eq!(h.poller.tick_at(block, 0).await, 0);
		}
		h.poller.settle().await;
		assert_eq!(h.chain.lookups(&hash(1)), 1);
		assert_eq!(confirmed(&drain_events(&mut h.events)).len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_exhausted_lookup_records_check() {
		let mut h = harness(RetryBudget::new(2, 5, 5));
		h.registry.register(CHAIN, hash(1), 0).await;

		h.poller.tick_at(100, 0).await;
		h.poller.settle().await;

		let events = drain_events(&mut h.events);
		assert_eq!(checked(&events), vec![(hash(1), 100)]);
		assert!(confirmed(&events).is_empty());
		assert_eq!(h.chain.lookups(&hash(1)), 3);
		assert_eq!(
			h.registry.get(&hash(1)).await.unwrap().last_checked_block_number,
			Some(100)
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_rpc_error_leaves_transaction_pending() {
		let mut h = harness(RetryBudget::new(5, 0, 0));
		h.registry.register(CHAIN, hash(1), 0).await;
		h.chain.script(&hash(1), [Lookup::Fail(-32603)]);

		h.poller.tick_at(100, 0).await;
		h.poller.settle().await;

		assert!(drain_events(&mut h.events).is_empty());
		assert_eq!(h.chain.lookups(&hash(1)), 1);
		let tx = h.registry.get(&hash(1)).await.unwrap();
		assert!(!tx.is_confirmed());
		assert_eq!(tx.last_checked_block_number, None);

		// picked up again on the next block
		h.chain.script(&hash(1), [Lookup::Found]);
		assert_eq!(h.poller.tick_at(101, 0).await, 1);
		h.poller.settle().await;
		assert_eq!(confirmed(&drain_events(&mut h.events)), vec![hash(1)]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_unchanged_inputs_keep_checks_running() {
		let mut h = harness(RetryBudget::new(1, 0, 0));
		h.registry.register(CHAIN, hash(1), 0).await;
		h.chain.script(&hash(1), [Lookup::Hang]);

		assert_eq!(h.poller.tick_at(100, 0).await, 1);
		tokio::time::sleep(Duration::from_millis(1)).await;
		assert_eq!(h.poller.tick_at(100, 0).await, 0);
		assert_eq!(h.poller.in_flight(), 1);
		assert_eq!(h.chain.lookups(&hash(1)), 1);

		h.poller.cancel_all().await;
		assert!(drain_events(&mut h.events).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_new_block_cancels_stale_checks() {
		let mut h = harness(RetryBudget::new(1, 1000, 1000));
		h.registry.register(CHAIN, hash(1), 0).await;
		h.registry.register(CHAIN, hash(2), 0).await;
		h.chain.script(&hash(2), [Lookup::Hang]);

		assert_eq!(h.poller.tick_at(100, 0).await, 2);
		// hash 1 is waiting to retry, hash 2 is stuck in its lookup
		tokio::time::sleep(Duration::from_millis(10)).await;

		h.chain.script(&hash(2), [Lookup::NotMined]);
		assert_eq!(h.poller.tick_at(101, 0).await, 2);
		h.poller.settle().await;

		let mut checks = checked(&drain_events(&mut h.events));
		checks.sort();
		assert_eq!(checks, vec![(hash(1), 101), (hash(2), 101)]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancelled_checks_report_nothing() {
		let mut h = harness(RetryBudget::new(3, 1000, 1000));
		for byte in 1..=3 {
			h.registry.register(CHAIN, hash(byte), 0).await;
		}
		h.chain.script(&hash(3), [Lookup::Hang]);

		assert_eq!(h.poller.tick_at(100, 0).await, 3);
		tokio::time::sleep(Duration::from_millis(10)).await;
		h.poller.cancel_all().await;

		assert_eq!(h.poller.in_flight(), 0);
		assert!(drain_events(&mut h.events).is_empty());
		for tx in h.registry.all().await {
			assert_eq!(tx.last_checked_block_number, None);
			assert!(!tx.is_confirmed());
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_aged_transactions_polled_sparsely() {
		let mut h = harness(RetryBudget::new(0, 0, 0));
		h.registry.register(CHAIN, hash(1), 0).await;

		let now = 90 * MINUTE_MS;
		let mut started_at = Vec::new();
		for block in 100..=125 {
			if h.poller.tick_at(block, now).await > 0 {
				started_at.push(block);
			}
			h.poller.settle().await;
		}
		assert_eq!(started_at, vec![100, 110, 120]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_head_lookup_skips_tick() {
		let mut h = harness(RetryBudget::new(1, 0, 0));
		h.registry.register(CHAIN, hash(1), 0).await;
		h.chain.fail_block_number();

		assert_eq!(h.poller.tick().await, 0);
		assert_eq!(h.chain.lookups(&hash(1)), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_stops_on_shutdown() {
		let h = harness(RetryBudget::new(0, 0, 0));
		h.chain.set_block(7);
		h.registry.register(CHAIN, hash(1), current_timestamp_ms()).await;

		let (handle, signal) = cancel_pair();
		let task = tokio::spawn(h.poller.run(Duration::from_secs(4), signal));
		tokio::time::sleep(Duration::from_secs(1)).await;
		handle.cancel();
		task.await.unwrap();

		assert_eq!(h.chain.lookups(&hash(1)), 1);
		assert_eq!(
			h.registry.get(&hash(1)).await.unwrap().last_checked_block_number,
			Some(7)
		);
	}
}
