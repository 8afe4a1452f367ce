//! Intent dispatch.
//!
//! The [`Dispatcher`] hands each intent to the wallet matching its
//! `wallet_type` and reports the outcome on the event bus. Funding problems
//! of a self-funded wallet become a funding prompt; every other failure is
//! published as `Failed`, with the provider text of transient sponsorship
//! issues kept away from the user.

pub mod classify;
pub mod wallet;

pub use classify::{classify, classify_or};
pub use wallet::{ConventionalWallet, SmartAccountWallet, WalletInterface};

use crate::engine::event_bus::EventBus;
use relay_types::{
	truncate_id, Address, DispatchEvent, ErrorKind, RelayEvent, SponsorshipDecision,
	TransactionIntent, WalletType,
};
use std::sync::Arc;
use tracing::instrument;

pub struct Dispatcher {
	conventional: Arc<dyn WalletInterface>,
	smart_account: Option<Arc<dyn WalletInterface>>,
	/// Address shown in funding prompts.
	funding_address: Address,
	event_bus: EventBus,
}

impl Dispatcher {
	pub fn new(
		conventional: Arc<dyn WalletInterface>,
		smart_account: Option<Arc<dyn WalletInterface>>,
		funding_address: Address,
		event_bus: EventBus,
	) -> Self {
		Self {
			conventional,
			smart_account,
			funding_address,
			event_bus,
		}
	}

	fn wallet_for(&self, wallet_type: WalletType) -> Option<&Arc<dyn WalletInterface>> {
		match wallet_type {
			WalletType::Conventional => Some(&self.conventional),
			WalletType::SmartAccount => self.smart_account.as_ref(),
		}
	}

	/// Sends `intent` through its wallet and publishes the outcome.
	#[instrument(skip_all, fields(intent_id = %truncate_id(&intent.id), chain_id = intent.chain_id, wallet_type = ?intent.wallet_type))]
	pub async fn dispatch(&self, intent: &TransactionIntent) -> SponsorshipDecision {
		let decision = match self.wallet_for(intent.wallet_type) {
			Some(wallet) => wallet.submit(intent).await,
			None => SponsorshipDecision::failure(
				ErrorKind::SponsorshipPreconditionFailed,
				"No smart account configured",
				false,
				false,
			),
		};
		self.report(intent, &decision);
		decision
	}

	fn report(&self, intent: &TransactionIntent, decision: &SponsorshipDecision) {
		if let Some(hash) = &decision.result_hash {
			tracing::info!(
				tx_hash = %truncate_id(&hash.to_hex()),
				fallback_used = decision.fallback_used,
				"Submitted"
			);
			self.event_bus
				.publish(RelayEvent::Dispatch(DispatchEvent::Submitted {
					intent_id: intent.id.clone(),
					chain_id: intent.chain_id,
					tx_hash: hash.clone(),
					fallback_used: decision.fallback_used,
				}))
				.ok();
			return;
		}

		let kind = decision
			.error_kind
			.unwrap_or(ErrorKind::NonRetryableRpcError);
		let message = decision.error_message.clone().unwrap_or_default();

		match kind {
			ErrorKind::InsufficientGasFunds => {
				tracing::info!(address = %self.funding_address, "Wallet needs gas funds");
				self.event_bus
					.publish(RelayEvent::Dispatch(DispatchEvent::FundingRequired {
						chain_id: intent.chain_id,
						address: self.funding_address,
					}))
					.ok();
			},
			ErrorKind::TransientSponsorshipIssue => {
				tracing::debug!(error = %message, "Transient sponsorship issue");
				self.event_bus
					.publish(RelayEvent::Dispatch(DispatchEvent::Failed {
						intent_id: intent.id.clone(),
						kind,
						message: "Temporary sponsorship issue, please retry".to_string(),
					}))
					.ok();
			},
			kind => {
				tracing::warn!(kind = %kind, error = %message, "Intent failed");
				self.event_bus
					.publish(RelayEvent::Dispatch(DispatchEvent::Failed {
						intent_id: intent.id.clone(),
						kind,
						message,
					}))
					.ok();
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{drain_events, MockSmartAccount, ScriptedChain};
	use relay_account::RelayError;
	use relay_config::SponsorshipConfig;
	use relay_delivery::{DeliveryInterface, DeliveryService};
	use relay_types::{
		Bytes, NetworkConfig, NetworksConfig, ProviderFailure, RetryBudget, SecretString,
		TransactionHash,
	};
	use mockall::Sequence;
	use tokio::sync::broadcast;

	const CHAIN: u64 = 421614;

	fn signer_address() -> Address {
		Address::repeat_byte(0x5e)
	}

	fn intent(wallet_type: WalletType) -> TransactionIntent {
		TransactionIntent::new(CHAIN, Address::repeat_byte(0x11), Bytes::new(), None, wallet_type)
	}

	fn networks() -> NetworksConfig {
		let mut networks = NetworksConfig::new();
		networks.insert(
			CHAIN,
			NetworkConfig {
				rpc_url: "http://localhost:8545".into(),
				sponsorship_policy_id: Some("policy-1".into()),
				retry: Some(RetryBudget::new(0, 0, 0)),
			},
		);
		networks
	}

	/// Dispatcher whose smart account always fails with `failure` and whose
	/// conventional wallet fails the same way.
	fn failing_dispatcher(
		failure: ProviderFailure,
	) -> (Dispatcher, Arc<ScriptedChain>, broadcast::Receiver<RelayEvent>) {
		let chain = Arc::new(ScriptedChain::new(CHAIN));
		chain.set_submit_result(Err(failure.clone()));
		let delivery = Arc::new(DeliveryService::from_implementations(vec![
			chain.clone() as Arc<dyn DeliveryInterface>,
		]));

		let mut account = MockSmartAccount::new();
		account.expect_is_ready().return_const(true);
		account
			.expect_address()
			.returning(|| Ok(Address::repeat_byte(0xaa)));
		account.expect_init_code().returning(|| Ok(None));
		account.expect_send_operation().returning(move |_| {
			Err(RelayError::Rejected {
				code: failure.code.unwrap_or(-32500),
				message: failure.message.clone(),
			})
		});

		let settings = SponsorshipConfig {
			api_key: Some(SecretString::from("key")),
			allow_fallback: true,
			precondition_timeout_seconds: 15,
			transient_retries: 0,
		};
		let smart_account =
			SmartAccountWallet::new(Arc::new(account), delivery.clone(), networks(), settings);
		let conventional = ConventionalWallet::new(delivery, signer_address());

		let event_bus = EventBus::new(16);
		let events = event_bus.subscribe();
		let dispatcher = Dispatcher::new(
			Arc::new(conventional),
			Some(Arc::new(smart_account)),
			signer_address(),
			event_bus,
		);
		(dispatcher, chain, events)
	}

	fn funding_prompts(events: &[RelayEvent]) -> Vec<Address> {
		events
			.iter()
			.filter_map(|event| match event {
				RelayEvent::Dispatch(DispatchEvent::FundingRequired { address, .. }) => Some(*address),
				_ => None,
			})
			.collect()
	}

	const GAS_SHAPED: &str = "sender balance and deposit together is 0";

	#[tokio::test]
	async fn test_sponsored_wallet_never_prompts_for_funding() {
		let (dispatcher, _, mut events) = failing_dispatcher(ProviderFailure::new(Some(-32500), GAS_SHAPED));

		let decision = dispatcher.dispatch(&intent(WalletType::SmartAccount)).await;

		assert_eq!(decision.error_kind, Some(ErrorKind::NonRetryableRpcError));
		assert!(decision.fallback_used);
		let events = drain_events(&mut events);
		assert!(funding_prompts(&events).is_empty());
		assert!(matches!(
			events.as_slice(),
			[RelayEvent::Dispatch(DispatchEvent::Failed {
				kind: ErrorKind::NonRetryableRpcError,
				..
			})]
		));
	}

	#[tokio::test]
	async fn test_failed_fallback_after_rejection_is_reported() {
		let chain = Arc::new(ScriptedChain::new(CHAIN));
		let delivery = Arc::new(DeliveryService::from_implementations(vec![
			chain.clone() as Arc<dyn DeliveryInterface>,
		]));

		let mut seq = Sequence::new();
		let mut account = MockSmartAccount::new();
		account.expect_is_ready().return_const(true);
		account
			.expect_address()
			.returning(|| Ok(Address::repeat_byte(0xaa)));
		account.expect_init_code().returning(|| Ok(None));
		account
			.expect_send_operation()
			.withf(|request| request.is_sponsored())
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| {
				Err(RelayError::Rejected {
					code: -32501,
					message: "policy limit exceeded".into(),
				})
			});
		account
			.expect_send_operation()
			.withf(|request| !request.is_sponsored())
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| {
				Err(RelayError::Rejected {
					code: -32000,
					message: "insufficient funds for gas * price + value".into(),
				})
			});

		let settings = SponsorshipConfig {
			api_key: Some(SecretString::from("key")),
			allow_fallback: true,
			precondition_timeout_seconds: 15,
			transient_retries: 0,
		};
		let smart_account =
			SmartAccountWallet::new(Arc::new(account), delivery.clone(), networks(), settings);
		let event_bus = EventBus::new(16);
		let mut events = event_bus.subscribe();
		let dispatcher = Dispatcher::new(
			Arc::new(ConventionalWallet::new(delivery, signer_address())),
			Some(Arc::new(smart_account)),
			signer_address(),
			event_bus,
		);

		let decision = dispatcher.dispatch(&intent(WalletType::SmartAccount)).await;

		assert!(!decision.succeeded);
		assert!(decision.attempted);
		assert!(decision.fallback_used);
		assert_eq!(decision.error_kind, Some(ErrorKind::NonRetryableRpcError));
		let events = drain_events(&mut events);
		assert!(funding_prompts(&events).is_empty());
		assert!(matches!(
			events.as_slice(),
			[RelayEvent::Dispatch(DispatchEvent::Failed {
				kind: ErrorKind::NonRetryableRpcError,
				message,
				..
			})] if message.contains("insufficient funds")
		));
	}

	#[tokio::test]
	async fn test_conventional_wallet_prompts_with_own_address() {
		let (dispatcher, chain, mut events) = failing_dispatcher(ProviderFailure::message(GAS_SHAPED));

		let decision = dispatcher.dispatch(&intent(WalletType::Conventional)).await;

		assert_eq!(decision.error_kind, Some(ErrorKind::InsufficientGasFunds));
		assert_eq!(chain.submitted().len(), 1);
		assert_eq!(
			funding_prompts(&drain_events(&mut events)),
			vec![signer_address()]
		);
	}

	#[tokio::test]
	async fn test_user_rejection_is_reported_plainly() {
		for wallet_type in [WalletType::Conventional, WalletType::SmartAccount] {
			let (dispatcher, _, mut events) =
				failing_dispatcher(ProviderFailure::new(Some(4001), "insufficient funds for gas"));

			let decision = dispatcher.dispatch(&intent(wallet_type)).await;

			assert_eq!(decision.error_kind, Some(ErrorKind::UserRejected));
			let events = drain_events(&mut events);
			assert!(funding_prompts(&events).is_empty());
			assert!(matches!(
				events.as_slice(),
				[RelayEvent::Dispatch(DispatchEvent::Failed {
					kind: ErrorKind::UserRejected,
					..
				})]
			));
		}
	}

	#[tokio::test]
	async fn test_success_publishes_submitted() {
		let (dispatcher, chain, mut events) = failing_dispatcher(ProviderFailure::message("unused"));
		chain.set_submit_result(Ok(TransactionHash(vec![0x0d; 32])));

		let intent = intent(WalletType::Conventional);
		let decision = dispatcher.dispatch(&intent).await;
		assert!(decision.succeeded);

		match drain_events(&mut events).as_slice() {
			[RelayEvent::Dispatch(DispatchEvent::Submitted {
				intent_id,
				tx_hash,
				fallback_used,
				..
			})] => {
				assert_eq!(intent_id, &intent.id);
				assert_eq!(tx_hash, &TransactionHash(vec![0x0d; 32]));
				assert!(!fallback_used);
			},
			other => panic!("unexpected events: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_smart_account_intent_without_smart_account() {
		let chain = Arc::new(ScriptedChain::new(CHAIN));
		let delivery = Arc::new(DeliveryService::from_implementations(vec![
			chain.clone() as Arc<dyn DeliveryInterface>,
		]));
		let event_bus = EventBus::new(16);
		let mut events = event_bus.subscribe();
		let dispatcher = Dispatcher::new(
			Arc::new(ConventionalWallet::new(delivery, signer_address())),
			None,
			signer_address(),
			event_bus,
		);

		let decision = dispatcher.dispatch(&intent(WalletType::SmartAccount)).await;

		assert_eq!(
			decision.error_kind,
			Some(ErrorKind::SponsorshipPreconditionFailed)
		);
		assert!(!decision.attempted);
		assert!(chain.submitted().is_empty());
		assert_eq!(drain_events(&mut events).len(), 1);
	}
}
