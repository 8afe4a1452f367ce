//! Wallets that carry intents on-chain.
//!
//! Both kinds answer an intent with a [`SponsorshipDecision`]. The
//! conventional wallet signs and sends directly. The smart-account wallet
//! asks its relay to sponsor gas and, when allowed, falls back to a
//! self-funded operation through the same account.

use crate::dispatch::classify::classify_or;
use crate::utils::{retry, Attempt, CancelSignal, RetryError};
use async_trait::async_trait;
use relay_account::{RelayError, SmartAccountInterface};
use relay_config::SponsorshipConfig;
use relay_delivery::DeliveryService;
use relay_types::{
	networks::retry_budget, truncate_id, AccountContext, Address, ErrorKind, NetworksConfig,
	OperationRequest, RetryBudget, SecretString, SponsorshipDecision, TransactionHash,
	TransactionIntent, WalletType,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A wallet able to carry intents.
#[async_trait]
pub trait WalletInterface: Send + Sync {
	fn wallet_type(&self) -> WalletType;

	/// Sends `intent`. Never fails outright; failures are described by the
	/// returned decision.
	async fn submit(&self, intent: &TransactionIntent) -> SponsorshipDecision;
}

/// Directly signing wallet paying its own gas.
pub struct ConventionalWallet {
	delivery: Arc<DeliveryService>,
	address: Address,
}

impl ConventionalWallet {
	pub fn new(delivery: Arc<DeliveryService>, address: Address) -> Self {
		Self { delivery, address }
	}

	pub fn address(&self) -> Address {
		self.address
	}
}

#[async_trait]
impl WalletInterface for ConventionalWallet {
	fn wallet_type(&self) -> WalletType {
		WalletType::Conventional
	}

	async fn submit(&self, intent: &TransactionIntent) -> SponsorshipDecision {
		match self.delivery.deliver(intent.to_transaction()).await {
			Ok(hash) => SponsorshipDecision::success(hash, false, false),
			Err(e) => {
				let kind = classify_or(&e.to_provider_failure(), false, ErrorKind::NonRetryableRpcError);
				SponsorshipDecision::failure(kind, e.to_string(), false, false)
			},
		}
	}
}

/// Why the sponsored path did not produce a hash.
#[derive(Debug, Clone)]
enum SponsorshipFailure {
	/// Policy, credential, client or account context unavailable.
	Precondition(String),
	/// The relay refused or failed the operation.
	Relay { kind: ErrorKind, message: String },
	/// The relay reply could not be read; the operation may already be sent.
	Unconfirmed(String),
}

/// Kind recorded in a final decision. Transient issues are only retried while
/// sponsorship is still being tried; once the procedure ends they are final.
fn settled(kind: ErrorKind) -> ErrorKind {
	match kind {
		ErrorKind::TransientSponsorshipIssue => ErrorKind::NonRetryableRpcError,
		kind => kind,
	}
}

/// Contract account submitting through a smart-account relay.
pub struct SmartAccountWallet {
	account: Arc<dyn SmartAccountInterface>,
	delivery: Arc<DeliveryService>,
	networks: NetworksConfig,
	settings: SponsorshipConfig,
	credential: Option<SecretString>,
	/// Held for a whole submission so nonce reads and sends never interleave.
	submit_lock: Mutex<()>,
}

impl SmartAccountWallet {
	pub fn new(
		account: Arc<dyn SmartAccountInterface>,
		delivery: Arc<DeliveryService>,
		networks: NetworksConfig,
		settings: SponsorshipConfig,
	) -> Self {
		let credential = settings.credential().cloned();
		Self {
			account,
			delivery,
			networks,
			settings,
			credential,
			submit_lock: Mutex::new(()),
		}
	}

	fn policy_id(&self, chain_id: u64) -> Option<String> {
		self.networks
			.get(&chain_id)
			.and_then(|network| network.policy_id())
			.map(str::to_string)
	}

	/// Sender, live nonce and, for an undeployed account, its init code.
	async fn account_context(&self, chain_id: u64) -> Result<AccountContext, String> {
		let sender = self.account.address().map_err(|e| e.to_string())?;

		let lookups = async {
			tokio::try_join!(
				self.delivery.get_nonce(chain_id, sender),
				self.delivery.is_deployed(chain_id, sender),
			)
		};
		let (nonce, deployed) = tokio::time::timeout(self.settings.precondition_timeout(), lookups)
			.await
			.map_err(|_| {
				format!(
					"Account lookup timed out after {}s",
					self.settings.precondition_timeout_seconds
				)
			})?
			.map_err(|e| format!("Account lookup failed: {}", e))?;

		let init_code = if deployed {
			None
		} else {
			self.account.init_code().map_err(|e| e.to_string())?
		};

		Ok(AccountContext {
			sender,
			nonce,
			init_code,
		})
	}

	/// One operation with a freshly built context.
	async fn send(
		&self,
		intent: &TransactionIntent,
		policy_id: Option<String>,
	) -> Result<TransactionHash, SponsorshipFailure> {
		let context = self
			.account_context(intent.chain_id)
			.await
			.map_err(SponsorshipFailure::Precondition)?;
		let request = OperationRequest::from_intent(intent, policy_id, context);
		let default_kind = if request.is_sponsored() {
			ErrorKind::SponsorshipRelayRejected
		} else {
			ErrorKind::NonRetryableRpcError
		};

		self.account
			.send_operation(request)
			.await
			.map_err(|e| match e {
				RelayError::InvalidResponse(_) => SponsorshipFailure::Unconfirmed(e.to_string()),
				e => SponsorshipFailure::Relay {
					kind: classify_or(&e.to_provider_failure(), true, default_kind),
					message: e.to_string(),
				},
			})
	}

	/// Retries client initialization once, bounded by the precondition timeout.
	async fn reinitialize(&self) {
		match tokio::time::timeout(self.settings.precondition_timeout(), self.account.initialize())
			.await
		{
			Ok(Ok(())) => tracing::info!("Smart account client initialized"),
			Ok(Err(e)) => tracing::warn!(error = %e, "Smart account client still unavailable"),
			Err(_) => tracing::warn!(
				"Smart account initialization timed out after {}s",
				self.settings.precondition_timeout_seconds
			),
		}
	}

	/// Sponsored submission, silently retrying transient failures.
	async fn sponsored(&self, intent: &TransactionIntent) -> Result<TransactionHash, SponsorshipFailure> {
		let policy_id = self.policy_id(intent.chain_id).ok_or_else(|| {
			SponsorshipFailure::Precondition(format!(
				"No sponsorship policy configured for chain {}",
				intent.chain_id
			))
		})?;
		if self.credential.is_none() {
			return Err(SponsorshipFailure::Precondition(
				"No sponsorship API credential configured".into(),
			));
		}
		if !self.account.is_ready() {
			return Err(SponsorshipFailure::Precondition(
				"Smart account client is not ready".into(),
			));
		}

		let waits = retry_budget(&self.networks, intent.chain_id);
		let budget = RetryBudget::new(
			self.settings.transient_retries,
			waits.min_wait_ms,
			waits.max_wait_ms,
		);
		let policy_id = &policy_id;

		let result = retry(budget, &CancelSignal::never(), || async move {
			match self.send(intent, Some(policy_id.clone())).await {
				Ok(hash) => Ok(hash),
				Err(SponsorshipFailure::Relay {
					kind: ErrorKind::TransientSponsorshipIssue,
					message,
				}) => {
					tracing::debug!(error = %message, "Transient sponsorship failure, retrying");
					Err(Attempt::Retryable(SponsorshipFailure::Relay {
						kind: ErrorKind::TransientSponsorshipIssue,
						message,
					}))
				},
				Err(other) => Err(Attempt::Fatal(other)),
			}
		})
		.await;

		match result {
			Ok(hash) => Ok(hash),
			Err(RetryError::Exhausted(failure)) | Err(RetryError::Fatal(failure)) => Err(failure),
			Err(RetryError::Cancelled) => Err(SponsorshipFailure::Relay {
				kind: ErrorKind::NonRetryableRpcError,
				message: "Sponsored submission cancelled".into(),
			}),
		}
	}

	/// Self-funded operation after the sponsored path gave up.
	async fn fallback(
		&self,
		intent: &TransactionIntent,
		attempted: bool,
		kind: ErrorKind,
		message: String,
	) -> SponsorshipDecision {
		if !self.settings.allow_fallback {
			return SponsorshipDecision::failure(settled(kind), message, attempted, false);
		}

		tracing::info!(
			intent_id = %truncate_id(&intent.id),
			reason = %kind,
			"Falling back to self-funded operation"
		);
		match self.send(intent, None).await {
			Ok(hash) => SponsorshipDecision::success(hash, attempted, true),
			Err(SponsorshipFailure::Precondition(message)) => SponsorshipDecision::failure(
				ErrorKind::SponsorshipPreconditionFailed,
				message,
				attempted,
				true,
			),
			Err(SponsorshipFailure::Relay { kind, message }) => {
				tracing::warn!(error = %message, kind = %kind, "Fallback operation failed");
				SponsorshipDecision::failure(settled(kind), message, attempted, true)
			},
			Err(SponsorshipFailure::Unconfirmed(message)) => SponsorshipDecision::failure(
				ErrorKind::NonRetryableRpcError,
				message,
				attempted,
				true,
			),
		}
	}
}

#[async_trait]
impl WalletInterface for SmartAccountWallet {
	fn wallet_type(&self) -> WalletType {
		WalletType::SmartAccount
	}

	async fn submit(&self, intent: &TransactionIntent) -> SponsorshipDecision {
		let _guard = self.submit_lock.lock().await;

		if !self.account.is_ready() {
			self.reinitialize().await;
		}

		match self.sponsored(intent).await {
			Ok(hash) => SponsorshipDecision::success(hash, true, false),
			Err(SponsorshipFailure::Precondition(message)) => {
				let attempted = false;
				if !self.account.is_ready() {
					return SponsorshipDecision::failure(
						ErrorKind::SponsorshipPreconditionFailed,
						message,
						attempted,
						false,
					);
				}
				tracing::debug!(error = %message, "Sponsorship preconditions not met");
				self.fallback(
					intent,
					attempted,
					ErrorKind::SponsorshipPreconditionFailed,
					message,
				)
				.await
			},
			Err(SponsorshipFailure::Relay {
				kind: ErrorKind::UserRejected,
				message,
			}) => SponsorshipDecision::failure(ErrorKind::UserRejected, message, true, false),
			Err(SponsorshipFailure::Unconfirmed(message)) => {
				tracing::warn!(error = %message, "Sponsored operation outcome unknown, not falling back");
				SponsorshipDecision::failure(ErrorKind::NonRetryableRpcError, message, true, false)
			},
			Err(SponsorshipFailure::Relay { kind, message }) => {
				tracing::warn!(error = %message, kind = %kind, "Sponsored operation failed");
				self.fallback(intent, true, kind, message).await
			},
		}
	}
}
