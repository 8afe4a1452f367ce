//! User-facing error taxonomy.
//!
//! Every failure that leaves the relay is reduced to one of these kinds. The
//! kind decides how the caller presents it: silently absorbed, surfaced as a
//! funding prompt, or shown as a plain error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a relay failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	/// Receipt not yet available. Drives polling retries, never surfaced.
	RetryableNotFound,
	/// Malformed request, network outage or any other RPC failure.
	NonRetryableRpcError,
	/// Missing policy, missing credential or unready smart-account client.
	SponsorshipPreconditionFailed,
	/// The sponsorship relay explicitly refused the operation.
	SponsorshipRelayRejected,
	/// A self-funded wallet lacks native token for gas.
	InsufficientGasFunds,
	/// The wallet lacks the asset being moved.
	InsufficientTokenBalance,
	/// Gas-shaped failure on a sponsored wallet; retried while sponsorship is tried.
	TransientSponsorshipIssue,
	/// The user declined to sign.
	UserRejected,
}

impl ErrorKind {
	/// Whether this kind should be presented to the user at all.
	pub fn is_user_visible(&self) -> bool {
		!matches!(
			self,
			ErrorKind::RetryableNotFound | ErrorKind::TransientSponsorshipIssue
		)
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ErrorKind::RetryableNotFound => "RETRYABLE_NOT_FOUND",
			ErrorKind::NonRetryableRpcError => "NON_RETRYABLE_RPC_ERROR",
			ErrorKind::SponsorshipPreconditionFailed => "SPONSORSHIP_PRECONDITION_FAILED",
			ErrorKind::SponsorshipRelayRejected => "SPONSORSHIP_RELAY_REJECTED",
			ErrorKind::InsufficientGasFunds => "INSUFFICIENT_GAS_FUNDS",
			ErrorKind::InsufficientTokenBalance => "INSUFFICIENT_TOKEN_BALANCE",
			ErrorKind::TransientSponsorshipIssue => "TRANSIENT_SPONSORSHIP_ISSUE",
			ErrorKind::UserRejected => "USER_REJECTED",
		};
		f.write_str(name)
	}
}

/// Raw failure reported by an RPC node, wallet or relay.
///
/// `code` carries the structured JSON-RPC / EIP-1193 error code when the
/// upstream provided one; `message` is the provider's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
	pub code: Option<i64>,
	pub message: String,
}

impl ProviderFailure {
	pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}

	/// Failure without a structured code.
	pub fn message(message: impl Into<String>) -> Self {
		Self::new(None, message)
	}
}

impl fmt::Display for ProviderFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.code {
			Some(code) => write!(f, "[{}] {}", code, self.message),
			None => f.write_str(&self.message),
		}
	}
}
