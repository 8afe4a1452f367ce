//! Maps raw provider failures onto [`ErrorKind`].
//!
//! The user-rejection code wins over any message text. Funding problems are
//! recognised from the message, and bundler rejection codes apply only when
//! no message rule matched.
//!
//! A gas-shaped failure on a sponsored wallet is never reported as missing
//! gas funds; it becomes a transient sponsorship issue. A generic
//! "insufficient funds" on a sponsored wallet refers to the asset being moved.

use relay_types::{ErrorKind, ProviderFailure};

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

/// Bundler and paymaster rejections (ERC-7769).
const RELAY_REJECTION_CODES: [i64; 3] = [-32501, -32504, -32505];

const USER_REJECTION_PHRASES: [&str; 4] = [
	"user rejected",
	"user denied",
	"rejected by user",
	"user cancelled",
];

const GAS_PHRASES: [&str; 5] = [
	"aa21",
	"sender balance and deposit together is",
	"insufficient funds for gas",
	"insufficient funds for intrinsic transaction cost",
	"gas required exceeds allowance",
];

const TOKEN_PHRASES: [&str; 2] = ["transfer amount exceeds balance", "insufficient balance"];

fn mentions(message: &str, phrases: &[&str]) -> bool {
	phrases.iter().any(|phrase| message.contains(phrase))
}

/// Classifies `failure` for a wallet that is (`sponsored`) or is not gas
/// sponsored. `None` means no rule matched and the caller picks the default
/// for its path.
pub fn classify(failure: &ProviderFailure, sponsored: bool) -> Option<ErrorKind> {
	let message = failure.message.to_lowercase();

	if failure.code == Some(USER_REJECTED_CODE) || mentions(&message, &USER_REJECTION_PHRASES) {
		return Some(ErrorKind::UserRejected);
	}

	if mentions(&message, &GAS_PHRASES) {
		return Some(if sponsored {
			ErrorKind::TransientSponsorshipIssue
		} else {
			ErrorKind::InsufficientGasFunds
		});
	}

	if mentions(&message, &TOKEN_PHRASES) {
		return Some(ErrorKind::InsufficientTokenBalance);
	}

	if message.contains("insufficient funds") {
		return Some(if sponsored {
			ErrorKind::InsufficientTokenBalance
		} else {
			ErrorKind::InsufficientGasFunds
		});
	}

	if failure
		.code
		.is_some_and(|code| RELAY_REJECTION_CODES.contains(&code))
	{
		return Some(ErrorKind::SponsorshipRelayRejected);
	}

	None
}

/// [`classify`] with a fallback kind for unmatched failures.
pub fn classify_or(failure: &ProviderFailure, sponsored: bool, default: ErrorKind) -> ErrorKind {
	classify(failure, sponsored).unwrap_or(default)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn text(message: &str) -> ProviderFailure {
		ProviderFailure::message(message)
	}

	#[test]
	fn test_user_rejection_is_never_reinterpreted() {
		let failures = [
			ProviderFailure::new(Some(4001), "insufficient funds for gas"),
			text("User rejected the request."),
			text("MetaMask Tx Signature: User denied transaction signature."),
			ProviderFailure::new(Some(-32501), "user rejected: sender balance and deposit together is 0"),
		];
		for failure in &failures {
			for sponsored in [true, false] {
				assert_eq!(
					classify(failure, sponsored),
					Some(ErrorKind::UserRejected),
					"{failure} sponsored={sponsored}"
				);
			}
		}
	}

	#[test]
	fn test_gas_shaped_failure_depends_on_sponsorship() {
		let messages = [
			"AA21 didn't pay prefund",
			"sender balance and deposit together is 0 but must be at least 1500000 to pay for this operation",
			"insufficient funds for gas * price + value",
			"err: insufficient funds for intrinsic transaction cost",
			"gas required exceeds allowance (0)",
		];
		for message in messages {
			assert_eq!(
				classify(&text(message), true),
				Some(ErrorKind::TransientSponsorshipIssue),
				"{message}"
			);
			assert_eq!(
				classify(&text(message), false),
				Some(ErrorKind::InsufficientGasFunds),
				"{message}"
			);
		}
	}

	#[test]
	fn test_token_shaped_failure_is_token_balance() {
		for sponsored in [true, false] {
			assert_eq!(
				classify(&text("ERC20: transfer amount exceeds balance"), sponsored),
				Some(ErrorKind::InsufficientTokenBalance)
			);
			assert_eq!(
				classify(&text("Insufficient balance for transfer"), sponsored),
				Some(ErrorKind::InsufficientTokenBalance)
			);
		}
	}

	#[test]
	fn test_generic_insufficient_funds() {
		let failure = text("insufficient funds");
		assert_eq!(
			classify(&failure, true),
			Some(ErrorKind::InsufficientTokenBalance)
		);
		assert_eq!(classify(&failure, false), Some(ErrorKind::InsufficientGasFunds));
	}

	#[test]
	fn test_relay_rejection_codes() {
		for code in RELAY_REJECTION_CODES {
			assert_eq!(
				classify(&ProviderFailure::new(Some(code), "policy limit exceeded"), true),
				Some(ErrorKind::SponsorshipRelayRejected)
			);
		}
	}

	#[test]
	fn test_message_rules_take_precedence_over_codes() {
		let failure = ProviderFailure::new(Some(-32501), "AA21 didn't pay prefund");
		assert_eq!(
			classify(&failure, true),
			Some(ErrorKind::TransientSponsorshipIssue)
		);
	}

	#[test]
	fn test_unmatched_uses_default() {
		let failure = ProviderFailure::new(Some(-32603), "execution reverted");
		assert_eq!(classify(&failure, false), None);
		assert_eq!(
			classify_or(&failure, false, ErrorKind::NonRetryableRpcError),
			ErrorKind::NonRetryableRpcError
		);
	}
}
