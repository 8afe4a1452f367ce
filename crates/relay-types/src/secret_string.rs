//! Redacted string type for API credentials and private keys.
//!
//! The wrapped value is zeroed on drop and never appears in `Debug`,
//! `Display` or serialized output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// Sensitive string whose memory is cleared when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret to a closure, keeping the exposure scoped.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	/// Exposes the secret. Never log the returned value.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// True when the secret is empty or whitespace only, e.g. an unset
	/// `${VAR:-}` substitution.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_secret_never_formatted() {
		let secret = SecretString::from("alchemy-key-123");
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", secret), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&secret).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_exposure() {
		let secret = SecretString::from("alchemy-key-123");
		assert_eq!(secret.expose_secret(), "alchemy-key-123");
		assert_eq!(secret.with_exposed(|s| s.len()), 15);
	}

	#[test]
	fn test_blank_detection() {
		assert!(SecretString::from("").is_blank());
		assert!(SecretString::from("  ").is_blank());
		assert!(!SecretString::from("k").is_blank());
	}
}
