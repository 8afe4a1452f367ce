//! Configuration builder for test and development setups.

use crate::{
	AccountConfig, ApiConfig, Config, DeliveryConfig, PollerConfig, RelayConfig,
	SponsorshipConfig,
};
use relay_types::{NetworkConfig, RetryBudget, SecretString};
use std::collections::HashMap;

/// Builds a [`Config`] without going through TOML.
///
/// The result is not validated, so tests can construct configurations the
/// loader would reject.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	relay_id: String,
	networks: HashMap<u64, NetworkConfig>,
	poll_interval_seconds: u64,
	sponsorship: SponsorshipConfig,
	account_primary: String,
	smart_account_primary: Option<String>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			relay_id: "test-relay".to_string(),
			networks: HashMap::new(),
			poll_interval_seconds: 1,
			sponsorship: SponsorshipConfig::default(),
			account_primary: "local".to_string(),
			smart_account_primary: None,
			api: None,
		}
	}

	pub fn relay_id(mut self, id: impl Into<String>) -> Self {
		self.relay_id = id.into();
		self
	}

	/// Adds a network with a local RPC URL.
	pub fn network(mut self, chain_id: u64, policy_id: Option<&str>) -> Self {
		self.networks.insert(
			chain_id,
			NetworkConfig {
				rpc_url: format!("http://localhost:{}", 8545 + self.networks.len()),
				sponsorship_policy_id: policy_id.map(str::to_string),
				retry: None,
			},
		);
		self
	}

	/// Overrides the retry budget of an already added network.
	pub fn retry(mut self, chain_id: u64, budget: RetryBudget) -> Self {
		if let Some(network) = self.networks.get_mut(&chain_id) {
			network.retry = Some(budget);
		}
		self
	}

	pub fn poll_interval_seconds(mut self, seconds: u64) -> Self {
		self.poll_interval_seconds = seconds;
		self
	}

	pub fn api_key(mut self, key: &str) -> Self {
		self.sponsorship.api_key = Some(SecretString::from(key));
		self
	}

	pub fn allow_fallback(mut self, allow: bool) -> Self {
		self.sponsorship.allow_fallback = allow;
		self
	}

	pub fn transient_retries(mut self, retries: u32) -> Self {
		self.sponsorship.transient_retries = retries;
		self
	}

	pub fn account_primary(mut self, primary: impl Into<String>) -> Self {
		self.account_primary = primary.into();
		self
	}

	pub fn smart_account_primary(mut self, primary: impl Into<String>) -> Self {
		self.smart_account_primary = Some(primary.into());
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			relay: RelayConfig { id: self.relay_id },
			networks: self.networks,
			poller: PollerConfig {
				interval_seconds: self.poll_interval_seconds,
			},
			sponsorship: self.sponsorship,
			account: AccountConfig {
				primary: self.account_primary,
				implementations: HashMap::new(),
			},
			smart_account: self.smart_account_primary.map(|primary| AccountConfig {
				primary,
				implementations: HashMap::new(),
			}),
			delivery: DeliveryConfig {
				implementations: HashMap::new(),
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_networks_and_sponsorship() {
		let config = ConfigBuilder::new()
			.network(42161, Some("policy"))
			.network(1, None)
			.retry(1, RetryBudget::new(2, 5, 10))
			.api_key("key")
			.allow_fallback(false)
			.smart_account_primary("http_relay")
			.build();

		assert_eq!(config.networks.len(), 2);
		assert_eq!(config.networks[&42161].policy_id(), Some("policy"));
		assert_eq!(config.networks[&1].retry, Some(RetryBudget::new(2, 5, 10)));
		assert!(config.sponsorship.credential().is_some());
		assert!(!config.sponsorship.allow_fallback);
		assert!(config.smart_account.is_some());
	}
}
