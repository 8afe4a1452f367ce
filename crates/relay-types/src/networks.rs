//! Network configuration types.
//!
//! Each configured chain carries its RPC endpoint, the optional gas
//! sponsorship policy used on it and the retry budget for receipt checks.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Arbitrum One.
pub const ARBITRUM_ONE: u64 = 42161;
/// Arbitrum Sepolia.
pub const ARBITRUM_SEPOLIA: u64 = 421614;

/// Retry budget for a receipt lookup: `attempts` retries after the first
/// call, each preceded by a random wait in `[min_wait_ms, max_wait_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryBudget {
	pub attempts: u32,
	#[serde(default)]
	pub min_wait_ms: u64,
	#[serde(default)]
	pub max_wait_ms: u64,
}

impl Default for RetryBudget {
	fn default() -> Self {
		Self {
			attempts: 1,
			min_wait_ms: 0,
			max_wait_ms: 0,
		}
	}
}

impl RetryBudget {
	pub fn new(attempts: u32, min_wait_ms: u64, max_wait_ms: u64) -> Self {
		Self {
			attempts,
			min_wait_ms,
			max_wait_ms,
		}
	}

	/// Built-in budget for a chain. Fast-block networks get more attempts with
	/// shorter waits.
	pub fn for_chain(chain_id: u64) -> Self {
		match chain_id {
			ARBITRUM_ONE | ARBITRUM_SEPOLIA => Self::new(10, 250, 1000),
			_ => Self::default(),
		}
	}

	pub fn min_wait(&self) -> Duration {
		Duration::from_millis(self.min_wait_ms)
	}

	pub fn max_wait(&self) -> Duration {
		Duration::from_millis(self.max_wait_ms.max(self.min_wait_ms))
	}
}

/// Configuration for a single blockchain network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP(S) RPC endpoint.
	pub rpc_url: String,
	/// Gas sponsorship policy for smart-account operations on this chain.
	#[serde(default)]
	pub sponsorship_policy_id: Option<String>,
	/// Overrides the built-in retry budget.
	#[serde(default)]
	pub retry: Option<RetryBudget>,
}

impl NetworkConfig {
	/// The policy id, if one is configured and non-blank.
	pub fn policy_id(&self) -> Option<&str> {
		self.sponsorship_policy_id
			.as_deref()
			.map(str::trim)
			.filter(|id| !id.is_empty())
	}
}

/// Chain id to network configuration.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Effective retry budget for a chain.
pub fn retry_budget(networks: &NetworksConfig, chain_id: u64) -> RetryBudget {
	networks
		.get(&chain_id)
		.and_then(|network| network.retry)
		.unwrap_or_else(|| RetryBudget::for_chain(chain_id))
}

/// Deserializes the networks table, whose keys are chain ids written as
/// strings because TOML has no numeric table keys.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	string_map
		.into_iter()
		.map(|(key, value)| {
			key.parse::<u64>()
				.map(|chain_id| (chain_id, value))
				.map_err(|e| {
					serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e))
				})
		})
		.collect()
}
