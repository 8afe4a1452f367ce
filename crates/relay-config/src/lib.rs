//! Configuration module for the sponsored transaction relay.
//!
//! Configuration is loaded from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, and a file may pull in other
//! files with `include = ["networks.toml"]`. Each top-level section must be
//! defined exactly once across all included files.

#[cfg(feature = "testing")]
pub mod builders;
mod loader;

use regex::Regex;
use relay_types::{networks::deserialize_networks, NetworksConfig, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "testing")]
pub use builders::config::ConfigBuilder;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// message only, without the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub relay: RelayConfig,
	/// Chains the relay tracks and dispatches on, keyed by chain id.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	#[serde(default)]
	pub poller: PollerConfig,
	#[serde(default)]
	pub sponsorship: SponsorshipConfig,
	/// Conventional signer.
	pub account: AccountConfig,
	/// Smart-account relay client. Without it every smart-account intent
	/// fails its preconditions.
	pub smart_account: Option<AccountConfig>,
	pub delivery: DeliveryConfig,
	pub api: Option<ApiConfig>,
}

/// Identity of this relay instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	pub id: String,
}

/// Receipt poller cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollerConfig {
	#[serde(default = "default_poll_interval_seconds")]
	pub interval_seconds: u64,
}

impl PollerConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_seconds)
	}
}

impl Default for PollerConfig {
	fn default() -> Self {
		Self {
			interval_seconds: default_poll_interval_seconds(),
		}
	}
}

fn default_poll_interval_seconds() -> u64 {
	4
}

/// Gas sponsorship behaviour of the smart-account wallet.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SponsorshipConfig {
	/// Credential for the sponsorship relay. Sponsorship is skipped when
	/// unset or blank.
	#[serde(default)]
	pub api_key: Option<SecretString>,
	/// Retry a failed sponsored operation as a self-funded one.
	#[serde(default = "default_allow_fallback")]
	pub allow_fallback: bool,
	/// Bound on the nonce and deployed-code lookups before a sponsored send.
	#[serde(default = "default_precondition_timeout_seconds")]
	pub precondition_timeout_seconds: u64,
	/// Silent retries of a transient sponsorship failure.
	#[serde(default = "default_transient_retries")]
	pub transient_retries: u32,
}

impl SponsorshipConfig {
	pub fn precondition_timeout(&self) -> Duration {
		Duration::from_secs(self.precondition_timeout_seconds)
	}

	/// The API credential, if one is configured and non-blank.
	pub fn credential(&self) -> Option<&SecretString> {
		self.api_key.as_ref().filter(|key| !key.is_blank())
	}
}

impl Default for SponsorshipConfig {
	fn default() -> Self {
		Self {
			api_key: None,
			allow_fallback: default_allow_fallback(),
			precondition_timeout_seconds: default_precondition_timeout_seconds(),
			transient_retries: default_transient_retries(),
		}
	}
}

fn default_allow_fallback() -> bool {
	true
}

fn default_precondition_timeout_seconds() -> u64 {
	15
}

fn default_transient_retries() -> u32 {
	1
}

/// Account implementation selection, used for both the conventional signer
/// and the smart-account client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Implementation name to its raw configuration table.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for chain access.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Implementation name to its raw configuration table. Each table lists
	/// the `network_ids` it serves.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024
}

/// Resolves `${VAR}` and `${VAR:-default}` references.
///
/// Inputs over 1MB are rejected.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.relay.id.trim().is_empty() {
			return Err(ConfigError::Validation("Relay ID cannot be empty".into()));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if network.rpc_url.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have rpc_url",
					chain_id
				)));
			}
			if let Some(retry) = network.retry {
				if retry.min_wait_ms > retry.max_wait_ms {
					return Err(ConfigError::Validation(format!(
						"Network {} retry min_wait_ms ({}) exceeds max_wait_ms ({})",
						chain_id, retry.min_wait_ms, retry.max_wait_ms
					)));
				}
			}
		}

		if self.poller.interval_seconds == 0 || self.poller.interval_seconds > 3600 {
			return Err(ConfigError::Validation(
				"Poller interval_seconds must be between 1 and 3600".into(),
			));
		}

		if self.sponsorship.precondition_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Sponsorship precondition_timeout_seconds must be greater than 0".into(),
			));
		}

		Self::validate_primary("account", &self.account)?;
		if let Some(ref smart_account) = self.smart_account {
			Self::validate_primary("smart_account", smart_account)?;
		}

		if self.delivery.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one delivery implementation required".into(),
			));
		}

		self.validate_delivery_coverage()
	}

	fn validate_primary(section: &str, config: &AccountConfig) -> Result<(), ConfigError> {
		if config.primary.is_empty() {
			return Err(ConfigError::Validation(format!(
				"{} primary implementation cannot be empty",
				section
			)));
		}
		if !config.implementations.contains_key(&config.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary {} '{}' not found in implementations",
				section, config.primary
			)));
		}
		Ok(())
	}

	/// Every delivery `network_ids` entry must name a configured network, no
	/// network may be served twice and every network must be served.
	fn validate_delivery_coverage(&self) -> Result<(), ConfigError> {
		let mut coverage: HashMap<u64, &str> = HashMap::new();

		for (impl_name, impl_config) in &self.delivery.implementations {
			let network_ids = impl_config
				.get("network_ids")
				.and_then(|v| v.as_array())
				.ok_or_else(|| {
					ConfigError::Validation(format!(
						"Delivery implementation '{}' missing 'network_ids' field",
						impl_name
					))
				})?;

			for network_value in network_ids {
				let network_id = network_value
					.as_integer()
					.and_then(|id| u64::try_from(id).ok())
					.ok_or_else(|| {
						ConfigError::Validation(format!(
							"Invalid network_id in delivery '{}'",
							impl_name
						))
					})?;

				if !self.networks.contains_key(&network_id) {
					return Err(ConfigError::Validation(format!(
						"Delivery '{}' references network {} which doesn't exist in networks config",
						impl_name, network_id
					)));
				}
				if let Some(existing) = coverage.insert(network_id, impl_name) {
					return Err(ConfigError::Validation(format!(
						"Network {} is served by both '{}' and '{}'",
						network_id, existing, impl_name
					)));
				}
			}
		}

		let covered: HashSet<u64> = coverage.keys().copied().collect();
		let mut uncovered: Vec<u64> = self
			.networks
			.keys()
			.filter(|id| !covered.contains(id))
			.copied()
			.collect();
		if !uncovered.is_empty() {
			uncovered.sort_unstable();
			return Err(ConfigError::Validation(format!(
				"Networks {:?} have no delivery implementation",
				uncovered
			)));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
