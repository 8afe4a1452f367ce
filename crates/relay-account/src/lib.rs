//! Account management for the relay.
//!
//! Two kinds of account are provided. The conventional signer
//! ([`AccountInterface`]) holds the key used for self-funded transactions. The
//! smart-account client ([`SmartAccountInterface`]) talks to a relay that
//! submits operations on behalf of a contract account, optionally under a gas
//! sponsorship policy.

use async_trait::async_trait;
use relay_types::{
	Address, ConfigSchema, ImplementationRegistry, InitCode, OperationRequest, ProviderFailure,
	SecretString, TransactionHash,
};
use thiserror::Error;

pub mod implementations {
	pub mod http_relay;
	pub mod local;
}

/// Errors that can occur during account setup.
#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Errors returned by a smart-account relay.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
	/// The relay answered with a JSON-RPC error object.
	#[error("Relay rejected request ({code}): {message}")]
	Rejected { code: i64, message: String },
	/// `initialize` has not completed.
	#[error("Smart account is not initialized")]
	NotReady,
	#[error("Network error: {0}")]
	Network(String),
	#[error("Invalid relay response: {0}")]
	InvalidResponse(String),
}

impl RelayError {
	/// Provider-level view of the failure for classification. Only relay
	/// rejections carry a structured code.
	pub fn to_provider_failure(&self) -> ProviderFailure {
		match self {
			RelayError::Rejected { code, message } => ProviderFailure::new(Some(*code), message),
			other => ProviderFailure::new(None, other.to_string()),
		}
	}
}

/// Conventional signer holding a private key.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn address(&self) -> Result<Address, AccountError>;

	/// Returns the private key with 0x prefix, for the delivery providers.
	fn get_private_key(&self) -> SecretString;
}

pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// All conventional account implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Wraps the configured conventional signer.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	pub fn get_private_key(&self) -> SecretString {
		self.implementation.get_private_key()
	}
}

/// Client for a smart-account relay.
///
/// The account is resolved once by [`initialize`](Self::initialize); until
/// then `is_ready` is false and the accessors return [`RelayError::NotReady`].
#[async_trait]
pub trait SmartAccountInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Resolves the smart account owned by the relay signer.
	async fn initialize(&self) -> Result<(), RelayError>;

	fn is_ready(&self) -> bool;

	fn address(&self) -> Result<Address, RelayError>;

	/// Factory call that deploys the account. The caller decides whether the
	/// account still needs deploying.
	fn init_code(&self) -> Result<Option<InitCode>, RelayError>;

	/// Submits an operation. A request with a policy id asks the relay to
	/// sponsor gas.
	async fn send_operation(
		&self,
		request: OperationRequest,
	) -> Result<TransactionHash, RelayError>;
}

/// What a smart-account client needs beyond its own configuration table.
#[derive(Debug, Clone)]
pub struct RelayCredentials {
	/// Address of the conventional signer that owns the smart account.
	pub owner: Address,
	/// Sponsorship API credential, when configured.
	pub api_key: Option<SecretString>,
}

pub type SmartAccountFactory =
	fn(&toml::Value, RelayCredentials) -> Result<Box<dyn SmartAccountInterface>, AccountError>;

pub trait SmartAccountRegistry: ImplementationRegistry<Factory = SmartAccountFactory> {}

/// All smart-account implementations as (name, factory) pairs.
pub fn get_all_smart_account_implementations() -> Vec<(&'static str, SmartAccountFactory)> {
	use implementations::http_relay;

	vec![(http_relay::Registry::NAME, http_relay::Registry::factory())]
}
