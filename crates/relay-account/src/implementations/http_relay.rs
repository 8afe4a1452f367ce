//! Smart-account client for a JSON-RPC relay over HTTP.
//!
//! Two methods are used: `relay_getAccount` resolves the counterfactual
//! account owned by the relay signer, and `relay_sendOperation` submits an
//! operation, sponsored when the request carries a policy id. Requests carry
//! the sponsorship credential as a bearer token.

use crate::{
	AccountError, RelayCredentials, RelayError, SmartAccountFactory, SmartAccountInterface,
	SmartAccountRegistry,
};
use async_trait::async_trait;
use relay_types::{
	Address, Bytes, ConfigSchema, Field, FieldType, ImplementationRegistry, InitCode,
	OperationRequest, Schema, SecretString, TransactionHash, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Account resolved by `relay_getAccount`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
	address: Address,
	#[serde(default)]
	factory: Option<Address>,
	#[serde(default)]
	factory_data: Option<Bytes>,
}

impl AccountInfo {
	fn init_code(&self) -> Option<InitCode> {
		match (&self.factory, &self.factory_data) {
			(Some(factory), Some(factory_data)) => Some(InitCode {
				factory: *factory,
				factory_data: factory_data.clone(),
			}),
			_ => None,
		}
	}
}

#[derive(Debug, Deserialize)]
struct SendOperationResult {
	hash: String,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
	jsonrpc: &'static str,
	id: u64,
	method: &'a str,
	params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

/// JSON-RPC smart-account relay client.
pub struct HttpRelayClient {
	client: reqwest::Client,
	relay_url: String,
	owner: Address,
	api_key: Option<SecretString>,
	account: OnceCell<AccountInfo>,
	next_id: AtomicU64,
}

impl HttpRelayClient {
	pub fn new(
		relay_url: impl Into<String>,
		credentials: RelayCredentials,
		timeout: Duration,
	) -> Result<Self, AccountError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AccountError::Implementation(format!("HTTP client: {}", e)))?;

		Ok(Self {
			client,
			relay_url: relay_url.into(),
			owner: credentials.owner,
			api_key: credentials.api_key,
			account: OnceCell::new(),
			next_id: AtomicU64::new(1),
		})
	}

	async fn call<T: serde::de::DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> Result<T, RelayError> {
		let request = RpcRequest {
			jsonrpc: "2.0",
			id: self.next_id.fetch_add(1, Ordering::Relaxed),
			method,
			params,
		};

		let mut builder = self.client.post(&self.relay_url).json(&request);
		if let Some(ref api_key) = self.api_key {
			builder = builder.bearer_auth(api_key.expose_secret());
		}

		let response = builder
			.send()
			.await
			.map_err(|e| RelayError::Network(format!("{} request failed: {}", method, e)))?;

		let status = response.status();
		let body: RpcResponse = response.json().await.map_err(|e| {
			RelayError::InvalidResponse(format!(
				"{} returned unparseable body (HTTP {}): {}",
				method, status, e
			))
		})?;

		if let Some(error) = body.error {
			return Err(RelayError::Rejected {
				code: error.code,
				message: error.message,
			});
		}

		let result = body
			.result
			.ok_or_else(|| RelayError::InvalidResponse(format!("{} returned no result", method)))?;
		serde_json::from_value(result)
			.map_err(|e| RelayError::InvalidResponse(format!("{} result: {}", method, e)))
	}

	fn account(&self) -> Result<&AccountInfo, RelayError> {
		self.account.get().ok_or(RelayError::NotReady)
	}
}

pub struct HttpRelaySchema;

impl HttpRelaySchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for HttpRelaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("relay_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("relay_url must be an http(s) URL".to_string()),
					}
				}),
			],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SmartAccountInterface for HttpRelayClient {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpRelaySchema)
	}

	async fn initialize(&self) -> Result<(), RelayError> {
		let account = self
			.account
			.get_or_try_init(|| async {
				self.call::<AccountInfo>("relay_getAccount", json!([{ "owner": self.owner }]))
					.await
			})
			.await?;
		tracing::info!(
			address = %account.address,
			deployable = account.init_code().is_some(),
			"Smart account resolved"
		);
		Ok(())
	}

	fn is_ready(&self) -> bool {
		self.account.initialized()
	}

	fn address(&self) -> Result<Address, RelayError> {
		Ok(self.account()?.address)
	}

	fn init_code(&self) -> Result<Option<InitCode>, RelayError> {
		Ok(self.account()?.init_code())
	}

	async fn send_operation(
		&self,
		request: OperationRequest,
	) -> Result<TransactionHash, RelayError> {
		if !self.is_ready() {
			return Err(RelayError::NotReady);
		}
		let sponsored = request.is_sponsored();
		let params = serde_json::to_value(&request)
			.map_err(|e| RelayError::InvalidResponse(format!("encode operation: {}", e)))?;

		let result: SendOperationResult = self.call("relay_sendOperation", json!([params])).await?;
		let hash = result
			.hash
			.parse::<TransactionHash>()
			.map_err(|e| RelayError::InvalidResponse(format!("operation hash: {}", e)))?;

		tracing::debug!(
			chain_id = request.chain_id,
			sponsored,
			tx_hash = %relay_types::truncate_id(&hash.to_hex()),
			"Operation accepted by relay"
		);
		Ok(hash)
	}
}

/// Builds an [`HttpRelayClient`] from `[smart_account.implementations.http_relay]`.
pub fn create_smart_account(
	config: &toml::Value,
	credentials: RelayCredentials,
) -> Result<Box<dyn SmartAccountInterface>, AccountError> {
	HttpRelaySchema::validate_config(config)
		.map_err(|e| AccountError::InvalidConfig(e.to_string()))?;

	let relay_url = config
		.get("relay_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidConfig("relay_url is required".into()))?;
	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let client = HttpRelayClient::new(
		relay_url,
		credentials,
		Duration::from_secs(timeout_seconds),
	)?;
	Ok(Box::new(client))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http_relay";
	type Factory = SmartAccountFactory;

	fn factory() -> Self::Factory {
		create_smart_account
	}
}

impl SmartAccountRegistry for Registry {}
