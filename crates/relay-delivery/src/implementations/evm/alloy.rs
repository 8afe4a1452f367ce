//! EVM chain access over alloy HTTP providers.
//!
//! One provider per configured chain, each carrying the conventional signer
//! bound to that chain id. Node error responses keep their JSON-RPC code so
//! the dispatcher can classify them.

use crate::{DeliveryError, DeliveryFactory, DeliveryInterface, DeliveryRegistry};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes, FixedBytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use relay_types::{
	truncate_id, ConfigSchema, Field, FieldType, ImplementationRegistry, NetworksConfig,
	ProviderFailure, Schema, SecretString, Transaction, TransactionHash, TransactionReceipt,
	ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;

type HttpProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// Alloy-based EVM delivery serving several chains.
pub struct AlloyDelivery {
	providers: HashMap<u64, HttpProvider>,
}

impl AlloyDelivery {
	pub fn new(
		network_ids: Vec<u64>,
		networks: &NetworksConfig,
		signer: PrivateKeySigner,
	) -> Result<Self, DeliveryError> {
		if network_ids.is_empty() {
			return Err(DeliveryError::Network(
				"At least one network_id must be specified".to_string(),
			));
		}

		let mut providers = HashMap::new();
		for network_id in network_ids {
			let network = networks.get(&network_id).ok_or_else(|| {
				DeliveryError::Network(format!("Network {} not found in configuration", network_id))
			})?;

			let url = network.rpc_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for network {}: {}", network_id, e))
			})?;

			let wallet = EthereumWallet::from(signer.clone().with_chain_id(Some(network_id)));
			let provider = ProviderBuilder::new()
				.with_recommended_fillers()
				.wallet(wallet)
				.on_http(url);

			providers.insert(network_id, Arc::new(provider) as HttpProvider);
		}

		Ok(Self { providers })
	}

	fn get_provider(&self, chain_id: u64) -> Result<&HttpProvider, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}
}

/// Keeps the node's error code when there is one.
fn rpc_error(context: &str, chain_id: u64, err: TransportError) -> DeliveryError {
	match err.as_error_resp() {
		Some(payload) => DeliveryError::Rpc(ProviderFailure::new(
			Some(payload.code),
			payload.message.to_string(),
		)),
		None => DeliveryError::Network(format!("{} on chain {}: {}", context, chain_id, err)),
	}
}

fn to_fixed_hash(hash: &TransactionHash) -> Result<FixedBytes<32>, DeliveryError> {
	if hash.0.len() != 32 {
		return Err(DeliveryError::Network(format!(
			"Transaction hash must be 32 bytes, got {}",
			hash.0.len()
		)));
	}
	Ok(FixedBytes::<32>::from_slice(&hash.0))
}

pub struct AlloyDeliverySchema;

impl AlloyDeliverySchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new(
				"network_ids",
				FieldType::Array(Box::new(FieldType::Integer {
					min: Some(1),
					max: None,
				})),
			)
			.with_validator(|value| match value.as_array() {
				Some(arr) if arr.is_empty() => Err("network_ids cannot be empty".to_string()),
				Some(_) => Ok(()),
				None => Err("network_ids must be an array".to_string()),
			})],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	fn chain_ids(&self) -> Vec<u64> {
		self.providers.keys().copied().collect()
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let chain_id = tx.chain_id;
		let provider = self.get_provider(chain_id)?;

		let request = TransactionRequest::default()
			.to(tx.to)
			.input(tx.data.into())
			.value(tx.value);

		// the provider's wallet signs
		let pending_tx = provider
			.send_transaction(request)
			.await
			.map_err(|e| rpc_error("Failed to send transaction", chain_id, e))?;

		let hash = TransactionHash(pending_tx.tx_hash().0.to_vec());
		tracing::info!(
			tx_hash = %truncate_id(&hash.to_hex()),
			chain_id,
			"Submitted transaction"
		);
		Ok(hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let tx_hash = to_fixed_hash(hash)?;
		let provider = self.get_provider(chain_id)?;

		let receipt = provider
			.get_transaction_receipt(tx_hash)
			.await
			.map_err(|e| rpc_error("Failed to get receipt", chain_id, e))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
		}))
	}

	async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError> {
		self.get_provider(chain_id)?
			.get_block_number()
			.await
			.map_err(|e| rpc_error("Failed to get block number", chain_id, e))
	}

	async fn get_nonce(&self, address: Address, chain_id: u64) -> Result<u64, DeliveryError> {
		self.get_provider(chain_id)?
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| rpc_error("Failed to get nonce", chain_id, e))
	}

	async fn get_code(&self, address: Address, chain_id: u64) -> Result<Bytes, DeliveryError> {
		self.get_provider(chain_id)?
			.get_code_at(address)
			.await
			.map_err(|e| rpc_error("Failed to get code", chain_id, e))
	}
}

/// Builds an [`AlloyDelivery`] from `[delivery.implementations.evm_alloy]`.
///
/// `network_ids` (required) lists the chains served; each must be defined
/// under `[networks]`.
pub fn create_http_delivery(
	config: &toml::Value,
	networks: &NetworksConfig,
	private_key: &SecretString,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema::validate_config(config)
		.map_err(|e| DeliveryError::Network(format!("Invalid configuration: {}", e)))?;

	let network_ids = config
		.get("network_ids")
		.and_then(|v| v.as_array())
		.map(|arr| {
			arr.iter()
				.filter_map(|v| v.as_integer().map(|i| i as u64))
				.collect::<Vec<_>>()
		})
		.ok_or_else(|| DeliveryError::Network("network_ids is required".to_string()))?;

	let signer: PrivateKeySigner = private_key.with_exposed(|key| {
		key.parse()
			.map_err(|_| DeliveryError::Network("Invalid private key format".to_string()))
	})?;

	Ok(Box::new(AlloyDelivery::new(network_ids, networks, signer)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = DeliveryFactory;

	fn factory() -> Self::Factory {
		create_http_delivery
	}
}

impl DeliveryRegistry for Registry {}
