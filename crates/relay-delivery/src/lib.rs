//! Chain access for the relay.
//!
//! A delivery implementation serves one or more chains. It submits the
//! conventional wallet's signed transactions and answers the read queries the
//! poller and the dispatcher need: receipts, block numbers, nonces and
//! deployed code. [`DeliveryService`] routes each call to the implementation
//! serving its chain.

use async_trait::async_trait;
use relay_types::{
	Address, Bytes, ConfigSchema, ImplementationRegistry, NetworksConfig, ProviderFailure,
	SecretString, Transaction, TransactionHash, TransactionReceipt,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Transport failure or malformed input, without a node error code.
	#[error("Network error: {0}")]
	Network(String),
	/// The node answered with a JSON-RPC error.
	#[error("RPC error: {0}")]
	Rpc(ProviderFailure),
	#[error("No provider available for chain {0}")]
	NoProviderAvailable(u64),
}

impl DeliveryError {
	/// Provider-level view of the failure for classification.
	pub fn to_provider_failure(&self) -> ProviderFailure {
		match self {
			DeliveryError::Rpc(failure) => failure.clone(),
			other => ProviderFailure::new(None, other.to_string()),
		}
	}
}

/// Chain access for the chains an implementation serves.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Chains this implementation serves.
	fn chain_ids(&self) -> Vec<u64>;

	/// Signs and submits a conventional transaction, returning its hash.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Looks up a receipt. `Ok(None)` means not mined yet.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError>;

	/// Next nonce of `address` (pending transaction count).
	async fn get_nonce(&self, address: Address, chain_id: u64) -> Result<u64, DeliveryError>;

	/// Deployed bytecode at `address`; empty when nothing is deployed.
	async fn get_code(&self, address: Address, chain_id: u64) -> Result<Bytes, DeliveryError>;
}

/// Builds an implementation from its configuration table, the network
/// definitions and the conventional signer's private key.
pub type DeliveryFactory = fn(
	&toml::Value,
	&NetworksConfig,
	&SecretString,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError>;

pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// All delivery implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}

/// Routes delivery calls to the implementation serving each chain.
pub struct DeliveryService {
	providers: HashMap<u64, Arc<dyn DeliveryInterface>>,
}

impl DeliveryService {
	pub fn new(providers: HashMap<u64, Arc<dyn DeliveryInterface>>) -> Self {
		Self { providers }
	}

	/// Registers `implementation` for every chain it serves.
	pub fn from_implementations(implementations: Vec<Arc<dyn DeliveryInterface>>) -> Self {
		let mut providers = HashMap::new();
		for implementation in implementations {
			for chain_id in implementation.chain_ids() {
				providers.insert(chain_id, implementation.clone());
			}
		}
		Self { providers }
	}

	pub fn supports(&self, chain_id: u64) -> bool {
		self.providers.contains_key(&chain_id)
	}

	pub fn chain_ids(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.providers.keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	fn provider(&self, chain_id: u64) -> Result<&Arc<dyn DeliveryInterface>, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}

	pub async fn deliver(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.provider(tx.chain_id)?.submit(tx).await
	}

	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.provider(chain_id)?.get_receipt(hash, chain_id).await
	}

	pub async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError> {
		self.provider(chain_id)?.get_block_number(chain_id).await
	}

	pub async fn get_nonce(&self, chain_id: u64, address: Address) -> Result<u64, DeliveryError> {
		self.provider(chain_id)?.get_nonce(address, chain_id).await
	}

	pub async fn get_code(&self, chain_id: u64, address: Address) -> Result<Bytes, DeliveryError> {
		self.provider(chain_id)?.get_code(address, chain_id).await
	}

	/// Whether `address` has contract code on `chain_id`.
	pub async fn is_deployed(&self, chain_id: u64, address: Address) -> Result<bool, DeliveryError> {
		Ok(!self.get_code(chain_id, address).await?.is_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::{Schema, ValidationError, U256};

	struct StaticChain {
		chain_id: u64,
		block: u64,
	}

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
			Schema::new(vec![], vec![]).validate(config)
		}
	}

	#[async_trait]
	impl DeliveryInterface for StaticChain {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}

		fn chain_ids(&self) -> Vec<u64> {
			vec![self.chain_id]
		}

		async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
			Ok(TransactionHash(vec![tx.chain_id as u8]))
		}

		async fn get_receipt(
			&self,
			_hash: &TransactionHash,
			_chain_id: u64,
		) -> Result<Option<TransactionReceipt>, DeliveryError> {
			Ok(None)
		}

		async fn get_block_number(&self, _chain_id: u64) -> Result<u64, DeliveryError> {
			Ok(self.block)
		}

		async fn get_nonce(&self, _address: Address, _chain_id: u64) -> Result<u64, DeliveryError> {
			Ok(0)
		}

		async fn get_code(&self, address: Address, _chain_id: u64) -> Result<Bytes, DeliveryError> {
			if address == Address::ZERO {
				Ok(Bytes::new())
			} else {
				Ok(Bytes::from(vec![0x60, 0x80]))
			}
		}
	}

	fn service() -> DeliveryService {
		DeliveryService::from_implementations(vec![
			Arc::new(StaticChain {
				chain_id: 1,
				block: 100,
			}),
			Arc::new(StaticChain {
				chain_id: 42161,
				block: 9000,
			}),
		])
	}

	#[tokio::test]
	async fn test_routes_by_chain() {
		let service = service();
		assert_eq!(service.chain_ids(), vec![1, 42161]);
		assert_eq!(service.get_block_number(1).await.unwrap(), 100);
		assert_eq!(service.get_block_number(42161).await.unwrap(), 9000);

		let hash = service
			.deliver(Transaction {
				chain_id: 1,
				to: Address::ZERO,
				data: Bytes::new(),
				value: U256::ZERO,
			})
			.await
			.unwrap();
		assert_eq!(hash.0, vec![1]);
	}

	#[tokio::test]
	async fn test_unknown_chain() {
		let err = service().get_block_number(10).await.unwrap_err();
		assert!(matches!(err, DeliveryError::NoProviderAvailable(10)));
		assert_eq!(err.to_provider_failure().code, None);
	}

	#[tokio::test]
	async fn test_is_deployed() {
		let service = service();
		assert!(!service.is_deployed(1, Address::ZERO).await.unwrap());
		assert!(service.is_deployed(1, Address::repeat_byte(0x11)).await.unwrap());
	}

	#[test]
	fn test_rpc_error_keeps_failure() {
		let err = DeliveryError::Rpc(ProviderFailure::new(Some(-32000), "insufficient funds"));
		let failure = err.to_provider_failure();
		assert_eq!(failure.code, Some(-32000));
		assert_eq!(failure.message, "insufficient funds");
	}
}
