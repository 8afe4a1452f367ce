//! Private-key account loaded from configuration.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relay_types::{
	with_0x_prefix, Address, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	SecretString, ValidationError,
};

/// Conventional signer backed by an in-memory private key.
#[derive(Debug)]
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Parses a hex private key, with or without 0x prefix.
	pub fn new(private_key: &str) -> Result<Self, AccountError> {
		let signer = private_key
			.trim()
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;
		Ok(Self { signer })
	}
}

pub struct LocalWalletSchema;

impl LocalWalletSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let hex_part = key.strip_prefix("0x").unwrap_or(key);
					if hex_part.len() != 64 {
						return Err("private_key must be 32 bytes of hex".to_string());
					}
					if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("private_key must be hex encoded".to_string());
					}
					Ok(())
				}),
			],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	fn get_private_key(&self) -> SecretString {
		SecretString::from(with_0x_prefix(&hex::encode(self.signer.to_bytes())))
	}
}

/// Builds a [`LocalWallet`] from `[account.implementations.local]`.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema::validate_config(config)
		.map_err(|e| AccountError::InvalidConfig(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidConfig("private_key is required".into()))?;

	Ok(Box::new(LocalWallet::new(private_key)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}
