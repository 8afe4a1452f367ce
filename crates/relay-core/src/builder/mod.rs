//! Builder for constructing relay engines.
//!
//! Composes a [`RelayEngine`] from the configured account, smart-account and
//! delivery implementations using factory functions keyed by implementation
//! name.

use crate::dispatch::{ConventionalWallet, Dispatcher, SmartAccountWallet, WalletInterface};
use crate::engine::{event_bus::EventBus, RelayEngine};
use crate::handlers::{IntentHandler, TransactionHandler};
use crate::state::PendingRegistry;
use relay_account::{
	AccountError, AccountInterface, AccountService, RelayCredentials, SmartAccountInterface,
};
use relay_config::Config;
use relay_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use relay_types::{NetworksConfig, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during relay engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by implementation
/// name.
pub struct RelayFactories<AF, SAF, DF> {
	pub account_factories: HashMap<String, AF>,
	pub smart_account_factories: HashMap<String, SAF>,
	pub delivery_factories: HashMap<String, DF>,
}

pub struct RelayBuilder {
	config: Config,
}

impl RelayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub async fn build<AF, SAF, DF>(
		self,
		factories: RelayFactories<AF, SAF, DF>,
	) -> Result<RelayEngine, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		SAF: Fn(
			&toml::Value,
			RelayCredentials,
		) -> Result<Box<dyn SmartAccountInterface>, AccountError>,
		DF: Fn(
			&toml::Value,
			&NetworksConfig,
			&SecretString,
		) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
	{
		// Conventional signer
		let primary = self.config.account.primary.as_str();
		let account_config = self.config.account.implementations.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("account implementation '{}'", primary))
		})?;
		let account_factory = factories.account_factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown account implementation '{}'", primary))
		})?;
		let account = match account_factory(account_config) {
			Ok(implementation) => {
				tracing::info!(component = "account", implementation = %primary, "Loaded");
				AccountService::new(implementation)
			},
			Err(e) => {
				tracing::error!(
					component = "account",
					implementation = %primary,
					error = %e,
					"Failed to create account implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create account implementation '{}': {}",
					primary, e
				)));
			},
		};

		let signer_address = account.get_address().await.map_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get signer address");
			BuilderError::Config(format!("Failed to get signer address: {}", e))
		})?;

		// Delivery
		let private_key = account.get_private_key();
		let mut delivery_impls: Vec<Arc<dyn DeliveryInterface>> = Vec::new();
		for (name, config) in &self.config.delivery.implementations {
			let Some(factory) = factories.delivery_factories.get(name) else {
				tracing::warn!(component = "delivery", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config, &self.config.networks, &private_key) {
				Ok(implementation) => {
					let implementation: Arc<dyn DeliveryInterface> = implementation.into();
					for chain_id in implementation.chain_ids() {
						tracing::info!(component = "delivery", implementation = %name, chain_id, "Loaded");
					}
					delivery_impls.push(implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "delivery",
						implementation = %name,
						error = %e,
						"Failed to create delivery implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create delivery implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		if delivery_impls.is_empty() {
			return Err(BuilderError::MissingComponent(
				"at least one delivery implementation".into(),
			));
		}
		let delivery = Arc::new(DeliveryService::from_implementations(delivery_impls));

		// Smart account client
		let smart_account: Option<Arc<dyn SmartAccountInterface>> = match &self.config.smart_account
		{
			None => {
				tracing::info!(
					component = "smart_account",
					"Not configured, smart-account intents will be refused"
				);
				None
			},
			Some(section) => {
				let name = section.primary.as_str();
				let config = section.implementations.get(name).ok_or_else(|| {
					BuilderError::MissingComponent(format!(
						"smart account implementation '{}'",
						name
					))
				})?;
				let factory = factories.smart_account_factories.get(name).ok_or_else(|| {
					BuilderError::Config(format!(
						"Unknown smart account implementation '{}'",
						name
					))
				})?;
				let credentials = RelayCredentials {
					owner: signer_address,
					api_key: self.config.sponsorship.credential().cloned(),
				};
				match factory(config, credentials) {
					Ok(implementation) => {
						tracing::info!(component = "smart_account", implementation = %name, "Loaded");
						Some(implementation.into())
					},
					Err(e) => {
						tracing::error!(
							component = "smart_account",
							implementation = %name,
							error = %e,
							"Failed to create smart account implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create smart account implementation '{}': {}",
							name, e
						)));
					},
				}
			},
		};

		let event_bus = EventBus::new(1000);

		let conventional: Arc<dyn WalletInterface> =
			Arc::new(ConventionalWallet::new(delivery.clone(), signer_address));
		let sponsored = smart_account.clone().map(|account| {
			Arc::new(SmartAccountWallet::new(
				account,
				delivery.clone(),
				self.config.networks.clone(),
				self.config.sponsorship.clone(),
			)) as Arc<dyn WalletInterface>
		});
		let dispatcher = Arc::new(Dispatcher::new(
			conventional,
			sponsored,
			signer_address,
			event_bus.clone(),
		));

		let registry = Arc::new(PendingRegistry::new());
		let transactions = Arc::new(TransactionHandler::new(
			registry.clone(),
			delivery.clone(),
			event_bus.clone(),
		));
		let intents = Arc::new(IntentHandler::new(
			dispatcher,
			transactions.clone(),
			delivery.clone(),
		));

		Ok(RelayEngine::new(
			self.config,
			registry,
			delivery,
			smart_account,
			event_bus,
			intents,
			transactions,
		))
	}
}
