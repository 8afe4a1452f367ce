//! Main entry point for the relay service.
//!
//! Loads the configuration, builds the relay engine from the registered
//! implementations and runs it, optionally alongside the HTTP API.

use clap::Parser;
use relay_account::{AccountFactory, SmartAccountFactory};
use relay_config::Config;
use relay_core::{RelayBuilder, RelayEngine, RelayFactories};
use relay_delivery::DeliveryFactory;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the relay service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/relay.toml", env = "RELAY_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started relay");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.relay.id);

	let engine = Arc::new(build_relay(config.clone()).await?);
	engine.initialize().await?;

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			let api_task = server::start_server(api_config, Arc::clone(&engine));

			tokio::select! {
				result = engine.run() => {
					tracing::info!("Relay finished");
					result?;
				}
				result = api_task => {
					tracing::info!("API server finished");
					engine.shutdown().await?;
					result?;
				}
			}
		},
		None => {
			tracing::info!("Starting relay only");
			engine.run().await?;
		},
	}

	tracing::info!("Stopped relay");
	Ok(())
}

/// Collects (name, factory) pairs into a lookup map.
fn factory_map<F>(implementations: Vec<(&'static str, F)>) -> HashMap<String, F> {
	implementations
		.into_iter()
		.map(|(name, factory)| (name.to_string(), factory))
		.collect()
}

/// Builds the relay engine with every registered implementation.
async fn build_relay(config: Config) -> Result<RelayEngine, Box<dyn std::error::Error>> {
	let factories: RelayFactories<AccountFactory, SmartAccountFactory, DeliveryFactory> =
		RelayFactories {
			account_factories: factory_map(relay_account::get_all_implementations()),
			smart_account_factories: factory_map(
				relay_account::get_all_smart_account_implementations(),
			),
			delivery_factories: factory_map(relay_delivery::get_all_implementations()),
		};

	Ok(RelayBuilder::new(config).build(factories).await?)
}
