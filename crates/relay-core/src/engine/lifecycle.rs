//! Startup and shutdown of the relay engine.

use super::{EngineError, RelayEngine};

impl RelayEngine {
	/// Brings up the smart account client.
	///
	/// A client that fails to come up leaves the relay running; each smart
	/// account submission retries initialization before checking readiness.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(relay_id = %self.config.relay.id, "Initializing relay engine");

		if let Some(account) = &self.smart_account {
			match account.initialize().await {
				Ok(()) => tracing::info!("Smart account client ready"),
				Err(e) => tracing::warn!(error = %e, "Smart account client unavailable"),
			}
		}
		Ok(())
	}

	/// Stops the pollers and the event loop started by [`RelayEngine::run`].
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down relay engine");
		self.shutdown.cancel();
		Ok(())
	}
}
