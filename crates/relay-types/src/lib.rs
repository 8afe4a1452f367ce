//! Common types for the sponsored transaction relay.
//!
//! This crate defines the data model shared by every relay component: pending
//! transactions and their receipts, transaction intents, sponsorship decisions,
//! the user-facing error taxonomy and the events exchanged between services.

/// HTTP API request and response types.
pub mod api;
/// Transaction hashes, receipts and conventional transaction requests.
pub mod delivery;
/// User-facing error taxonomy.
pub mod errors;
/// Event types for inter-service communication.
pub mod events;
/// Transaction intents, wallet kinds and sponsorship decisions.
pub mod intent;
/// Network configuration and per-chain retry budgets.
pub mod networks;
/// Pending transaction tracking records.
pub mod pending;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Redacted string type for credentials and keys.
pub mod secret_string;
/// Formatting and time helpers.
pub mod utils;
/// Configuration validation types for implementation tables.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, U256};
pub use api::*;
pub use delivery::*;
pub use errors::*;
pub use events::*;
pub use intent::*;
pub use networks::{NetworkConfig, NetworksConfig, RetryBudget};
pub use pending::PendingTransaction;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{current_timestamp_ms, truncate_id, with_0x_prefix, without_0x_prefix};
pub use validation::*;
