//! Handlers for the two ways a transaction enters the relay: an intent the
//! relay dispatches itself, or a hash submitted elsewhere.

pub mod intent;
pub mod transaction;

pub use intent::{IntentError, IntentHandler};
pub use transaction::{TransactionError, TransactionHandler};
