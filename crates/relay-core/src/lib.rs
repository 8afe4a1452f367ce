//! Core engine for the sponsored transaction relay.
//!
//! Intents are dispatched through a conventional or a smart-account wallet;
//! the resulting hashes, together with hashes submitted elsewhere, are
//! tracked by per-chain receipt pollers until confirmed. Outcomes are
//! published on the [`EventBus`](engine::event_bus::EventBus).

pub mod builder;
pub mod dispatch;
pub mod engine;
pub mod handlers;
pub mod monitoring;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use builder::{BuilderError, RelayBuilder, RelayFactories};
pub use engine::{event_bus::EventBus, EngineError, RelayEngine};
pub use handlers::{IntentError, TransactionError};
