//! Shared relay state.
//!
//! The pending-transaction registry is the only mutable state shared between
//! the pollers, the intent path and the HTTP API.

pub mod registry;

pub use registry::PendingRegistry;
