//! Formatting and time helpers shared across the relay.

pub mod formatting;
pub mod helpers;

pub use formatting::{truncate_id, with_0x_prefix, without_0x_prefix};
pub use helpers::{current_timestamp_ms, minutes_between};
