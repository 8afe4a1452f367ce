//! Cancellation and retry utilities shared by the poller and the dispatcher.

pub mod cancel;
pub mod retry;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use retry::{retry, Attempt, JitteredBackoff, RetryError};
