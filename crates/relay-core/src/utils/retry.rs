//! Bounded retry with jittered waits and cooperative cancellation.
//!
//! The operation reports each failure as [`Attempt::Retryable`] or
//! [`Attempt::Fatal`]. Retryable failures are retried up to the budget's
//! `attempts`, each after a wait drawn uniformly from
//! `[min_wait_ms, max_wait_ms]`. Fatal failures end the loop at once.

use backoff::backoff::Backoff;
use rand::Rng;
use relay_types::RetryBudget;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use super::cancel::CancelSignal;

/// Failure of a single attempt.
#[derive(Debug)]
pub enum Attempt<E> {
	Retryable(E),
	Fatal(E),
}

/// Final failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
	/// Every attempt failed retryably; carries the last error.
	#[error("Retries exhausted: {0}")]
	Exhausted(E),
	#[error("Non-retryable error: {0}")]
	Fatal(E),
	#[error("Cancelled")]
	Cancelled,
}

/// Backoff yielding `attempts` waits drawn uniformly from the budget's window.
#[derive(Debug, Clone)]
pub struct JitteredBackoff {
	budget: RetryBudget,
	remaining: u32,
}

impl JitteredBackoff {
	pub fn new(budget: RetryBudget) -> Self {
		Self {
			budget,
			remaining: budget.attempts,
		}
	}
}

impl Backoff for JitteredBackoff {
	fn reset(&mut self) {
		self.remaining = self.budget.attempts;
	}

	fn next_backoff(&mut self) -> Option<Duration> {
		if self.remaining == 0 {
			return None;
		}
		self.remaining -= 1;

		let min = self.budget.min_wait();
		let max = self.budget.max_wait();
		if min == max {
			return Some(min);
		}
		let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
		Some(Duration::from_millis(millis))
	}
}

/// Runs `op` until it succeeds, fails fatally, exhausts `budget` or `cancel`
/// fires. Cancellation is checked before every attempt and interrupts both a
/// running attempt and a wait.
pub async fn retry<T, E, F, Fut>(
	budget: RetryBudget,
	cancel: &CancelSignal,
	mut op: F,
) -> Result<T, RetryError<E>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, Attempt<E>>>,
{
	let mut backoff = JitteredBackoff::new(budget);

	loop {
		if cancel.is_cancelled() {
			return Err(RetryError::Cancelled);
		}

		let outcome = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(RetryError::Cancelled),
			outcome = op() => outcome,
		};

		let error = match outcome {
			Ok(value) => return Ok(value),
			Err(Attempt::Fatal(error)) => return Err(RetryError::Fatal(error)),
			Err(Attempt::Retryable(error)) => error,
		};

		let Some(wait) = backoff.next_backoff() else {
			return Err(RetryError::Exhausted(error));
		};

		tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(RetryError::Cancelled),
			_ = tokio::time::sleep(wait) => {},
		}
	}
}
