//! Cooperative cancellation.
//!
//! A [`CancelHandle`] owns the right to cancel; any number of
//! [`CancelSignal`]s observe it. Dropping the handle cancels as well, so a
//! task can never outlive the scope that started it unnoticed.

use tokio::sync::watch;

/// Cancels every signal created from it.
#[derive(Debug)]
pub struct CancelHandle {
	sender: watch::Sender<bool>,
}

/// Observes a [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct CancelSignal {
	receiver: Option<watch::Receiver<bool>>,
}

/// Creates a connected handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
	let (sender, receiver) = watch::channel(false);
	(
		CancelHandle { sender },
		CancelSignal {
			receiver: Some(receiver),
		},
	)
}

impl CancelHandle {
	pub fn cancel(&self) {
		self.sender.send_replace(true);
	}

	pub fn signal(&self) -> CancelSignal {
		CancelSignal {
			receiver: Some(self.sender.subscribe()),
		}
	}
}

impl CancelSignal {
	/// A signal that is never cancelled.
	pub fn never() -> Self {
		Self { receiver: None }
	}

	pub fn is_cancelled(&self) -> bool {
		match &self.receiver {
			None => false,
			Some(receiver) => *receiver.borrow() || receiver.has_changed().is_err(),
		}
	}

	/// Resolves once cancelled. Pending forever for [`CancelSignal::never`].
	pub async fn cancelled(&self) {
		match &self.receiver {
			None => std::future::pending::<()>().await,
			Some(receiver) => {
				let mut receiver = receiver.clone();
				// Err means the handle was dropped
				let _ = receiver.wait_for(|cancelled| *cancelled).await;
			},
		}
	}
}
