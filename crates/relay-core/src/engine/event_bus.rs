//! In-process event bus.
//!
//! A broadcast channel carrying [`RelayEvent`]s. Every subscriber sees every
//! event published after it subscribed; a subscriber that falls more than
//! `capacity` events behind loses the oldest ones.

use relay_types::RelayEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<RelayEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
		self.sender.subscribe()
	}

	/// Publishes `event`. Fails only when nobody is subscribed; publishers
	/// that do not care call `.ok()`.
	pub fn publish(&self, event: RelayEvent) -> Result<(), broadcast::error::SendError<RelayEvent>> {
		self.sender.send(event).map(|_| ())
	}
}
