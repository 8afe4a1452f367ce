//! Receipt polling for submitted transactions.
//!
//! [`policy`] decides when a pending transaction is due for a check;
//! [`receipt`] runs one poller per chain and reports outcomes on the event bus.

pub mod policy;
pub mod receipt;

pub use policy::should_check;
pub use receipt::ReceiptPoller;
