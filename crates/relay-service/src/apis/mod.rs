//! Request handling behind the HTTP routes.

pub mod intent;
pub mod transaction;
