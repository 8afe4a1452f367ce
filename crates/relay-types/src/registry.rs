//! Registry trait for self-registering implementations.

/// Pairs a pluggable implementation with the name it is configured under and
/// the factory that builds it.
///
/// Names match the keys of `implementations` tables in the configuration,
/// e.g. `local` for `[account.implementations.local]` or `evm_alloy` for
/// `[delivery.implementations.evm_alloy]`.
pub trait ImplementationRegistry {
	/// Configuration key of this implementation.
	const NAME: &'static str;

	/// Factory function type, defined by the owning crate.
	type Factory;

	fn factory() -> Self::Factory;
}
