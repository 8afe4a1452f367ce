//! Time helpers.

/// Current UNIX time in milliseconds, or 0 if the clock is before the epoch.
pub fn current_timestamp_ms() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}

/// Whole and fractional minutes elapsed between two millisecond timestamps.
///
/// Returns 0 when `later` precedes `earlier`.
pub fn minutes_between(earlier_ms: u64, later_ms: u64) -> f64 {
	later_ms.saturating_sub(earlier_ms) as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_minutes_between() {
		assert_eq!(minutes_between(0, 90_000), 1.5);
		assert_eq!(minutes_between(5_000, 1_000), 0.0);
	}
}
