//! String formatting utilities for hashes and hex values.

/// Shortens a hash or id for log output: the first 10 characters (enough for
/// "0x" plus eight hex digits) followed by "..".
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(10) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Adds a "0x" prefix unless one (in either case) is already present.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Strips a leading "0x" or "0X".
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x12345678"), "0x12345678");
		assert_eq!(
			truncate_id("0x1234567890abcdef1234567890abcdef"),
			"0x12345678.."
		);
		assert_eq!(truncate_id(""), "");
	}

	#[test]
	fn test_prefix_helpers() {
		let bare = "5fbdb2315678afecb367f032d93f642f64180aa3";
		assert_eq!(with_0x_prefix(bare), format!("0x{}", bare));
		assert_eq!(with_0x_prefix(&format!("0X{}", bare)), format!("0X{}", bare));
		assert_eq!(without_0x_prefix(&format!("0x{}", bare)), bare);
		assert_eq!(without_0x_prefix(&format!("0X{}", bare)), bare);
		assert_eq!(without_0x_prefix(bare), bare);
	}
}
