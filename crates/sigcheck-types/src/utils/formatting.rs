//! Hex string helpers for wallet payloads and log output.

/// Shortens a hex value such as a signature to its first ten characters for
/// log lines.
pub fn truncate_id(id: &str) -> String {
	match id.get(..10) {
		Some(head) if id.len() > 10 => format!("{}..", head),
		_ => id.to_string(),
	}
}

/// Strips a leading "0x" or "0X".
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Hex-encodes the UTF-8 bytes of `text` with a "0x" prefix.
///
/// This is the payload encoding wallets expect for `eth_sign` and
/// `personal_sign`.
pub fn utf8_to_hex(text: &str) -> String {
	format!("0x{}", hex::encode(text.as_bytes()))
}
