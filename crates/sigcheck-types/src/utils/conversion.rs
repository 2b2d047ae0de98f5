//! Conversion utilities for hex-encoded inputs.
//!
//! Addresses and signatures arrive as user-supplied hex strings. These helpers
//! turn them into typed values and report what was wrong when they can't.

use super::formatting::without_0x_prefix;
use alloy_primitives::{Address, Bytes};
use thiserror::Error;

/// Errors that can occur while decoding hex inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
	/// The input is not valid hex.
	#[error("Invalid hex '{input}': {message}")]
	InvalidHex { input: String, message: String },
	/// The input is not a 20-byte address.
	#[error("Invalid address '{0}'")]
	InvalidAddress(String),
}

/// Parses a hex address in any letter case.
///
/// Checksums are not enforced: mixed-case input is accepted as long as it
/// decodes to 20 bytes.
pub fn parse_address(input: &str) -> Result<Address, ConversionError> {
	let trimmed = input.trim();
	let digits = without_0x_prefix(trimmed);
	if digits.len() != 40 {
		return Err(ConversionError::InvalidAddress(input.to_string()));
	}
	let bytes = hex::decode(digits).map_err(|_| ConversionError::InvalidAddress(input.to_string()))?;
	Ok(Address::from_slice(&bytes))
}

/// Decodes a hex string, with or without "0x" prefix, into bytes.
pub fn parse_hex_bytes(input: &str) -> Result<Bytes, ConversionError> {
	let digits = without_0x_prefix(input.trim());
	hex::decode(digits)
		.map(Bytes::from)
		.map_err(|e| ConversionError::InvalidHex {
			input: input.to_string(),
			message: e.to_string(),
		})
}
