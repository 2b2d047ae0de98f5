//! Typed-data hashing for `eth_signTypedData_*` signatures.
//!
//! - [`legacy`] hashes v1 payloads (an array of `{type, name, value}` entries)
//!   with Solidity packed encoding.
//! - [`eip712`] hashes v3 and v4 payloads per EIP-712.
//!
//! Both share the atomic value encoding defined here.

use alloy_primitives::{I256, U256};
use serde::Deserialize;
use serde_json::{Map, Value};
use sigcheck_types::{parse_address, parse_hex_bytes};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod eip712;
pub mod legacy;

pub use eip712::{hash_typed_data, Eip712Version};
pub use legacy::hash_legacy;

/// Errors that can occur while hashing typed data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypedDataError {
	#[error("Invalid typed data: {0}")]
	Invalid(String),
	#[error("Unknown type '{0}'")]
	UnknownType(String),
	#[error("Missing value for field '{field}' of type '{ty}'")]
	MissingField { field: String, ty: String },
	#[error("Invalid value for type '{ty}': {value}")]
	InvalidValue { ty: String, value: String },
	#[error("Arrays are unimplemented in eth_signTypedData_v3; use eth_signTypedData_v4")]
	ArraysUnsupported,
}

impl TypedDataError {
	fn invalid_value(ty: &str, value: &Value) -> Self {
		TypedDataError::InvalidValue {
			ty: ty.to_string(),
			value: value.to_string(),
		}
	}
}

/// A member of a typed-data struct definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypedField {
	pub name: String,
	#[serde(rename = "type")]
	pub ty: String,
}

impl TypedField {
	pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			ty: ty.into(),
		}
	}
}

/// Struct definitions keyed by type name.
pub type TypeDefinitions = BTreeMap<String, Vec<TypedField>>;

/// EIP-712 typed data as submitted to `eth_signTypedData_v3`/`v4`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
	pub types: TypeDefinitions,
	pub primary_type: String,
	pub domain: Map<String, Value>,
	pub message: Map<String, Value>,
}

impl TypedData {
	/// Builds typed data from a decoded JSON value.
	pub fn from_value(value: Value) -> Result<Self, TypedDataError> {
		serde_json::from_value(value).map_err(|e| TypedDataError::Invalid(e.to_string()))
	}
}

/// Returns the element type of an array type, e.g. `Person` for `Person[]`
/// and `uint8[2]` for `uint8[2][]`.
pub(crate) fn array_element_type(ty: &str) -> Option<&str> {
	if !ty.ends_with(']') {
		return None;
	}
	ty.rfind('[').map(|pos| &ty[..pos])
}

/// Fixed-size Solidity types that encode into a single 32-byte word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AtomicType {
	Address,
	Bool,
	Uint(usize),
	Int(usize),
	FixedBytes(usize),
}

impl AtomicType {
	pub(crate) fn parse(ty: &str) -> Option<Self> {
		match ty {
			"address" => return Some(AtomicType::Address),
			"bool" => return Some(AtomicType::Bool),
			"byte" => return Some(AtomicType::FixedBytes(1)),
			_ => {},
		}

		if let Some(bits) = ty.strip_prefix("uint") {
			return integer_bits(bits).map(AtomicType::Uint);
		}
		if let Some(bits) = ty.strip_prefix("int") {
			return integer_bits(bits).map(AtomicType::Int);
		}
		if let Some(size) = ty.strip_prefix("bytes") {
			let size: usize = size.parse().ok()?;
			return (1..=32).contains(&size).then_some(AtomicType::FixedBytes(size));
		}
		None
	}

	/// Size in bytes under Solidity packed encoding.
	pub(crate) fn packed_size(&self) -> usize {
		match *self {
			AtomicType::Address => 20,
			AtomicType::Bool => 1,
			AtomicType::Uint(bits) | AtomicType::Int(bits) => bits / 8,
			AtomicType::FixedBytes(size) => size,
		}
	}

	/// Encodes `value` as a 32-byte ABI word.
	pub(crate) fn encode_word(&self, ty: &str, value: &Value) -> Result<[u8; 32], TypedDataError> {
		let mut word = [0u8; 32];
		match *self {
			AtomicType::Address => {
				let address = value
					.as_str()
					.and_then(|text| parse_address(text).ok())
					.ok_or_else(|| TypedDataError::invalid_value(ty, value))?;
				word[12..].copy_from_slice(address.as_slice());
			},
			AtomicType::Bool => {
				word[31] = parse_bool(ty, value)? as u8;
			},
			AtomicType::Uint(bits) => {
				let number = parse_uint(ty, value)?;
				if number.bit_len() > bits {
					return Err(TypedDataError::invalid_value(ty, value));
				}
				word = number.to_be_bytes::<32>();
			},
			AtomicType::Int(bits) => {
				word = parse_int(ty, value)?.into_raw().to_be_bytes::<32>();
				if !fits_signed(&word, bits) {
					return Err(TypedDataError::invalid_value(ty, value));
				}
			},
			AtomicType::FixedBytes(size) => {
				let bytes = value
					.as_str()
					.and_then(|text| decode_hex(text).ok())
					.ok_or_else(|| TypedDataError::invalid_value(ty, value))?;
				if bytes.len() > size {
					return Err(TypedDataError::invalid_value(ty, value));
				}
				word[..bytes.len()].copy_from_slice(&bytes);
			},
		}
		Ok(word)
	}

	/// Encodes `value` with Solidity packed encoding.
	pub(crate) fn encode_packed(&self, ty: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
		let word = self.encode_word(ty, value)?;
		let size = self.packed_size();
		Ok(match self {
			AtomicType::FixedBytes(_) => word[..size].to_vec(),
			_ => word[32 - size..].to_vec(),
		})
	}
}

fn integer_bits(bits: &str) -> Option<usize> {
	if bits.is_empty() {
		return Some(256);
	}
	let bits: usize = bits.parse().ok()?;
	(bits % 8 == 0 && (8..=256).contains(&bits)).then_some(bits)
}

/// Checks that a two's complement word is representable in `bits` bits.
fn fits_signed(word: &[u8; 32], bits: usize) -> bool {
	let unused = 32 - bits / 8;
	let fill = if word[0] & 0x80 != 0 { 0xff } else { 0x00 };
	word[..unused].iter().all(|byte| *byte == fill)
		&& (unused == 0 || (word[unused] & 0x80 != 0) == (fill == 0xff))
}

fn parse_bool(ty: &str, value: &Value) -> Result<bool, TypedDataError> {
	match value {
		Value::Bool(flag) => Ok(*flag),
		Value::String(text) if text == "true" => Ok(true),
		Value::String(text) if text == "false" => Ok(false),
		Value::Number(number) => match number.as_u64() {
			Some(0) => Ok(false),
			Some(1) => Ok(true),
			_ => Err(TypedDataError::invalid_value(ty, value)),
		},
		_ => Err(TypedDataError::invalid_value(ty, value)),
	}
}

/// Parses an unsigned integer from a JSON number, decimal string or hex string.
fn parse_uint(ty: &str, value: &Value) -> Result<U256, TypedDataError> {
	let parsed = match value {
		Value::Number(number) => number.as_u64().map(U256::from),
		Value::String(text) => match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
			Some(hex) => U256::from_str_radix(hex, 16).ok(),
			None => U256::from_str_radix(text, 10).ok(),
		},
		_ => None,
	};
	parsed.ok_or_else(|| TypedDataError::invalid_value(ty, value))
}

/// Parses a signed integer from a JSON number, decimal string or hex string.
fn parse_int(ty: &str, value: &Value) -> Result<I256, TypedDataError> {
	let parsed = match value {
		Value::Number(number) if number.is_i64() || number.is_u64() => {
			I256::from_dec_str(&number.to_string()).ok()
		},
		Value::String(text) if text.starts_with("0x") || text.starts_with("-0x") => {
			I256::from_hex_str(text).ok()
		},
		Value::String(text) => I256::from_dec_str(text).ok(),
		_ => None,
	};
	parsed.ok_or_else(|| TypedDataError::invalid_value(ty, value))
}

/// Decodes dynamic `bytes`: hex when `0x`-prefixed, UTF-8 text otherwise.
pub(crate) fn parse_dynamic_bytes(ty: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
	match value {
		Value::String(text) if text.starts_with("0x") => {
			decode_hex(text).map_err(|_| TypedDataError::invalid_value(ty, value))
		},
		Value::String(text) => Ok(text.as_bytes().to_vec()),
		Value::Number(number) => {
			let number = number
				.as_u64()
				.ok_or_else(|| TypedDataError::invalid_value(ty, value))?;
			let bytes = number.to_be_bytes();
			let start = bytes.iter().position(|byte| *byte != 0).unwrap_or(bytes.len());
			Ok(bytes[start..].to_vec())
		},
		_ => Err(TypedDataError::invalid_value(ty, value)),
	}
}

/// Returns the UTF-8 bytes of a `string` value.
pub(crate) fn parse_string<'a>(ty: &str, value: &'a Value) -> Result<&'a [u8], TypedDataError> {
	value
		.as_str()
		.map(str::as_bytes)
		.ok_or_else(|| TypedDataError::invalid_value(ty, value))
}

fn decode_hex(text: &str) -> Result<Vec<u8>, sigcheck_types::ConversionError> {
	parse_hex_bytes(text).map(Vec::from)
}
