//! Legacy typed data (`eth_signTypedData_v1`).
//!
//! The payload is a flat list of `{type, name, value}` entries. Its hash is
//! `keccak256(keccak256(packed schema) || keccak256(packed values))` where the
//! schema is the list of `"<type> <name>"` strings, and both sides use Solidity
//! packed encoding.

use super::{array_element_type, parse_dynamic_bytes, parse_string, AtomicType, TypedDataError};
use alloy_primitives::{keccak256, B256};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct LegacyEntry {
	#[serde(rename = "type")]
	ty: String,
	name: String,
	value: Value,
}

/// Hashes a v1 typed-data payload.
pub fn hash_legacy(data: &Value) -> Result<B256, TypedDataError> {
	let entries: Vec<LegacyEntry> =
		serde_json::from_value(data.clone()).map_err(|e| TypedDataError::Invalid(e.to_string()))?;
	if entries.is_empty() {
		return Err(TypedDataError::Invalid("expected at least one entry".into()));
	}

	let mut schema = Vec::new();
	let mut values = Vec::new();
	for entry in &entries {
		if entry.name.is_empty() {
			return Err(TypedDataError::Invalid(format!(
				"entry of type '{}' has no name",
				entry.ty
			)));
		}
		schema.extend_from_slice(format!("{} {}", entry.ty, entry.name).as_bytes());
		encode_packed(&entry.ty, &entry.value, &mut values)?;
	}

	let mut outer = Vec::with_capacity(64);
	outer.extend_from_slice(keccak256(&schema).as_slice());
	outer.extend_from_slice(keccak256(&values).as_slice());
	Ok(keccak256(outer))
}

/// Appends the packed encoding of `value` to `out`.
///
/// Array elements are padded to 32 bytes each, as `abi.encodePacked` does.
fn encode_packed(ty: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), TypedDataError> {
	if let Some(element) = array_element_type(ty) {
		let atomic = AtomicType::parse(element)
			.ok_or_else(|| TypedDataError::UnknownType(element.to_string()))?;
		let items = value.as_array().ok_or_else(|| TypedDataError::InvalidValue {
			ty: ty.to_string(),
			value: value.to_string(),
		})?;
		for item in items {
			out.extend_from_slice(&atomic.encode_word(element, item)?);
		}
		return Ok(());
	}

	match ty {
		"string" => out.extend_from_slice(parse_string(ty, value)?),
		"bytes" => out.extend_from_slice(&parse_dynamic_bytes(ty, value)?),
		_ => {
			let atomic =
				AtomicType::parse(ty).ok_or_else(|| TypedDataError::UnknownType(ty.to_string()))?;
			out.extend_from_slice(&atomic.encode_packed(ty, value)?);
		},
	}
	Ok(())
}
