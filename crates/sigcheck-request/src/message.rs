//! Typed-data message normalization.
//!
//! Callers submit typed data as JSON text, but depending on the client it may
//! have been stringified once, twice or three times. [`normalize_message`]
//! peels off at most [`MAX_DECODE_DEPTH`] layers of JSON string encoding and
//! then checks that the result has the shape the signing scheme expects.

use crate::RequestError;
use serde_json::Value;

/// Maximum number of JSON decodes applied to a message.
pub const MAX_DECODE_DEPTH: usize = 3;

/// Structural shape a typed-data message must have after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
	/// `eth_signTypedData_v1`: a non-empty array of `{type, name, value}`.
	Legacy,
	/// `eth_signTypedData_v3`/`v4`: an object with `types`, `primaryType`,
	/// `domain` and `message`.
	Eip712,
}

/// Parses raw message text into a typed-data structure.
pub fn parse_message(raw: &str, shape: MessageShape) -> Result<Value, RequestError> {
	normalize_message(Value::String(raw.to_string()), shape)
}

/// Decodes string layers from `value` and validates the resulting shape.
///
/// A value that is already structured is only validated.
pub fn normalize_message(value: Value, shape: MessageShape) -> Result<Value, RequestError> {
	let mut current = value;
	let mut depth = 0;

	while let Value::String(text) = current {
		if depth == MAX_DECODE_DEPTH {
			return Err(RequestError::MalformedMessage(format!(
				"message is still a string after {} JSON decodes",
				MAX_DECODE_DEPTH
			)));
		}
		current = serde_json::from_str(&text).map_err(|e| {
			RequestError::MalformedMessage(format!("invalid JSON at level {}: {}", depth + 1, e))
		})?;
		depth += 1;
	}

	tracing::trace!(depth, ?shape, "Decoded typed-data message");

	match shape {
		MessageShape::Legacy => check_legacy(&current)?,
		MessageShape::Eip712 => check_eip712(&current)?,
	}

	Ok(current)
}

fn check_legacy(value: &Value) -> Result<(), RequestError> {
	let entries = value.as_array().ok_or_else(|| {
		RequestError::MalformedMessage("typed data v1 must be an array of entries".into())
	})?;
	if entries.is_empty() {
		return Err(RequestError::MalformedMessage(
			"typed data v1 must contain at least one entry".into(),
		));
	}

	for (index, entry) in entries.iter().enumerate() {
		let object = entry.as_object().ok_or_else(|| {
			RequestError::MalformedMessage(format!("entry {} must be an object", index))
		})?;
		for key in ["type", "name"] {
			if !object.get(key).is_some_and(Value::is_string) {
				return Err(RequestError::MalformedMessage(format!(
					"entry {} is missing string field '{}'",
					index, key
				)));
			}
		}
		if !object.contains_key("value") {
			return Err(RequestError::MalformedMessage(format!(
				"entry {} is missing field 'value'",
				index
			)));
		}
	}

	Ok(())
}

fn check_eip712(value: &Value) -> Result<(), RequestError> {
	let object = value.as_object().ok_or_else(|| {
		RequestError::MalformedMessage("typed data must be a JSON object".into())
	})?;

	let checks: [(&str, fn(&Value) -> bool, &str); 4] = [
		("types", Value::is_object, "an object"),
		("primaryType", Value::is_string, "a string"),
		("domain", Value::is_object, "an object"),
		("message", Value::is_object, "an object"),
	];

	for (key, is_valid, expected) in checks {
		match object.get(key) {
			None => {
				return Err(RequestError::MalformedMessage(format!(
					"typed data is missing '{}'",
					key
				)))
			},
			Some(field) if !is_valid(field) => {
				return Err(RequestError::MalformedMessage(format!(
					"typed data field '{}' must be {}",
					key, expected
				)))
			},
			Some(_) => {},
		}
	}

	Ok(())
}
