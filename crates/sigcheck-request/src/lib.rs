//! Request formatting for wallet signing methods.
//!
//! Each [`SigningMethod`] has a static [`RequestSpec`] describing the fields a
//! caller must supply and how those fields become the positional `params` of
//! the JSON-RPC call sent to the wallet. The argument order differs between
//! sibling methods (`eth_sign` vs `personal_sign`, typed data v1 vs v3/v4);
//! each spec encodes its own order.

use serde::Serialize;
use serde_json::Value;
use sigcheck_types::{utf8_to_hex, SigningMethod};
use std::collections::HashMap;
use thiserror::Error;

pub mod message;

pub use message::{normalize_message, parse_message, MessageShape, MAX_DECODE_DEPTH};

/// Errors that can occur while formatting a signing request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
	/// The method name has no registered request spec.
	#[error("Unknown method: {0}")]
	UnknownMethod(String),
	/// A required field was not supplied.
	#[error("Missing required field '{field}' for {method}")]
	MissingField {
		method: SigningMethod,
		field: &'static str,
	},
	/// The message could not be decoded into typed data.
	#[error("Malformed message: {0}")]
	MalformedMessage(String),
}

/// User-supplied fields keyed by field name.
pub type Fields = HashMap<String, String>;

/// Formatting function turning validated fields into positional params.
pub type FormatFn = fn(&FieldValues<'_>) -> Result<Vec<Value>, RequestError>;

/// The fields of a request being formatted for one signing method.
#[derive(Debug, Clone, Copy)]
pub struct FieldValues<'a> {
	method: SigningMethod,
	fields: &'a Fields,
}

impl<'a> FieldValues<'a> {
	pub fn new(method: SigningMethod, fields: &'a Fields) -> Self {
		Self { method, fields }
	}

	/// Returns the value of `key`, or [`RequestError::MissingField`].
	pub fn get(&self, key: &'static str) -> Result<&'a str, RequestError> {
		self.fields
			.get(key)
			.map(String::as_str)
			.ok_or(RequestError::MissingField {
				method: self.method,
				field: key,
			})
	}
}

/// A named input of a signing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NamedField {
	pub key: &'static str,
	pub required: bool,
}

impl NamedField {
	pub const fn required(key: &'static str) -> Self {
		Self {
			key,
			required: true,
		}
	}
}

/// Immutable descriptor of one signing method's request format.
#[derive(Debug, Clone, Copy)]
pub struct RequestSpec {
	pub method: SigningMethod,
	pub params: &'static [NamedField],
	format: FormatFn,
}

/// Every signing method takes the message and the signer address.
const MESSAGE_AND_ADDRESS: &[NamedField] = &[
	NamedField::required("message"),
	NamedField::required("address"),
];

const ETH_SIGN: RequestSpec = RequestSpec {
	method: SigningMethod::EthSign,
	params: MESSAGE_AND_ADDRESS,
	format: |values| {
		Ok(vec![
			Value::String(values.get("address")?.to_string()),
			Value::String(utf8_to_hex(values.get("message")?)),
		])
	},
};

const PERSONAL_SIGN: RequestSpec = RequestSpec {
	method: SigningMethod::PersonalSign,
	params: MESSAGE_AND_ADDRESS,
	format: |values| {
		Ok(vec![
			Value::String(utf8_to_hex(values.get("message")?)),
			Value::String(values.get("address")?.to_string()),
		])
	},
};

const SIGN_TYPED_DATA_V1: RequestSpec = RequestSpec {
	method: SigningMethod::SignTypedDataV1,
	params: MESSAGE_AND_ADDRESS,
	format: |values| {
		Ok(vec![
			parse_message(values.get("message")?, MessageShape::Legacy)?,
			Value::String(values.get("address")?.to_string()),
		])
	},
};

const SIGN_TYPED_DATA_V3: RequestSpec = RequestSpec {
	method: SigningMethod::SignTypedDataV3,
	params: MESSAGE_AND_ADDRESS,
	format: |values| {
		Ok(vec![
			Value::String(values.get("address")?.to_string()),
			parse_message(values.get("message")?, MessageShape::Eip712)?,
		])
	},
};

const SIGN_TYPED_DATA_V4: RequestSpec = RequestSpec {
	method: SigningMethod::SignTypedDataV4,
	params: MESSAGE_AND_ADDRESS,
	format: |values| {
		Ok(vec![
			Value::String(values.get("address")?.to_string()),
			parse_message(values.get("message")?, MessageShape::Eip712)?,
		])
	},
};

static SIGN_MESSAGE_METHODS: [RequestSpec; 5] = [
	ETH_SIGN,
	PERSONAL_SIGN,
	SIGN_TYPED_DATA_V1,
	SIGN_TYPED_DATA_V3,
	SIGN_TYPED_DATA_V4,
];

/// Returns the registry of all signing request specs.
pub fn sign_message_methods() -> &'static [RequestSpec] {
	&SIGN_MESSAGE_METHODS
}

impl RequestSpec {
	/// Returns the spec for a signing method.
	pub fn for_method(method: SigningMethod) -> &'static RequestSpec {
		match method {
			SigningMethod::EthSign => &SIGN_MESSAGE_METHODS[0],
			SigningMethod::PersonalSign => &SIGN_MESSAGE_METHODS[1],
			SigningMethod::SignTypedDataV1 => &SIGN_MESSAGE_METHODS[2],
			SigningMethod::SignTypedDataV3 => &SIGN_MESSAGE_METHODS[3],
			SigningMethod::SignTypedDataV4 => &SIGN_MESSAGE_METHODS[4],
		}
	}

	/// Validates required fields and produces the positional call arguments.
	pub fn format(&self, fields: &Fields) -> Result<Vec<Value>, RequestError> {
		if let Some(missing) = self
			.params
			.iter()
			.find(|param| param.required && !fields.contains_key(param.key))
		{
			return Err(RequestError::MissingField {
				method: self.method,
				field: missing.key,
			});
		}

		(self.format)(&FieldValues::new(self.method, fields))
	}
}

/// A formatted wallet call ready to be sent over JSON-RPC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
	pub method: SigningMethod,
	pub params: Vec<Value>,
}

impl RpcRequest {
	/// Renders the JSON-RPC 2.0 envelope with the given request id.
	pub fn to_json_rpc(&self, id: u64) -> Value {
		serde_json::json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": self.method,
			"params": self.params,
		})
	}
}

/// Formats the positional arguments for `method`.
///
/// # Errors
///
/// - [`RequestError::UnknownMethod`] if `method` is not a signing method
/// - [`RequestError::MissingField`] if a required field is absent
/// - [`RequestError::MalformedMessage`] if a typed-data message can't be decoded
pub fn format(method: &str, fields: &Fields) -> Result<Vec<Value>, RequestError> {
	Ok(format_request(method, fields)?.params)
}

/// Formats a complete wallet request for `method`.
pub fn format_request(method: &str, fields: &Fields) -> Result<RpcRequest, RequestError> {
	let method: SigningMethod = method
		.parse()
		.map_err(|_| RequestError::UnknownMethod(method.to_string()))?;
	let params = RequestSpec::for_method(method).format(fields)?;
	tracing::debug!(%method, params = params.len(), "Formatted signing request");
	Ok(RpcRequest { method, params })
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	const ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	fn fields(message: &str) -> Fields {
		HashMap::from([
			("message".to_string(), message.to_string()),
			("address".to_string(), ADDRESS.to_string()),
		])
	}

	fn typed_data() -> Value {
		json!({
			"types": {
				"EIP712Domain": [
					{"name": "name", "type": "string"},
					{"name": "chainId", "type": "uint256"}
				],
				"Person": [
					{"name": "name", "type": "string"},
					{"name": "wallet", "type": "address"}
				]
			},
			"primaryType": "Person",
			"domain": {"name": "Playground", "chainId": 1},
			"message": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"}
		})
	}

	fn legacy_data() -> Value {
		json!([
			{"type": "string", "name": "Message", "value": "Hi, Alice!"},
			{"type": "uint32", "name": "A number", "value": "1337"}
		])
	}

	#[test]
	fn test_registry_covers_every_method() {
		let registered: Vec<_> = sign_message_methods().iter().map(|s| s.method).collect();
		assert_eq!(registered, SigningMethod::ALL.to_vec());
		for method in SigningMethod::ALL {
			assert_eq!(RequestSpec::for_method(method).method, method);
		}
	}

	#[test]
	fn test_every_method_formats_two_arguments() {
		for method in SigningMethod::ALL {
			let message = if method == SigningMethod::SignTypedDataV1 {
				legacy_data().to_string()
			} else if method.is_typed_data() {
				typed_data().to_string()
			} else {
				"hello".to_string()
			};
			let params = format(method.as_str(), &fields(&message)).unwrap();
			assert_eq!(params.len(), 2, "{}", method);
		}
	}

	#[test]
	fn test_missing_required_field() {
		for method in SigningMethod::ALL {
			let mut only_message = fields("hello");
			only_message.remove("address");
			let err = format(method.as_str(), &only_message).unwrap_err();
			assert_eq!(
				err,
				RequestError::MissingField {
					method,
					field: "address"
				}
			);

			let mut only_address = fields("hello");
			only_address.remove("message");
			let err = format(method.as_str(), &only_address).unwrap_err();
			assert!(err.to_string().contains("'message'"));
		}
	}

	#[test]
	fn test_field_lookup_reports_method() {
		let mut only_message = fields("hello");
		only_message.remove("address");
		let values = FieldValues::new(SigningMethod::PersonalSign, &only_message);
		let missing = RequestError::MissingField {
			method: SigningMethod::PersonalSign,
			field: "address",
		};

		assert_eq!(values.get("message").unwrap(), "hello");
		assert_eq!(values.get("address").unwrap_err(), missing);

		// Formatting functions see the same error when called directly
		let spec = RequestSpec::for_method(SigningMethod::PersonalSign);
		assert_eq!((spec.format)(&values).unwrap_err(), missing);
	}

	#[test]
	fn test_unknown_method() {
		let err = format("eth_signTransaction", &fields("hello")).unwrap_err();
		assert_eq!(
			err,
			RequestError::UnknownMethod("eth_signTransaction".to_string())
		);
	}

	#[test]
	fn test_eth_sign_and_personal_sign_are_reversed() {
		let eth_sign = format("eth_sign", &fields("hello")).unwrap();
		let personal_sign = format("personal_sign", &fields("hello")).unwrap();

		assert_eq!(eth_sign, vec![json!(ADDRESS), json!("0x68656c6c6f")]);
		assert_eq!(personal_sign, vec![json!("0x68656c6c6f"), json!(ADDRESS)]);
		assert_eq!(eth_sign[0], personal_sign[1]);
		assert_eq!(eth_sign[1], personal_sign[0]);
	}

	#[test]
	fn test_typed_data_v1_order_is_opposite_of_v3_v4() {
		let legacy = format("eth_signTypedData_v1", &fields(&legacy_data().to_string())).unwrap();
		assert_eq!(legacy, vec![legacy_data(), json!(ADDRESS)]);

		for method in ["eth_signTypedData_v3", "eth_signTypedData_v4"] {
			let params = format(method, &fields(&typed_data().to_string())).unwrap();
			assert_eq!(params, vec![json!(ADDRESS), typed_data()], "{}", method);
		}
	}

	#[test]
	fn test_typed_data_nesting_is_normalized() {
		let single = typed_data().to_string();
		let double = Value::String(single.clone()).to_string();
		let triple = Value::String(double.clone()).to_string();

		for text in [single, double, triple] {
			let params = format("eth_signTypedData_v4", &fields(&text)).unwrap();
			assert_eq!(params[1], typed_data());
		}
	}

	#[test]
	fn test_malformed_typed_data() {
		let err = format("eth_signTypedData_v3", &fields("not json")).unwrap_err();
		assert!(matches!(err, RequestError::MalformedMessage(_)));

		// A v1 payload is not valid v4 typed data
		let err = format("eth_signTypedData_v4", &fields(&legacy_data().to_string())).unwrap_err();
		assert!(matches!(err, RequestError::MalformedMessage(_)));
	}

	#[test]
	fn test_plain_methods_do_not_parse_json() {
		let text = typed_data().to_string();
		let params = format("personal_sign", &fields(&text)).unwrap();
		assert_eq!(params[0], json!(utf8_to_hex(&text)));
	}

	#[test]
	fn test_json_rpc_envelope() {
		let request = format_request("personal_sign", &fields("hello")).unwrap();
		assert_eq!(
			request.to_json_rpc(7),
			json!({
				"jsonrpc": "2.0",
				"id": 7,
				"method": "personal_sign",
				"params": ["0x68656c6c6f", ADDRESS]
			})
		);
	}
}
