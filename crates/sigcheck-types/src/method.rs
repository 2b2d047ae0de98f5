//! Signing method taxonomy shared by the request formatter and the verifier.
//!
//! Every wallet signing call handled by the workspace is identified by one of
//! the JSON-RPC method names below. Formatting rules and verification rules are
//! both matched exhaustively on [`SigningMethod`], so a new variant cannot be
//! added without giving it a rule on each side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a method name is not one of the known signing methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown signing method: {0}")]
pub struct UnknownMethodError(pub String);

/// JSON-RPC signing methods understood by the formatter and the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningMethod {
	/// Raw `eth_sign`: address first, hex payload second.
	#[serde(rename = "eth_sign")]
	EthSign,
	/// EIP-191 `personal_sign`: hex payload first, address second.
	#[serde(rename = "personal_sign")]
	PersonalSign,
	/// Legacy typed data (array of `{type, name, value}` entries).
	#[serde(rename = "eth_signTypedData_v1")]
	SignTypedDataV1,
	/// EIP-712 typed data without array support.
	#[serde(rename = "eth_signTypedData_v3")]
	SignTypedDataV3,
	/// EIP-712 typed data with arrays and nested structs.
	#[serde(rename = "eth_signTypedData_v4")]
	SignTypedDataV4,
}

impl SigningMethod {
	/// All signing methods in registry order.
	pub const ALL: [SigningMethod; 5] = [
		SigningMethod::EthSign,
		SigningMethod::PersonalSign,
		SigningMethod::SignTypedDataV1,
		SigningMethod::SignTypedDataV3,
		SigningMethod::SignTypedDataV4,
	];

	/// Returns the JSON-RPC method name.
	pub const fn as_str(&self) -> &'static str {
		match self {
			SigningMethod::EthSign => "eth_sign",
			SigningMethod::PersonalSign => "personal_sign",
			SigningMethod::SignTypedDataV1 => "eth_signTypedData_v1",
			SigningMethod::SignTypedDataV3 => "eth_signTypedData_v3",
			SigningMethod::SignTypedDataV4 => "eth_signTypedData_v4",
		}
	}

	/// Whether the method carries a structured typed-data payload.
	pub const fn is_typed_data(&self) -> bool {
		matches!(
			self,
			SigningMethod::SignTypedDataV1
				| SigningMethod::SignTypedDataV3
				| SigningMethod::SignTypedDataV4
		)
	}
}

impl fmt::Display for SigningMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SigningMethod {
	type Err = UnknownMethodError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SigningMethod::ALL
			.into_iter()
			.find(|method| method.as_str() == s)
			.ok_or_else(|| UnknownMethodError(s.to_string()))
	}
}
