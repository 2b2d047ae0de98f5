//! Verification request and outcome types.

use crate::SigningMethod;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A request to verify a signature returned by a wallet.
///
/// `method` is kept as the raw wire name so that unknown methods can be
/// reported as unsupported instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
	/// JSON-RPC signing method that produced the signature.
	pub method: String,
	/// Claimed signer address (hex, any case).
	pub from: String,
	/// Signature as returned by the wallet (hex).
	#[serde(alias = "sign")]
	pub signature: String,
	/// Original message: a plain string, or typed data as an object, array or
	/// JSON text.
	pub message: serde_json::Value,
	/// Chain to verify against for on-chain-aware schemes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<u64>,
}

impl VerificationRequest {
	pub fn new(
		method: impl Into<String>,
		from: impl Into<String>,
		signature: impl Into<String>,
		message: serde_json::Value,
	) -> Self {
		Self {
			method: method.into(),
			from: from.into(),
			signature: signature.into(),
			message,
			chain_id: None,
		}
	}

	/// Sets the chain id used to resolve the chain context.
	pub fn with_chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = Some(chain_id);
		self
	}

	/// Parses the method name, returning `None` for unknown methods.
	pub fn signing_method(&self) -> Option<SigningMethod> {
		self.method.parse().ok()
	}
}

/// Result of a verification that completed.
///
/// A negative result is a normal outcome. Conditions that prevented checking
/// at all (unreachable chain, malformed inputs) are reported as errors by the
/// verifier instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
	/// The signature was produced by `signer`.
	Verified { signer: Address },
	/// The signature was checked and does not belong to the claimed signer.
	NotVerified,
	/// Recovery produced a different address than the claimed one.
	Mismatch {
		expected: Address,
		recovered: Address,
	},
	/// The method has no verification rule.
	Unsupported,
}

impl VerificationOutcome {
	pub fn is_verified(&self) -> bool {
		matches!(self, VerificationOutcome::Verified { .. })
	}

	/// Maps a boolean check result for `signer` onto an outcome.
	pub fn from_check(valid: bool, signer: Address) -> Self {
		if valid {
			VerificationOutcome::Verified { signer }
		} else {
			VerificationOutcome::NotVerified
		}
	}

	/// Compares a recovered address against the expected one.
	pub fn from_recovery(expected: Address, recovered: Address) -> Self {
		if expected == recovered {
			VerificationOutcome::Verified { signer: recovered }
		} else {
			VerificationOutcome::Mismatch {
				expected,
				recovered,
			}
		}
	}
}

impl fmt::Display for VerificationOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			VerificationOutcome::Verified { signer } => {
				write!(f, "Successfully verified signer as {}", signer)
			},
			VerificationOutcome::NotVerified => f.write_str("Failed to verify signer"),
			VerificationOutcome::Mismatch {
				expected,
				recovered,
			} => write!(
				f,
				"Failed to verify signer when comparing {} to {}",
				recovered, expected
			),
			VerificationOutcome::Unsupported => f.write_str("No verification rule for method"),
		}
	}
}
