//! Signature verification for wallet signing methods.
//!
//! The [`SignatureVerifier`] takes a [`VerificationRequest`], resolves the
//! chain it refers to, and applies the verification rule registered for the
//! request's signing method:
//!
//! | method | rule |
//! |---|---|
//! | `personal_sign` | EIP-191 hash, on-chain-aware check |
//! | `eth_signTypedData_v1` | legacy packed hash, ECDSA recovery |
//! | `eth_signTypedData_v3` | EIP-712 (v3 rules), ECDSA recovery |
//! | `eth_signTypedData_v4` | EIP-712 (v4 rules), on-chain-aware check |
//! | `eth_sign`, anything else | unsupported |
//!
//! [`VerificationRequest`]: sigcheck_types::VerificationRequest

use sigcheck_request::RequestError;
use thiserror::Error;

pub mod dispatcher;
pub mod onchain;
pub mod recovery;
pub mod typed_data;

pub use dispatcher::SignatureVerifier;
pub use typed_data::{TypedData, TypedDataError};

/// Errors that prevent a signature from being checked at all.
///
/// A signature that was checked and rejected is not an error; it is reported
/// through [`VerificationOutcome`](sigcheck_types::VerificationOutcome).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
	/// The chain could not be reached for an on-chain-aware check.
	#[error("Chain {chain_id} unavailable: {message}")]
	ChainUnavailable { chain_id: u64, message: String },
	/// The signature is not well-formed.
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
	/// The claimed signer is not a valid address.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// The message could not be decoded or hashed.
	#[error("Invalid message: {0}")]
	InvalidMessage(String),
	/// The signature needs a check this verifier is not set up for.
	#[error("Cannot verify: {0}")]
	Unverifiable(String),
}

impl From<TypedDataError> for VerifyError {
	fn from(err: TypedDataError) -> Self {
		VerifyError::InvalidMessage(err.to_string())
	}
}

impl From<RequestError> for VerifyError {
	fn from(err: RequestError) -> Self {
		match err {
			RequestError::MalformedMessage(message) => VerifyError::InvalidMessage(message),
			other => VerifyError::InvalidMessage(other.to_string()),
		}
	}
}
