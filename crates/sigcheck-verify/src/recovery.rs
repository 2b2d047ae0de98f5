//! ECDSA signature parsing and signer recovery.

use crate::VerifyError;
use alloy_primitives::{Address, Bytes, Signature, B256};
use sigcheck_types::{parse_address, parse_hex_bytes, VerificationOutcome};

/// Decodes the hex signature returned by a wallet.
pub fn decode_signature(signature: &str) -> Result<Bytes, VerifyError> {
	parse_hex_bytes(signature).map_err(|e| VerifyError::InvalidSignature(e.to_string()))
}

/// Parses the claimed signer address.
pub fn decode_address(address: &str) -> Result<Address, VerifyError> {
	parse_address(address).map_err(|e| VerifyError::InvalidAddress(e.to_string()))
}

/// Parses a 65-byte `r || s || v` signature. `v` may be 0/1 or 27/28.
pub fn parse_ecdsa(bytes: &[u8]) -> Result<Signature, VerifyError> {
	Signature::try_from(bytes).map_err(|e| VerifyError::InvalidSignature(e.to_string()))
}

/// Recovers the signer of a prehashed message, `None` if recovery fails.
pub fn recover_signer(signature: &Signature, hash: &B256) -> Option<Address> {
	match signature.recover_address_from_prehash(hash) {
		Ok(address) => Some(address),
		Err(e) => {
			tracing::debug!(error = %e, "Signature recovery failed");
			None
		},
	}
}

/// Recovers the signer of `hash` and compares it to `expected`.
pub fn verify_recovered(
	expected: Address,
	signature: &[u8],
	hash: &B256,
) -> Result<VerificationOutcome, VerifyError> {
	let signature = parse_ecdsa(signature)?;
	Ok(match recover_signer(&signature, hash) {
		Some(recovered) => VerificationOutcome::from_recovery(expected, recovered),
		None => VerificationOutcome::NotVerified,
	})
}
