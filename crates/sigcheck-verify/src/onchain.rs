//! On-chain-aware signature verification.
//!
//! Checks a signature over a 32-byte hash for any account type:
//! - deployed contract accounts via ERC-1271 `isValidSignature`
//! - externally owned accounts via ECDSA recovery
//! - ERC-6492 wrapped signatures are unwrapped for deployed accounts; for
//!   accounts without code they go to the ERC-6492 validator, executed in a
//!   deployless `eth_call` that runs the factory call before checking

use crate::{recovery, VerifyError};
use alloy_primitives::{hex, Address, Bytes, B256};
use alloy_sol_types::{sol, sol_data, SolCall, SolConstructor, SolType};
use sigcheck_chain::{ChainError, ChainInterface};
use sigcheck_types::VerificationOutcome;

sol! {
	interface IERC1271 {
		function isValidSignature(bytes32 hash, bytes signature) external view returns (bytes4 magicValue);
	}

	contract ValidateSigOffchain {
		constructor(address _signer, bytes32 _hash, bytes memory _signature);
	}
}

/// Suffix marking an ERC-6492 wrapped signature.
pub const ERC6492_MAGIC_SUFFIX: [u8; 32] =
	hex!("6492649264926492649264926492649264926492649264926492649264926492");

/// Return value of a successful ERC-1271 `isValidSignature` call.
pub const ERC1271_MAGIC_VALUE: [u8; 4] = hex!("1626ba7e");

/// First byte returned by the ERC-6492 validator for a valid signature.
const VALIDATOR_SUCCESS: u8 = 0x01;

/// `abi.encode(address factory, bytes factoryCalldata, bytes signature)`
type Erc6492Payload = (sol_data::Address, sol_data::Bytes, sol_data::Bytes);

/// An ERC-6492 signature for a possibly undeployed contract account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc6492Signature {
	pub factory: Address,
	pub factory_calldata: Bytes,
	pub inner: Bytes,
}

impl Erc6492Signature {
	/// Unwraps `signature` if it carries the ERC-6492 suffix and a valid payload.
	pub fn parse(signature: &[u8]) -> Option<Self> {
		let payload = signature.strip_suffix(ERC6492_MAGIC_SUFFIX.as_slice())?;
		let (factory, factory_calldata, inner) =
			<Erc6492Payload as SolType>::abi_decode_params(payload).ok()?;
		Some(Self {
			factory,
			factory_calldata,
			inner,
		})
	}
}

fn unavailable(chain: &dyn ChainInterface, err: ChainError) -> VerifyError {
	VerifyError::ChainUnavailable {
		chain_id: chain.chain_id(),
		message: err.to_string(),
	}
}

/// Verifies that `signer` signed `hash`, consulting the chain for contract
/// accounts.
///
/// `validator` is the creation code of the ERC-6492 validator. It is only
/// needed for wrapped signatures of accounts that are not deployed yet.
pub async fn verify_hash(
	chain: &dyn ChainInterface,
	validator: Option<&[u8]>,
	signer: Address,
	hash: B256,
	signature: &[u8],
) -> Result<VerificationOutcome, VerifyError> {
	let wrapped = Erc6492Signature::parse(signature);
	let code = chain
		.get_code(signer)
		.await
		.map_err(|e| unavailable(chain, e))?;

	if !code.is_empty() {
		let inner = wrapped.as_ref().map_or(signature, |w| &w.inner[..]);
		return verify_erc1271(chain, signer, hash, inner).await;
	}

	if let Some(wrapped) = wrapped {
		let Some(validator) = validator else {
			tracing::warn!(
				%signer,
				factory = %wrapped.factory,
				chain_id = chain.chain_id(),
				"Account is not deployed and no ERC-6492 validator is configured"
			);
			return Err(VerifyError::Unverifiable(format!(
				"{} is not deployed and no ERC-6492 validator is configured",
				signer
			)));
		};
		return verify_erc6492(chain, validator, signer, hash, signature).await;
	}

	let signature = recovery::parse_ecdsa(signature)?;
	let valid = recovery::recover_signer(&signature, &hash) == Some(signer);
	Ok(VerificationOutcome::from_check(valid, signer))
}

/// Calls `isValidSignature(hash, signature)` on the account contract.
async fn verify_erc1271(
	chain: &dyn ChainInterface,
	account: Address,
	hash: B256,
	signature: &[u8],
) -> Result<VerificationOutcome, VerifyError> {
	let call = IERC1271::isValidSignatureCall {
		hash,
		signature: Bytes::copy_from_slice(signature),
	};

	match chain.call(account, call.abi_encode().into()).await {
		Ok(result) => {
			let valid = result.starts_with(&ERC1271_MAGIC_VALUE);
			tracing::debug!(%account, valid, "ERC-1271 isValidSignature");
			Ok(VerificationOutcome::from_check(valid, account))
		},
		Err(ChainError::Reverted(reason)) => {
			tracing::debug!(%account, %reason, "ERC-1271 isValidSignature reverted");
			Ok(VerificationOutcome::NotVerified)
		},
		Err(e) => Err(unavailable(chain, e)),
	}
}

/// Runs the ERC-6492 validator's constructor with `(signer, hash, signature)`.
///
/// The validator deploys the account through the factory call carried in the
/// signature and then checks it, all inside one `eth_call`. The full wrapped
/// signature is passed through.
async fn verify_erc6492(
	chain: &dyn ChainInterface,
	validator: &[u8],
	signer: Address,
	hash: B256,
	signature: &[u8],
) -> Result<VerificationOutcome, VerifyError> {
	let constructor = ValidateSigOffchain::constructorCall {
		_signer: signer,
		_hash: hash,
		_signature: Bytes::copy_from_slice(signature),
	};
	let mut code = validator.to_vec();
	code.extend_from_slice(&constructor.abi_encode());

	match chain.call_deployless(code.into()).await {
		Ok(result) => {
			let valid = result.first() == Some(&VALIDATOR_SUCCESS);
			tracing::debug!(%signer, valid, "ERC-6492 validator");
			Ok(VerificationOutcome::from_check(valid, signer))
		},
		Err(ChainError::Reverted(reason)) => {
			tracing::debug!(%signer, %reason, "ERC-6492 validator reverted");
			Ok(VerificationOutcome::NotVerified)
		},
		Err(e) => Err(unavailable(chain, e)),
	}
}
