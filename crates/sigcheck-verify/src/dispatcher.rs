//! Verification dispatcher.

use crate::onchain;
use crate::recovery::{decode_address, decode_signature, verify_recovered};
use crate::typed_data::{hash_legacy, hash_typed_data, Eip712Version, TypedData};
use crate::VerifyError;
use alloy_primitives::{eip191_hash_message, Address, Bytes, B256};
use serde_json::Value;
use sigcheck_chain::{ChainConnector, ChainRegistry};
use sigcheck_request::{normalize_message, MessageShape};
use sigcheck_types::{
	parse_hex_bytes, truncate_id, ChainContext, SigningMethod, VerificationOutcome,
	VerificationRequest,
};
use std::sync::Arc;

/// Routes verification requests to the rule for their signing method.
///
/// Chain resolution and chain access are injected so the verifier holds no
/// state of its own; concurrent calls are independent.
pub struct SignatureVerifier {
	registry: Arc<dyn ChainRegistry>,
	connector: Arc<dyn ChainConnector>,
	erc6492_validator: Option<Bytes>,
}

impl SignatureVerifier {
	pub fn new(registry: Arc<dyn ChainRegistry>, connector: Arc<dyn ChainConnector>) -> Self {
		Self {
			registry,
			connector,
			erc6492_validator: None,
		}
	}

	/// Sets the ERC-6492 validator creation code used for wrapped signatures
	/// of undeployed accounts. Without it those signatures fail with
	/// [`VerifyError::Unverifiable`].
	pub fn with_erc6492_validator(mut self, code: Bytes) -> Self {
		self.erc6492_validator = Some(code);
		self
	}

	/// Verifies a wallet signature.
	///
	/// Returns an outcome for every request that could be checked, including
	/// unsupported methods and rejected signatures. Errors are reserved for
	/// malformed inputs and unreachable chains.
	pub async fn verify(
		&self,
		request: &VerificationRequest,
	) -> Result<VerificationOutcome, VerifyError> {
		let chain = self.registry.resolve(request.chain_id);

		let Some(method) = request.signing_method() else {
			tracing::debug!(method = %request.method, "No verification rule for method");
			return Ok(VerificationOutcome::Unsupported);
		};

		let outcome = match method {
			SigningMethod::EthSign => VerificationOutcome::Unsupported,
			SigningMethod::PersonalSign => {
				let signer = decode_address(&request.from)?;
				let signature = decode_signature(&request.signature)?;
				let hash = eip191_hash_message(personal_message(&request.message)?);
				self.verify_on_chain(&chain, signer, hash, &signature).await?
			},
			SigningMethod::SignTypedDataV1 => {
				let signer = decode_address(&request.from)?;
				let signature = decode_signature(&request.signature)?;
				let data = normalize_message(request.message.clone(), MessageShape::Legacy)?;
				verify_recovered(signer, &signature, &hash_legacy(&data)?)?
			},
			SigningMethod::SignTypedDataV3 => {
				let signer = decode_address(&request.from)?;
				let signature = decode_signature(&request.signature)?;
				let hash = typed_data_hash(&request.message, Eip712Version::V3)?;
				verify_recovered(signer, &signature, &hash)?
			},
			SigningMethod::SignTypedDataV4 => {
				let signer = decode_address(&request.from)?;
				let signature = decode_signature(&request.signature)?;
				let hash = typed_data_hash(&request.message, Eip712Version::V4)?;
				self.verify_on_chain(&chain, signer, hash, &signature).await?
			},
		};

		tracing::debug!(
			%method,
			chain_id = chain.id,
			signature = %truncate_id(&request.signature),
			%outcome,
			"Verification finished"
		);
		Ok(outcome)
	}

	async fn verify_on_chain(
		&self,
		chain: &ChainContext,
		signer: Address,
		hash: B256,
		signature: &[u8],
	) -> Result<VerificationOutcome, VerifyError> {
		let client = self
			.connector
			.connect(chain)
			.map_err(|e| VerifyError::ChainUnavailable {
				chain_id: chain.id,
				message: e.to_string(),
			})?;
		let validator = self.erc6492_validator.as_ref().map(|code| &code[..]);
		onchain::verify_hash(client.as_ref(), validator, signer, hash, signature).await
	}
}

/// Bytes signed by `personal_sign`: UTF-8 text, or `{"raw": "0x..."}`.
fn personal_message(message: &Value) -> Result<Vec<u8>, VerifyError> {
	match message {
		Value::String(text) => Ok(text.as_bytes().to_vec()),
		Value::Object(object) => {
			let raw = object.get("raw").and_then(Value::as_str).ok_or_else(|| {
				VerifyError::InvalidMessage("expected a string or {\"raw\": \"0x...\"}".into())
			})?;
			parse_hex_bytes(raw)
				.map(Vec::from)
				.map_err(|e| VerifyError::InvalidMessage(e.to_string()))
		},
		other => Err(VerifyError::InvalidMessage(format!(
			"personal_sign message must be a string, got {}",
			other
		))),
	}
}

fn typed_data_hash(message: &Value, version: Eip712Version) -> Result<B256, VerifyError> {
	let value = normalize_message(message.clone(), MessageShape::Eip712)?;
	let data = TypedData::from_value(value)?;
	Ok(hash_typed_data(&data, version)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use serde_json::json;
	use sigcheck_chain::implementations::memory::MemoryConnector;
	use sigcheck_chain::ChainTable;

	fn signer() -> PrivateKeySigner {
		"ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
			.parse()
			.unwrap()
	}

	fn verifier(connector: Arc<MemoryConnector>) -> SignatureVerifier {
		SignatureVerifier::new(Arc::new(ChainTable::known()), connector)
	}

	fn hex_signature(signer: &PrivateKeySigner, hash: &B256) -> String {
		Bytes::from(signer.sign_hash_sync(hash).unwrap().as_bytes()).to_string()
	}

	/// Flips a bit in the `s` component.
	fn tamper(signature: &str) -> String {
		let mut bytes = parse_hex_bytes(signature).unwrap().to_vec();
		bytes[40] ^= 0x01;
		Bytes::from(bytes).to_string()
	}

	fn mail() -> Value {
		json!({
			"types": {
				"EIP712Domain": [
					{"name": "name", "type": "string"},
					{"name": "version", "type": "string"},
					{"name": "chainId", "type": "uint256"},
					{"name": "verifyingContract", "type": "address"}
				],
				"Person": [
					{"name": "name", "type": "string"},
					{"name": "wallet", "type": "address"}
				],
				"Mail": [
					{"name": "from", "type": "Person"},
					{"name": "to", "type": "Person"},
					{"name": "contents", "type": "string"}
				]
			},
			"primaryType": "Mail",
			"domain": {
				"name": "Ether Mail",
				"version": "1",
				"chainId": 1,
				"verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
			},
			"message": {
				"from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
				"to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
				"contents": "Hello, Bob!"
			}
		})
	}

	fn legacy() -> Value {
		json!([
			{"type": "string", "name": "Message", "value": "Hi, Alice!"},
			{"type": "uint32", "name": "A number", "value": "1337"}
		])
	}

	fn mail_hash(version: Eip712Version) -> B256 {
		hash_typed_data(&TypedData::from_value(mail()).unwrap(), version).unwrap()
	}

	#[tokio::test]
	async fn test_personal_sign_round_trip() {
		let signer = signer();
		let signature = Bytes::from(signer.sign_message_sync(b"hello").unwrap().as_bytes());
		let connector = Arc::new(MemoryConnector::new());
		let verifier = verifier(connector.clone());

		let request = VerificationRequest::new(
			"personal_sign",
			signer.address().to_string(),
			signature.to_string(),
			json!("hello"),
		);
		assert_eq!(
			verifier.verify(&request).await.unwrap(),
			VerificationOutcome::Verified {
				signer: signer.address()
			}
		);

		// Raw bytes sign the same payload
		let mut raw = request.clone();
		raw.message = json!({"raw": "0x68656c6c6f"});
		assert!(verifier.verify(&raw).await.unwrap().is_verified());

		let mut tampered = request.clone();
		tampered.signature = tamper(&request.signature);
		assert!(!verifier.verify(&tampered).await.unwrap().is_verified());

		// On-chain-aware checks report a plain rejection for another address
		let mut other = request.clone();
		other.from = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string();
		assert_eq!(
			verifier.verify(&other).await.unwrap(),
			VerificationOutcome::NotVerified
		);

		assert_eq!(connector.connected_chains(), vec![1, 1, 1, 1]);
	}

	#[tokio::test]
	async fn test_claimed_address_is_case_insensitive() {
		let signer = signer();
		let signature = Bytes::from(signer.sign_message_sync(b"hello").unwrap().as_bytes());
		let verifier = verifier(Arc::new(MemoryConnector::new()));

		let lower = format!("{:#x}", signer.address());
		let request =
			VerificationRequest::new("personal_sign", lower, signature.to_string(), json!("hello"));
		assert!(verifier.verify(&request).await.unwrap().is_verified());
	}

	#[tokio::test]
	async fn test_typed_data_v1() {
		let signer = signer();
		let hash = hash_legacy(&legacy()).unwrap();
		let signature = hex_signature(&signer, &hash);
		let verifier = verifier(Arc::new(MemoryConnector::new()));

		// Submitted as JSON text, as wallets return it
		let request = VerificationRequest::new(
			"eth_signTypedData_v1",
			signer.address().to_string(),
			signature.clone(),
			json!(legacy().to_string()),
		);
		assert!(verifier.verify(&request).await.unwrap().is_verified());

		let other = alloy_primitives::address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
		let mut wrong_signer = request.clone();
		wrong_signer.from = other.to_string();
		assert_eq!(
			verifier.verify(&wrong_signer).await.unwrap(),
			VerificationOutcome::Mismatch {
				expected: other,
				recovered: signer.address(),
			}
		);

		let mut tampered = request.clone();
		tampered.signature = tamper(&signature);
		assert!(!verifier.verify(&tampered).await.unwrap().is_verified());
	}

	#[tokio::test]
	async fn test_typed_data_v3_nesting_levels() {
		let signer = signer();
		let signature = hex_signature(&signer, &mail_hash(Eip712Version::V3));
		let verifier = verifier(Arc::new(MemoryConnector::new()));

		let single = mail().to_string();
		let double = Value::String(single.clone()).to_string();
		let triple = Value::String(double.clone()).to_string();

		for message in [mail(), json!(single), json!(double), json!(triple)] {
			let request = VerificationRequest::new(
				"eth_signTypedData_v3",
				signer.address().to_string(),
				signature.clone(),
				message,
			);
			assert!(verifier.verify(&request).await.unwrap().is_verified());
		}
	}

	#[tokio::test]
	async fn test_typed_data_v4_known_digest() {
		let signer = signer();
		let hash = mail_hash(Eip712Version::V4);
		assert_eq!(
			hash,
			alloy_primitives::b256!(
				"be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
			)
		);
		let connector = Arc::new(MemoryConnector::new());
		let verifier = verifier(connector.clone());

		let request = VerificationRequest::new(
			"eth_signTypedData_v4",
			signer.address().to_string(),
			hex_signature(&signer, &hash),
			mail(),
		)
		.with_chain_id(8453);
		assert!(verifier.verify(&request).await.unwrap().is_verified());
		assert_eq!(connector.connected_chains(), vec![8453]);
	}

	#[tokio::test]
	async fn test_undeployed_account_uses_configured_validator() {
		use crate::onchain::ERC6492_MAGIC_SUFFIX;
		use alloy_sol_types::{sol_data, SolType};
		type Payload = (sol_data::Address, sol_data::Bytes, sol_data::Bytes);

		let signer = signer();
		let inner = Bytes::from(signer.sign_message_sync(b"hello").unwrap().as_bytes());
		let mut wrapped = <Payload as SolType>::abi_encode_params(&(
			alloy_primitives::address!("3333333333333333333333333333333333333333"),
			Bytes::from_static(b"deploy"),
			inner,
		));
		wrapped.extend_from_slice(&ERC6492_MAGIC_SUFFIX);
		let account = alloy_primitives::address!("2222222222222222222222222222222222222222");
		let request = VerificationRequest::new(
			"personal_sign",
			account.to_string(),
			Bytes::from(wrapped).to_string(),
			json!("hello"),
		);

		let connector = Arc::new(MemoryConnector::new().with_deployless(|code| {
			assert!(code.starts_with(b"validator"));
			Ok(Bytes::from_static(&[0x01]))
		}));
		let without = verifier(connector.clone());
		assert!(matches!(
			without.verify(&request).await,
			Err(VerifyError::Unverifiable(_))
		));

		let with = verifier(connector).with_erc6492_validator(Bytes::from_static(b"validator"));
		assert_eq!(
			with.verify(&request).await.unwrap(),
			VerificationOutcome::Verified { signer: account }
		);
	}

	#[tokio::test]
	async fn test_unknown_chain_uses_default() {
		let signer = signer();
		let signature = Bytes::from(signer.sign_message_sync(b"hello").unwrap().as_bytes());
		let connector = Arc::new(MemoryConnector::new());
		let verifier = verifier(connector.clone());

		let request = VerificationRequest::new(
			"personal_sign",
			signer.address().to_string(),
			signature.to_string(),
			json!("hello"),
		);
		let with_unknown = request.clone().with_chain_id(999_999);

		assert_eq!(
			verifier.verify(&request).await.unwrap(),
			verifier.verify(&with_unknown).await.unwrap()
		);
		assert_eq!(connector.connected_chains(), vec![1, 1]);
	}

	#[tokio::test]
	async fn test_unsupported_methods() {
		let connector = Arc::new(MemoryConnector::new());
		let verifier = verifier(connector.clone());

		for method in ["eth_sign", "eth_signTransaction", "wallet_foo"] {
			let request = VerificationRequest::new(method, "0x00", "0x00", json!("hello"));
			assert_eq!(
				verifier.verify(&request).await.unwrap(),
				VerificationOutcome::Unsupported
			);
		}
		assert!(connector.connected_chains().is_empty());
	}

	#[tokio::test]
	async fn test_chain_unavailable_is_an_error() {
		let signer = signer();
		let signature = Bytes::from(signer.sign_message_sync(b"hello").unwrap().as_bytes());
		let verifier = verifier(Arc::new(MemoryConnector::new().unavailable()));

		let request = VerificationRequest::new(
			"personal_sign",
			signer.address().to_string(),
			signature.to_string(),
			json!("hello"),
		)
		.with_chain_id(10);
		assert!(matches!(
			verifier.verify(&request).await,
			Err(VerifyError::ChainUnavailable { chain_id: 10, .. })
		));

		// Off-chain rules don't touch the chain
		let request = VerificationRequest::new(
			"eth_signTypedData_v3",
			signer.address().to_string(),
			hex_signature(&signer, &mail_hash(Eip712Version::V3)),
			mail(),
		);
		assert!(verifier.verify(&request).await.unwrap().is_verified());
	}

	#[tokio::test]
	async fn test_malformed_inputs() {
		let verifier = verifier(Arc::new(MemoryConnector::new()));

		let request = VerificationRequest::new("personal_sign", "0x1234", "0x00", json!("hello"));
		assert!(matches!(
			verifier.verify(&request).await,
			Err(VerifyError::InvalidAddress(_))
		));

		let request = VerificationRequest::new(
			"eth_signTypedData_v4",
			signer().address().to_string(),
			"0x00",
			json!("not typed data"),
		);
		assert!(matches!(
			verifier.verify(&request).await,
			Err(VerifyError::InvalidMessage(_))
		));
	}
}
