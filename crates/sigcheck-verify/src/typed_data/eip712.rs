//! EIP-712 hashing for `eth_signTypedData_v3` and `eth_signTypedData_v4`.
//!
//! The two versions differ in three places:
//! - v3 takes the domain type from `types.EIP712Domain`; v4 derives it from
//!   the domain fields that are present.
//! - v3 rejects array types; v4 hashes arrays (including nested arrays) as
//!   the keccak of their concatenated encoded elements.
//! - v3 skips fields missing from the data; v4 encodes a missing or `null`
//!   struct value as zero and rejects any other missing value.

use super::{
	array_element_type, parse_dynamic_bytes, parse_string, AtomicType, TypeDefinitions,
	TypedData, TypedDataError, TypedField,
};
use alloy_dyn_abi::{PropertyDef, Resolver, TypeDef};
use alloy_primitives::{keccak256, B256};
use serde_json::{Map, Value};

/// Type name of the EIP-712 domain struct.
pub const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// Domain fields in canonical order with their types.
const DOMAIN_FIELDS: [(&str, &str); 5] = [
	("name", "string"),
	("version", "string"),
	("chainId", "uint256"),
	("verifyingContract", "address"),
	("salt", "bytes32"),
];

/// Typed-data encoding rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eip712Version {
	V3,
	V4,
}

/// Computes the EIP-712 digest `keccak256(0x1901 || domainSeparator || hashStruct(message))`.
///
/// When the primary type is the domain type itself, the message hash is
/// omitted.
pub fn hash_typed_data(data: &TypedData, version: Eip712Version) -> Result<B256, TypedDataError> {
	let mut types = data.types.clone();
	let domain_fields = match version {
		Eip712Version::V3 => types.get(DOMAIN_TYPE_NAME).cloned().unwrap_or_default(),
		Eip712Version::V4 => derive_domain_fields(&data.domain),
	};
	types.insert(DOMAIN_TYPE_NAME.to_string(), domain_fields);

	let encoder = Eip712Encoder::new(&types, version)?;
	let domain_separator = encoder.hash_struct(DOMAIN_TYPE_NAME, &data.domain)?;

	let mut digest = Vec::with_capacity(2 + 32 + 32);
	digest.push(0x19);
	digest.push(0x01);
	digest.extend_from_slice(domain_separator.as_slice());
	if data.primary_type != DOMAIN_TYPE_NAME {
		let message_hash = encoder.hash_struct(&data.primary_type, &data.message)?;
		digest.extend_from_slice(message_hash.as_slice());
	}

	Ok(keccak256(digest))
}

fn schema_error(err: alloy_dyn_abi::Error) -> TypedDataError {
	match err {
		alloy_dyn_abi::Error::MissingType(name) => TypedDataError::UnknownType(name),
		other => TypedDataError::Invalid(other.to_string()),
	}
}

/// Builds the domain type from the fields set in `domain`.
fn derive_domain_fields(domain: &Map<String, Value>) -> Vec<TypedField> {
	DOMAIN_FIELDS
		.iter()
		.filter(|(name, _)| domain.get(*name).is_some_and(|value| !value.is_null()))
		.map(|(name, ty)| TypedField::new(*name, *ty))
		.collect()
}

/// Struct encoder over a fixed set of type definitions.
///
/// Type strings and type hashes come from the alloy resolver; member values
/// are encoded here so the v3 and v4 rules for missing values can differ.
struct Eip712Encoder<'a> {
	types: &'a TypeDefinitions,
	version: Eip712Version,
	resolver: Resolver,
}

impl<'a> Eip712Encoder<'a> {
	fn new(types: &'a TypeDefinitions, version: Eip712Version) -> Result<Self, TypedDataError> {
		let mut resolver = Resolver::default();
		for (type_name, fields) in types {
			let props = fields
				.iter()
				.map(|field| PropertyDef::new(field.ty.as_str(), field.name.as_str()))
				.collect::<Result<Vec<_>, _>>()
				.map_err(schema_error)?;
			resolver.ingest(TypeDef::new(type_name.as_str(), props).map_err(schema_error)?);
		}

		Ok(Self {
			types,
			version,
			resolver,
		})
	}

	fn fields(&self, type_name: &str) -> Result<&'a [TypedField], TypedDataError> {
		self.types
			.get(type_name)
			.map(Vec::as_slice)
			.ok_or_else(|| TypedDataError::UnknownType(type_name.to_string()))
	}

	/// Encodes `Type(member,...)` followed by every referenced struct type,
	/// sorted by name.
	fn encode_type(&self, primary: &str) -> Result<String, TypedDataError> {
		self.resolver.encode_type(primary).map_err(schema_error)
	}

	fn type_hash(&self, type_name: &str) -> Result<B256, TypedDataError> {
		self.resolver.type_hash(type_name).map_err(schema_error)
	}

	/// `hashStruct(s) = keccak256(typeHash || encodeData(s))`
	fn hash_struct(&self, type_name: &str, data: &Map<String, Value>) -> Result<B256, TypedDataError> {
		let mut encoded = Vec::with_capacity(32 * (self.fields(type_name)?.len() + 1));
		encoded.extend_from_slice(self.type_hash(type_name)?.as_slice());

		for field in self.fields(type_name)? {
			let value = data.get(&field.name);
			if self.version == Eip712Version::V3 && value.is_none() {
				continue;
			}
			let word = self.encode_field(&field.name, &field.ty, value)?;
			encoded.extend_from_slice(word.as_slice());
		}

		Ok(keccak256(encoded))
	}

	/// Encodes one member value into a 32-byte word.
	fn encode_field(
		&self,
		name: &str,
		ty: &str,
		value: Option<&Value>,
	) -> Result<B256, TypedDataError> {
		let missing = || TypedDataError::MissingField {
			field: name.to_string(),
			ty: ty.to_string(),
		};

		if self.types.contains_key(ty) {
			return match value {
				None | Some(Value::Null) if self.version == Eip712Version::V4 => Ok(B256::ZERO),
				Some(Value::Object(object)) => self.hash_struct(ty, object),
				Some(other) => Err(TypedDataError::InvalidValue {
					ty: ty.to_string(),
					value: other.to_string(),
				}),
				None => Err(missing()),
			};
		}

		let value = value.ok_or_else(missing)?;

		if let Some(element) = array_element_type(ty) {
			if self.version == Eip712Version::V3 {
				return Err(TypedDataError::ArraysUnsupported);
			}
			let items = value.as_array().ok_or_else(|| TypedDataError::InvalidValue {
				ty: ty.to_string(),
				value: value.to_string(),
			})?;
			let mut encoded = Vec::with_capacity(32 * items.len());
			for item in items {
				encoded.extend_from_slice(self.encode_field(name, element, Some(item))?.as_slice());
			}
			return Ok(keccak256(encoded));
		}

		match ty {
			"bytes" => Ok(keccak256(parse_dynamic_bytes(ty, value)?)),
			"string" => Ok(keccak256(parse_string(ty, value)?)),
			_ => {
				let atomic =
					AtomicType::parse(ty).ok_or_else(|| TypedDataError::UnknownType(ty.to_string()))?;
				Ok(B256::from(atomic.encode_word(ty, value)?))
			},
		}
	}
}
