//! Chain configuration types used to resolve a chain identifier into
//! connection parameters.
//!
//! This module defines the TOML-facing chain entries and the resolved
//! [`ChainContext`] handed to on-chain-aware verification.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Chain id used when a request carries no chain id or an unknown one.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Configuration for a single chain entry.
///
/// # Fields
///
/// * `name` - Human readable chain name (e.g., "mainnet", "base")
/// * `rpc_url` - The HTTP(S) JSON-RPC endpoint used for on-chain reads
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainConfig {
	pub name: String,
	pub rpc_url: String,
}

/// Chains configuration mapping chain IDs to their configurations.
///
/// Chain IDs are provided as string keys in TOML (tables cannot have numeric
/// keys) and converted to `u64` by [`deserialize_chains`].
pub type ChainsConfig = HashMap<u64, ChainConfig>;

/// Resolved, read-only chain parameters for one verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainContext {
	/// Numeric EIP-155 chain id.
	pub id: u64,
	/// Human readable chain name.
	pub name: String,
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
}

impl ChainContext {
	pub fn new(id: u64, name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			rpc_url: rpc_url.into(),
		}
	}

	/// Builds a context from a configured chain entry.
	pub fn from_config(id: u64, config: &ChainConfig) -> Self {
		Self::new(id, config.name.clone(), config.rpc_url.clone())
	}
}

/// Helper function to deserialize chain configurations from TOML.
///
/// # Errors
///
/// Returns a deserialization error if:
/// - A chain ID key cannot be parsed as a u64
/// - The underlying chain configuration is invalid
pub fn deserialize_chains<'de, D>(deserializer: D) -> Result<ChainsConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, ChainConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}
