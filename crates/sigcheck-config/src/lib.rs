//! Configuration module for the sigcheck workspace.
//!
//! This module provides structures and utilities for managing verifier
//! configuration. It supports loading configuration from TOML files, resolves
//! `${VAR}` / `${VAR:-default}` references against the environment, and
//! validates chain entries before they are handed to the chain registry.
//!
//! Large chain tables can live in their own files and be pulled in with
//! `include`; see [`ConfigLoader`].

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sigcheck_types::{deserialize_chains, parse_hex_bytes, ChainsConfig, DEFAULT_CHAIN_ID};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// A configuration file could not be found or read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The TOML is malformed or does not match the expected shape.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// The configuration parsed but its values are unusable.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The message alone; the full error repeats the input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
///
/// Every section is optional: an empty file yields the built-in chain table
/// with mainnet as the default chain.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
	/// Verification dispatcher settings.
	#[serde(default)]
	pub verifier: VerifierConfig,
	/// Chain entries that extend or override the built-in chain table.
	#[serde(default, deserialize_with = "deserialize_chains")]
	pub chains: ChainsConfig,
}

/// Verification dispatcher settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifierConfig {
	/// Chain used when a request has no chain id or an unknown one.
	/// Defaults to 1 (mainnet).
	#[serde(default = "default_chain_id")]
	pub default_chain_id: u64,
	/// Whether the built-in table of well-known chains is merged under the
	/// configured chains. Defaults to true.
	#[serde(default = "default_include_known_chains")]
	pub include_known_chains: bool,
	/// Hex creation code of the ERC-6492 validator, executed without
	/// deployment to check signatures of accounts that are not deployed yet.
	#[serde(default)]
	pub erc6492_validator: Option<String>,
}

impl Default for VerifierConfig {
	fn default() -> Self {
		Self {
			default_chain_id: default_chain_id(),
			include_known_chains: default_include_known_chains(),
			erc6492_validator: None,
		}
	}
}

fn default_chain_id() -> u64 {
	DEFAULT_CHAIN_ID
}

fn default_include_known_chains() -> bool {
	true
}

/// Largest configuration input accepted by [`resolve_env_vars`].
const MAX_CONFIG_SIZE: usize = 1024 * 1024;

/// Substitutes `${VAR}` and `${VAR:-default}` references with environment
/// values.
///
/// A reference without a default fails when the variable is unset. Input is
/// capped at [`MAX_CONFIG_SIZE`] bytes.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	if input.len() > MAX_CONFIG_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_CONFIG_SIZE
		)));
	}

	let pattern = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut output = String::with_capacity(input.len());
	let mut copied = 0;
	for captures in pattern.captures_iter(input) {
		let (Some(reference), Some(name)) = (captures.get(0), captures.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), captures.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		output.push_str(&input[copied..reference.start()]);
		output.push_str(&value);
		copied = reference.end();
	}
	output.push_str(&input[copied..]);

	Ok(output)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path = Path::new(path);
		let (Some(dir), Some(file)) = (path.parent(), path.file_name()) else {
			return Err(ConfigError::Validation(format!(
				"Not a configuration file path: {}",
				path.display()
			)));
		};
		ConfigLoader::new(dir).load_config(file).await
	}

	/// Validates the configuration.
	///
	/// - Every chain must have a non-empty name and an http(s) RPC URL
	/// - Without the built-in table, the default chain must be configured
	/// - The ERC-6492 validator, if set, must be non-empty hex
	fn validate(&self) -> Result<(), ConfigError> {
		for (chain_id, chain) in &self.chains {
			if chain.name.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Chain {} must have a name",
					chain_id
				)));
			}
			let url = url::Url::parse(&chain.rpc_url).map_err(|e| {
				ConfigError::Validation(format!(
					"Invalid rpc_url '{}' for chain {}: {}",
					chain.rpc_url, chain_id, e
				))
			})?;
			if !matches!(url.scheme(), "http" | "https") {
				return Err(ConfigError::Validation(format!(
					"Chain {} rpc_url must use http or https, got '{}'",
					chain_id,
					url.scheme()
				)));
			}
		}

		if !self.verifier.include_known_chains
			&& !self.chains.contains_key(&self.verifier.default_chain_id)
		{
			return Err(ConfigError::Validation(format!(
				"Default chain {} is not configured in [chains]",
				self.verifier.default_chain_id
			)));
		}

		if let Some(code) = &self.verifier.erc6492_validator {
			match parse_hex_bytes(code) {
				Ok(bytes) if !bytes.is_empty() => {},
				Ok(_) => {
					return Err(ConfigError::Validation(
						"erc6492_validator must not be empty".into(),
					))
				},
				Err(e) => {
					return Err(ConfigError::Validation(format!(
						"Invalid erc6492_validator: {}",
						e
					)))
				},
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
