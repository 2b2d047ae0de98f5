//! Chain id resolution.
//!
//! A [`ChainRegistry`] maps an optional chain id onto a [`ChainContext`].
//! Resolution never fails: an absent or unknown id yields the default chain.

use crate::{known_chains, ChainError};
use sigcheck_config::Config;
use sigcheck_types::{ChainContext, ChainsConfig, DEFAULT_CHAIN_ID};

/// Read-only lookup from chain id to chain context.
pub trait ChainRegistry: Send + Sync {
	/// Resolves `chain_id` to its context, falling back to the default chain.
	fn resolve(&self, chain_id: Option<u64>) -> ChainContext;
}

/// Immutable chain table with a guaranteed default entry.
#[derive(Debug, Clone)]
pub struct ChainTable {
	/// Entries sorted by chain id.
	chains: Vec<ChainContext>,
	/// Index of the default chain in `chains`.
	default_index: usize,
}

impl ChainTable {
	/// Builds a table from chain entries, requiring `default_chain_id` to be
	/// present.
	pub fn new(chains: ChainsConfig, default_chain_id: u64) -> Result<Self, ChainError> {
		let mut chains: Vec<ChainContext> = chains
			.iter()
			.map(|(id, config)| ChainContext::from_config(*id, config))
			.collect();
		chains.sort_by_key(|chain| chain.id);

		let default_index = chains
			.iter()
			.position(|chain| chain.id == default_chain_id)
			.ok_or_else(|| {
				ChainError::Registry(format!(
					"Default chain {} is not in the chain table",
					default_chain_id
				))
			})?;

		Ok(Self {
			chains,
			default_index,
		})
	}

	/// The built-in table with mainnet as the default chain.
	pub fn known() -> Self {
		let mut chains: Vec<ChainContext> = known_chains()
			.iter()
			.map(|(id, config)| ChainContext::from_config(*id, config))
			.collect();
		chains.sort_by_key(|chain| chain.id);
		let default_index = chains
			.iter()
			.position(|chain| chain.id == DEFAULT_CHAIN_ID)
			.unwrap_or_default();
		Self {
			chains,
			default_index,
		}
	}

	/// Builds the table described by a configuration.
	///
	/// Configured chains override built-in entries with the same id.
	pub fn from_config(config: &Config) -> Result<Self, ChainError> {
		let mut chains = if config.verifier.include_known_chains {
			known_chains()
		} else {
			ChainsConfig::new()
		};
		for (id, chain) in &config.chains {
			chains.insert(*id, chain.clone());
		}

		let table = Self::new(chains, config.verifier.default_chain_id)?;
		tracing::debug!(
			chains = table.chains.len(),
			default_chain_id = table.default_chain().id,
			"Built chain table"
		);
		Ok(table)
	}

	/// Returns the default chain context.
	pub fn default_chain(&self) -> &ChainContext {
		&self.chains[self.default_index]
	}

	/// Returns every chain in ascending id order.
	pub fn chains(&self) -> &[ChainContext] {
		&self.chains
	}
}

impl Default for ChainTable {
	fn default() -> Self {
		Self::known()
	}
}

impl ChainRegistry for ChainTable {
	fn resolve(&self, chain_id: Option<u64>) -> ChainContext {
		let found = chain_id.and_then(|id| self.chains.iter().find(|chain| chain.id == id));
		match found {
			Some(chain) => chain.clone(),
			None => {
				if let Some(id) = chain_id {
					tracing::debug!(chain_id = id, "Unknown chain, using default");
				}
				self.default_chain().clone()
			},
		}
	}
}
