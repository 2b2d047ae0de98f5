//! Chain access for on-chain-aware signature verification.
//!
//! This module resolves numeric chain ids into [`ChainContext`]s and opens
//! read-only connections to the chain behind a context. Verification only
//! needs the code deployed at an account and the result of an `eth_call`,
//! either against a deployed contract or against creation code executed
//! without a target.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use sigcheck_types::ChainContext;
use std::sync::Arc;
use thiserror::Error;

pub mod known;
pub mod registry;

/// Re-export implementations
pub mod implementations {
	pub mod alloy;
	pub mod memory;
}

pub use known::known_chains;
pub use registry::{ChainRegistry, ChainTable};

/// Errors that can occur while talking to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The call was executed and reverted.
	#[error("Execution reverted: {0}")]
	Reverted(String),
	/// The chain endpoint could not be used to build a client.
	#[error("Invalid endpoint: {0}")]
	InvalidEndpoint(String),
	/// The chain table has no usable default chain.
	#[error("Chain registry error: {0}")]
	Registry(String),
}

/// Read-only access to a single chain.
#[async_trait]
pub trait ChainInterface: Send + Sync {
	/// Returns the chain id this client is connected to.
	fn chain_id(&self) -> u64;

	/// Returns the code deployed at `address`. Empty for externally owned
	/// accounts.
	async fn get_code(&self, address: Address) -> Result<Bytes, ChainError>;

	/// Executes a read-only call against `to` with `data` as calldata.
	///
	/// A call that executes and reverts is reported as
	/// [`ChainError::Reverted`], distinct from transport failures.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

	/// Executes creation `code` in an `eth_call` without a target address and
	/// returns what the constructor returns. Nothing is deployed.
	async fn call_deployless(&self, code: Bytes) -> Result<Bytes, ChainError>;
}

/// Factory that opens a [`ChainInterface`] for a resolved chain context.
pub trait ChainConnector: Send + Sync {
	fn connect(&self, chain: &ChainContext) -> Result<Arc<dyn ChainInterface>, ChainError>;
}
