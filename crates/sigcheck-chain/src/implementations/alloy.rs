//! JSON-RPC chain access over HTTP using the Alloy library.

use crate::{ChainConnector, ChainError, ChainInterface};
use alloy_primitives::{Address, Bytes};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_transport::TransportError;
use async_trait::async_trait;
use sigcheck_types::ChainContext;
use std::sync::Arc;

/// Alloy-based chain client bound to a single chain.
pub struct AlloyChain {
	chain_id: u64,
	provider: DynProvider,
}

impl AlloyChain {
	/// Creates a client for the chain's HTTP RPC endpoint.
	pub fn new(chain: &ChainContext) -> Result<Self, ChainError> {
		let url = chain.rpc_url.parse().map_err(|e| {
			ChainError::InvalidEndpoint(format!(
				"Invalid RPC URL for chain {}: {}",
				chain.id, e
			))
		})?;

		let provider = ProviderBuilder::new().connect_http(url).erased();

		Ok(Self {
			chain_id: chain.id,
			provider,
		})
	}
}

/// Maps a transport error, separating execution reverts from network failures.
fn map_call_error(err: TransportError) -> ChainError {
	if let Some(response) = err.as_error_resp() {
		if response.message.starts_with("execution reverted") {
			return ChainError::Reverted(response.message.to_string());
		}
	}
	ChainError::Network(err.to_string())
}

#[async_trait]
impl ChainInterface for AlloyChain {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn get_code(&self, address: Address) -> Result<Bytes, ChainError> {
		let code = self
			.provider
			.get_code_at(address)
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get code: {}", e)))?;
		tracing::trace!(chain_id = self.chain_id, %address, len = code.len(), "eth_getCode");
		Ok(code)
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
		let request = TransactionRequest::default().to(to).input(data.into());
		let result = self.provider.call(request).await.map_err(map_call_error)?;
		tracing::trace!(chain_id = self.chain_id, %to, result = %result, "eth_call");
		Ok(result)
	}

	async fn call_deployless(&self, code: Bytes) -> Result<Bytes, ChainError> {
		let request = TransactionRequest::default().input(code.into());
		let result = self.provider.call(request).await.map_err(map_call_error)?;
		tracing::trace!(chain_id = self.chain_id, result = %result, "Deployless eth_call");
		Ok(result)
	}
}

/// Connector that opens a fresh HTTP client per chain context.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlloyConnector;

impl ChainConnector for AlloyConnector {
	fn connect(&self, chain: &ChainContext) -> Result<Arc<dyn ChainInterface>, ChainError> {
		tracing::debug!(chain_id = chain.id, chain = %chain.name, "Connecting to chain");
		Ok(Arc::new(AlloyChain::new(chain)?))
	}
}
