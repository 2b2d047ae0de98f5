//! In-memory chain implementation.
//!
//! Accounts are given code and call handlers up front, which makes it
//! possible to exercise contract-account verification without an RPC node.
//! Deployless calls go to a single handler standing in for whatever creation
//! code is sent.

use crate::{ChainConnector, ChainError, ChainInterface};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use sigcheck_types::ChainContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Handler invoked for calls to an in-memory contract.
pub type CallHandler = Arc<dyn Fn(&Bytes) -> Result<Bytes, ChainError> + Send + Sync>;

#[derive(Clone, Default)]
struct Account {
	code: Bytes,
	handler: Option<CallHandler>,
}

/// In-memory chain state shared by every client the connector hands out.
#[derive(Clone, Default)]
pub struct MemoryChain {
	chain_id: u64,
	accounts: Arc<HashMap<Address, Account>>,
	deployless: Option<CallHandler>,
	unavailable: bool,
}

#[async_trait]
impl ChainInterface for MemoryChain {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn get_code(&self, address: Address) -> Result<Bytes, ChainError> {
		if self.unavailable {
			return Err(ChainError::Network("chain unavailable".into()));
		}
		Ok(self
			.accounts
			.get(&address)
			.map(|account| account.code.clone())
			.unwrap_or_default())
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
		if self.unavailable {
			return Err(ChainError::Network("chain unavailable".into()));
		}
		match self.accounts.get(&to).and_then(|account| account.handler.as_ref()) {
			Some(handler) => handler(&data),
			// Calls to accounts without code succeed with empty return data
			None => Ok(Bytes::new()),
		}
	}

	async fn call_deployless(&self, code: Bytes) -> Result<Bytes, ChainError> {
		if self.unavailable {
			return Err(ChainError::Network("chain unavailable".into()));
		}
		match &self.deployless {
			Some(handler) => handler(&code),
			None => Err(ChainError::Reverted("no deployless handler".into())),
		}
	}
}

/// Connector returning in-memory chains and recording which chains were
/// requested.
#[derive(Default)]
pub struct MemoryConnector {
	accounts: Arc<HashMap<Address, Account>>,
	deployless: Option<CallHandler>,
	unavailable: bool,
	connected: Mutex<Vec<u64>>,
}

impl MemoryConnector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Deploys a contract account with the given code and call handler.
	pub fn with_contract(
		mut self,
		address: Address,
		code: impl Into<Bytes>,
		handler: impl Fn(&Bytes) -> Result<Bytes, ChainError> + Send + Sync + 'static,
	) -> Self {
		Arc::make_mut(&mut self.accounts).insert(
			address,
			Account {
				code: code.into(),
				handler: Some(Arc::new(handler)),
			},
		);
		self
	}

	/// Sets the handler receiving the code of every deployless call.
	pub fn with_deployless(
		mut self,
		handler: impl Fn(&Bytes) -> Result<Bytes, ChainError> + Send + Sync + 'static,
	) -> Self {
		self.deployless = Some(Arc::new(handler));
		self
	}

	/// Makes every read fail with a network error.
	pub fn unavailable(mut self) -> Self {
		self.unavailable = true;
		self
	}

	/// Returns the chain ids passed to [`ChainConnector::connect`], in order.
	pub fn connected_chains(&self) -> Vec<u64> {
		self.connected
			.lock()
			.map(|connected| connected.clone())
			.unwrap_or_default()
	}
}

impl ChainConnector for MemoryConnector {
	fn connect(&self, chain: &ChainContext) -> Result<Arc<dyn ChainInterface>, ChainError> {
		if let Ok(mut connected) = self.connected.lock() {
			connected.push(chain.id);
		}
		Ok(Arc::new(MemoryChain {
			chain_id: chain.id,
			accounts: Arc::clone(&self.accounts),
			deployless: self.deployless.clone(),
			unavailable: self.unavailable,
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, bytes};

	const WALLET: Address = address!("1111111111111111111111111111111111111111");

	fn mainnet() -> ChainContext {
		ChainContext::new(1, "mainnet", "http://localhost")
	}

	#[tokio::test]
	async fn test_accounts_without_code() {
		let chain = MemoryConnector::new().connect(&mainnet()).unwrap();
		assert!(chain.get_code(WALLET).await.unwrap().is_empty());
		assert!(chain.call(WALLET, Bytes::new()).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_contract_handler() {
		let connector = MemoryConnector::new().with_contract(WALLET, bytes!("6080"), |data| {
			if data.is_empty() {
				Err(ChainError::Reverted("empty calldata".into()))
			} else {
				Ok(data.clone())
			}
		});
		let chain = connector.connect(&mainnet()).unwrap();

		assert_eq!(chain.get_code(WALLET).await.unwrap(), bytes!("6080"));
		assert_eq!(
			chain.call(WALLET, bytes!("abcd")).await.unwrap(),
			bytes!("abcd")
		);
		assert!(matches!(
			chain.call(WALLET, Bytes::new()).await,
			Err(ChainError::Reverted(_))
		));
	}

	#[tokio::test]
	async fn test_deployless_handler() {
		let chain = MemoryConnector::new().connect(&mainnet()).unwrap();
		assert!(matches!(
			chain.call_deployless(bytes!("6080")).await,
			Err(ChainError::Reverted(_))
		));

		let connector = MemoryConnector::new().with_deployless(|code| Ok(code.slice(..1)));
		let chain = connector.connect(&mainnet()).unwrap();
		assert_eq!(
			chain.call_deployless(bytes!("01ff")).await.unwrap(),
			bytes!("01")
		);
	}

	#[tokio::test]
	async fn test_unavailable_chain() {
		let connector = MemoryConnector::new().unavailable();
		let chain = connector.connect(&mainnet()).unwrap();
		assert!(matches!(
			chain.get_code(WALLET).await,
			Err(ChainError::Network(_))
		));
		assert!(matches!(
			chain.call_deployless(Bytes::new()).await,
			Err(ChainError::Network(_))
		));
	}

	#[test]
	fn test_records_connected_chains() {
		let connector = MemoryConnector::new();
		connector.connect(&mainnet()).unwrap();
		connector
			.connect(&ChainContext::new(10, "optimism", "http://localhost"))
			.unwrap();
		assert_eq!(connector.connected_chains(), vec![1, 10]);
	}
}
