//! Built-in table of well-known EVM chains with public HTTP endpoints.

use sigcheck_types::ChainConfig;
use std::collections::HashMap;

const KNOWN_CHAINS: &[(u64, &str, &str)] = &[
	(1, "mainnet", "https://eth.merkle.io"),
	(10, "optimism", "https://mainnet.optimism.io"),
	(137, "polygon", "https://polygon-rpc.com"),
	(8453, "base", "https://mainnet.base.org"),
	(17000, "holesky", "https://ethereum-holesky-rpc.publicnode.com"),
	(42161, "arbitrum", "https://arb1.arbitrum.io/rpc"),
	(84532, "base-sepolia", "https://sepolia.base.org"),
	(11155111, "sepolia", "https://ethereum-sepolia-rpc.publicnode.com"),
];

/// Returns the built-in chain table keyed by chain id.
pub fn known_chains() -> HashMap<u64, ChainConfig> {
	KNOWN_CHAINS
		.iter()
		.map(|(id, name, rpc_url)| {
			(
				*id,
				ChainConfig {
					name: name.to_string(),
					rpc_url: rpc_url.to_string(),
				},
			)
		})
		.collect()
}
