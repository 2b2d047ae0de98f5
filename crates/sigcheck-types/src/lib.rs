//! Common types module for the sigcheck workspace.
//!
//! This module defines the data types shared by the request formatter, the
//! chain registry and the verification dispatcher, so that all of them agree
//! on method names, chain parameters and outcomes.

/// Chain configuration and resolved chain context types.
pub mod chains;
/// Signing method taxonomy.
pub mod method;
/// Utility functions for hex handling and conversions.
pub mod utils;
/// Verification request and outcome types.
pub mod verification;

pub use chains::{
	deserialize_chains, ChainConfig, ChainContext, ChainsConfig, DEFAULT_CHAIN_ID,
};
pub use method::{SigningMethod, UnknownMethodError};
pub use utils::{
	parse_address, parse_hex_bytes, truncate_id, utf8_to_hex, without_0x_prefix,
	ConversionError,
};
pub use verification::{VerificationOutcome, VerificationRequest};
