//! Utility functions for hex handling and common type conversions.

pub mod conversion;
pub mod formatting;

pub use conversion::{parse_address, parse_hex_bytes, ConversionError};
pub use formatting::{truncate_id, utf8_to_hex, without_0x_prefix};
