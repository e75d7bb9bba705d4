//!
//! Utility module for the shielded session.
//!
//! Exact unit conversions and the serde helpers used to export amounts, field elements and raw
//! bytes without loss of precision.
/// Integer unit conversions and formatting
pub mod units;
/// Lossless serde encodings for big integers and byte strings
pub mod serialization;

pub use units::{UnitConverter, UnitError, format_token_amount, parse_token_amount};
