//! Serde helpers for auditor-facing exports.
//!
//! JSON consumers routinely parse numbers as IEEE doubles, so 128-bit amounts and field elements
//! are written as decimal strings and raw bytes as `0x`-prefixed hex.

/// `u128` as a decimal string.
pub mod u128_string {
	use serde::{Deserialize, Deserializer, Serializer, de::Error};

	pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(value)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(D::Error::custom)
	}
}

/// `BigUint` as a decimal string.
pub mod biguint_string {
	use num_bigint::BigUint;
	use serde::{Deserialize, Deserializer, Serializer, de::Error};

	pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(value)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(D::Error::custom)
	}
}

/// `Option<BigUint>` as an optional decimal string.
pub mod option_biguint_string {
	use num_bigint::BigUint;
	use serde::{Deserialize, Deserializer, Serializer, de::Error};

	pub fn serialize<S: Serializer>(
		value: &Option<BigUint>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match value {
			Some(value) => serializer.collect_str(value),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<BigUint>, D::Error> {
		Option::<String>::deserialize(deserializer)?
			.map(|raw| raw.parse().map_err(D::Error::custom))
			.transpose()
	}
}

/// Byte strings as `0x`-prefixed hex.
pub mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer, de::Error};

	pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{}", hex::encode(value)))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let raw = String::deserialize(deserializer)?;
		let digits = raw.strip_prefix("0x").unwrap_or(&raw);
		hex::decode(digits).map_err(D::Error::custom)
	}
}
