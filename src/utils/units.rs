//! Exact integer conversions between native base units, shielded pool units and human-readable
//! decimal strings.
//!
//! The pool tracks value in coarser "shielded" units (9 decimals by default) than the chain's
//! native base unit (18 decimals on EVM networks). Every conversion here is integer arithmetic;
//! floating point is never used for amounts.

use thiserror::Error;

/// Largest decimal exponent that still fits a `u128` scale factor.
const MAX_DECIMALS: u32 = 38;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
	#[error("Invalid amount: {0:?}")]
	InvalidAmount(String),

	#[error("Amount {amount:?} has more than {decimals} fractional digits")]
	TooPrecise { amount: String, decimals: u32 },

	#[error("Amount overflows the 128-bit range")]
	Overflow,

	#[error("Invalid decimals: native {native}, shielded {shielded}")]
	InvalidDecimals { native: u32, shielded: u32 },
}

fn scale(decimals: u32) -> Result<u128, UnitError> {
	10u128.checked_pow(decimals).ok_or(UnitError::Overflow)
}

/// Formats an integer amount with `decimals` implied fractional digits.
///
/// Trailing fractional zeros are dropped, so `1_500_000` with 6 decimals renders as `"1.5"`.
pub fn format_token_amount(amount: u128, decimals: u32) -> String {
	let Ok(scale) = scale(decimals) else {
		return format!("0.{:0>width$}", amount, width = decimals as usize);
	};
	if decimals == 0 {
		return amount.to_string();
	}

	let whole = amount / scale;
	let fraction = amount % scale;
	if fraction == 0 {
		return whole.to_string();
	}

	let fraction = format!("{:0width$}", fraction, width = decimals as usize);
	format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Parses a human decimal string (`"12"`, `"0.25"`, `"1."`) into an integer amount with
/// `decimals` implied fractional digits.
pub fn parse_token_amount(input: &str, decimals: u32) -> Result<u128, UnitError> {
	let trimmed = input.trim();
	let invalid = || UnitError::InvalidAmount(input.to_string());

	let (whole, fraction) = match trimmed.split_once('.') {
		Some((whole, fraction)) => (whole, fraction),
		None => (trimmed, ""),
	};

	if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
		return Err(invalid());
	}
	if !fraction.bytes().all(|b| b.is_ascii_digit()) {
		return Err(invalid());
	}

	let fraction_len = fraction.len() as u32;
	if fraction_len > decimals {
		return Err(UnitError::TooPrecise {
			amount: input.to_string(),
			decimals,
		});
	}

	let whole: u128 = whole.parse().map_err(|_| UnitError::Overflow)?;
	let fraction: u128 = if fraction.is_empty() {
		0
	} else {
		fraction.parse().map_err(|_| UnitError::Overflow)?
	};

	let whole_part = whole
		.checked_mul(scale(decimals)?)
		.ok_or(UnitError::Overflow)?;
	let fraction_part = fraction
		.checked_mul(scale(decimals - fraction_len)?)
		.ok_or(UnitError::Overflow)?;

	whole_part
		.checked_add(fraction_part)
		.ok_or(UnitError::Overflow)
}

/// Converts between native base units, shielded units and human strings for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitConverter {
	native_decimals: u32,
	shielded_decimals: u32,
	denominator: u128,
}

impl UnitConverter {
	pub fn new(native_decimals: u32, shielded_decimals: u32) -> Result<Self, UnitError> {
		if native_decimals > MAX_DECIMALS || shielded_decimals > native_decimals {
			return Err(UnitError::InvalidDecimals {
				native: native_decimals,
				shielded: shielded_decimals,
			});
		}

		Ok(Self {
			native_decimals,
			shielded_decimals,
			denominator: scale(native_decimals - shielded_decimals)?,
		})
	}

	pub fn native_decimals(&self) -> u32 {
		self.native_decimals
	}

	pub fn shielded_decimals(&self) -> u32 {
		self.shielded_decimals
	}

	/// Number of native base units per shielded unit.
	pub fn denominator(&self) -> u128 {
		self.denominator
	}

	/// Native base units to shielded units. Sub-unit dust is truncated.
	pub fn native_to_shielded(&self, native: u128) -> u128 {
		native / self.denominator
	}

	pub fn shielded_to_native(&self, shielded: u128) -> Result<u128, UnitError> {
		shielded
			.checked_mul(self.denominator)
			.ok_or(UnitError::Overflow)
	}

	pub fn parse_native(&self, human: &str) -> Result<u128, UnitError> {
		parse_token_amount(human, self.native_decimals)
	}

	pub fn parse_shielded(&self, human: &str) -> Result<u128, UnitError> {
		parse_token_amount(human, self.shielded_decimals)
	}

	pub fn format_native(&self, native: u128) -> String {
		format_token_amount(native, self.native_decimals)
	}

	pub fn format_shielded(&self, shielded: u128) -> String {
		format_token_amount(shielded, self.shielded_decimals)
	}
}
