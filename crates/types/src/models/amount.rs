//! Integer token amounts in base units, carried as decimal strings

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Largest scale `rust_decimal` can represent
const MAX_DECIMALS: u8 = 28;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmountError {
	#[error("Amount must contain only digits, got '{0}'")]
	InvalidDigits(String),
	#[error("Amount does not fit into decimal precision")]
	Overflow,
	#[error("Invalid fiat value: {0}")]
	InvalidFiat(f64),
	#[error("Token price must be positive, got {0}")]
	NonPositivePrice(f64),
	#[error("Unsupported token decimals: {0}")]
	UnsupportedDecimals(u8),
}

pub type AmountResult<T> = Result<T, AmountError>;

/// Token amount in base units (wei-like), serialized as a string to preserve precision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TokenAmount(String);

impl TokenAmount {
	pub fn zero() -> Self {
		Self("0".to_string())
	}

	/// Parse a base-unit amount, rejecting anything that is not a plain digit string
	pub fn parse(value: impl Into<String>) -> AmountResult<Self> {
		let value = value.into();
		if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
			return Err(AmountError::InvalidDigits(value));
		}
		Ok(Self(value))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn as_u128(&self) -> Result<u128, std::num::ParseIntError> {
		self.0.parse()
	}

	pub fn is_zero(&self) -> bool {
		self.0.chars().all(|c| c == '0')
	}

	/// Convert a human-readable token quantity (e.g. `1.5` ETH) into base units.
	///
	/// Fractional base units are truncated.
	pub fn from_token_units(quantity: f64, decimals: u8) -> AmountResult<Self> {
		let quantity = Decimal::from_f64(quantity)
			.filter(|q| !q.is_sign_negative())
			.ok_or(AmountError::InvalidFiat(quantity))?;
		Self::from_decimal(quantity, decimals)
	}

	/// Amount of a token worth `fiat` USD at `usd_price`, in base units
	pub fn from_fiat(fiat: f64, usd_price: f64, decimals: u8) -> AmountResult<Self> {
		if usd_price <= 0.0 || !usd_price.is_finite() {
			return Err(AmountError::NonPositivePrice(usd_price));
		}
		let fiat_value = Decimal::from_f64(fiat)
			.filter(|f| !f.is_sign_negative())
			.ok_or(AmountError::InvalidFiat(fiat))?;
		let price = Decimal::from_f64(usd_price).ok_or(AmountError::NonPositivePrice(usd_price))?;
		let quantity = fiat_value.checked_div(price).ok_or(AmountError::Overflow)?;
		Self::from_decimal(quantity, decimals)
	}

	/// USD value of this amount at `usd_price`
	pub fn to_fiat(&self, usd_price: f64, decimals: u8) -> AmountResult<f64> {
		let price = Decimal::from_f64(usd_price).ok_or(AmountError::NonPositivePrice(usd_price))?;
		let value = self
			.to_token_units(decimals)?
			.checked_mul(price)
			.ok_or(AmountError::Overflow)?;
		value.to_f64().ok_or(AmountError::Overflow)
	}

	/// Human-readable quantity, i.e. the amount divided by `10^decimals`
	pub fn to_token_units(&self, decimals: u8) -> AmountResult<Decimal> {
		if decimals > MAX_DECIMALS {
			return Err(AmountError::UnsupportedDecimals(decimals));
		}
		let raw = self.as_u128().map_err(|_| AmountError::Overflow)?;
		let raw = i128::try_from(raw).map_err(|_| AmountError::Overflow)?;
		Decimal::try_from_i128_with_scale(raw, u32::from(decimals)).map_err(|_| AmountError::Overflow)
	}

	fn from_decimal(quantity: Decimal, decimals: u8) -> AmountResult<Self> {
		if decimals > MAX_DECIMALS {
			return Err(AmountError::UnsupportedDecimals(decimals));
		}
		let factor = 10u128
			.checked_pow(u32::from(decimals))
			.and_then(Decimal::from_u128)
			.ok_or(AmountError::Overflow)?;
		let scaled = quantity.checked_mul(factor).ok_or(AmountError::Overflow)?;
		Ok(Self(scaled.trunc().normalize().to_string()))
	}
}

impl std::fmt::Display for TokenAmount {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TokenAmount {
	type Err = AmountError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl From<u128> for TokenAmount {
	fn from(value: u128) -> Self {
		Self(value.to_string())
	}
}

impl From<u64> for TokenAmount {
	fn from(value: u64) -> Self {
		Self(value.to_string())
	}
}

impl serde::Serialize for TokenAmount {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.0)
	}
}

impl<'de> serde::Deserialize<'de> for TokenAmount {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		Self::parse(value).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_rejects_non_digits() {
		assert!(TokenAmount::parse("12a").is_err());
		assert!(TokenAmount::parse("").is_err());
		assert!(TokenAmount::parse("-1").is_err());
		assert_eq!(TokenAmount::parse("0042").unwrap().as_str(), "0042");
	}

	#[test]
	fn test_from_fiat_uses_price_and_decimals() {
		// $100 of an $2000 token with 18 decimals is 0.05 tokens
		let amount = TokenAmount::from_fiat(100.0, 2000.0, 18).unwrap();
		assert_eq!(amount.as_str(), "50000000000000000");

		let stable = TokenAmount::from_fiat(96.0, 1.0, 0).unwrap();
		assert_eq!(stable.as_str(), "96");
	}

	#[test]
	fn test_from_fiat_truncates_fractional_units() {
		let amount = TokenAmount::from_fiat(10.0, 3.0, 0).unwrap();
		assert_eq!(amount.as_str(), "3");
	}

	#[test]
	fn test_from_fiat_rejects_bad_price() {
		assert_eq!(
			TokenAmount::from_fiat(10.0, 0.0, 6),
			Err(AmountError::NonPositivePrice(0.0))
		);
		assert!(TokenAmount::from_fiat(-1.0, 1.0, 6).is_err());
	}

	#[test]
	fn test_to_fiat() {
		let amount = TokenAmount::parse("2500000").unwrap();
		let fiat = amount.to_fiat(1.0, 6).unwrap();
		assert!((fiat - 2.5).abs() < 1e-9);
	}

	#[test]
	fn test_from_token_units() {
		let amount = TokenAmount::from_token_units(1.5, 6).unwrap();
		assert_eq!(amount.as_str(), "1500000");
	}

	#[test]
	fn test_serde_as_string() {
		let amount = TokenAmount::from(1000u64);
		let json = serde_json::to_string(&amount).unwrap();
		assert_eq!(json, "\"1000\"");
		let back: TokenAmount = serde_json::from_str(&json).unwrap();
		assert_eq!(back, amount);
		assert!(serde_json::from_str::<TokenAmount>("\"1.5\"").is_err());
	}
}
