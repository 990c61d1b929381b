//! Quote request model, validation and normalization

use serde::{Deserialize, Serialize};

use super::{QuoteValidationError, QuoteValidationResult};
use crate::models::{is_chain_supported, FiatCurrency, Token, TokenAmount};
use crate::providers::{PaymentMethod, ProviderMeta, ProviderType, RouteType};

/// Raw quote request as supplied by a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
	/// Recipient address
	pub to: String,
	pub chain_id: u64,
	/// Address of the token to receive
	pub token: String,
	/// Amount to receive, in token base units
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<TokenAmount>,
	/// Amount to pay, in fiat
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fiat_amount: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fiat_currency: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_types: Option<Vec<ProviderType>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_methods: Option<Vec<PaymentMethod>>,
	/// Provider keys to restrict the search to
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub services: Option<Vec<String>>,
	#[serde(default)]
	pub route_type: RouteType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
	#[serde(default)]
	pub dev: bool,
}

impl QuoteRequest {
	/// Checks that need no catalog access
	pub fn validate(&self) -> QuoteValidationResult<()> {
		if self.to.trim().is_empty() {
			return Err(QuoteValidationError::MissingRequiredField {
				field: "to".to_string(),
			});
		}
		if self.token.trim().is_empty() {
			return Err(QuoteValidationError::MissingRequiredField {
				field: "token".to_string(),
			});
		}

		match (&self.amount, self.fiat_amount) {
			(Some(_), Some(_)) => return Err(QuoteValidationError::ConflictingAmounts),
			(None, None) => return Err(QuoteValidationError::MissingAmount),
			(Some(amount), None) if amount.is_zero() => {
				return Err(QuoteValidationError::InvalidAmount {
					field: "amount".to_string(),
					reason: "must be greater than zero".to_string(),
				});
			},
			(None, Some(fiat)) if !(fiat.is_finite() && fiat > 0.0) => {
				return Err(QuoteValidationError::InvalidAmount {
					field: "fiatAmount".to_string(),
					reason: "must be a positive number".to_string(),
				});
			},
			_ => {},
		}

		if self.route_type != RouteType::Buy {
			return Err(QuoteValidationError::UnsupportedRouteType {
				route_type: self.route_type.to_string(),
			});
		}

		if !is_chain_supported(self.chain_id) {
			return Err(QuoteValidationError::UnsupportedChain {
				chain_id: self.chain_id,
			});
		}

		self.resolved_fiat_currency()?;
		Ok(())
	}

	fn resolved_fiat_currency(&self) -> QuoteValidationResult<FiatCurrency> {
		match &self.fiat_currency {
			None => Ok(FiatCurrency::default()),
			Some(code) => FiatCurrency::parse(code).ok_or_else(|| {
				QuoteValidationError::UnsupportedFiatCurrency {
					currency: code.clone(),
				}
			}),
		}
	}

	/// Build normalized options once the requested token has been resolved.
	///
	/// Whichever of `amount`/`fiatAmount` was omitted is derived from the token's price.
	pub fn normalize(self, token: Token) -> QuoteValidationResult<QuoteOptions> {
		self.validate()?;
		let fiat_currency = self.resolved_fiat_currency()?;

		let unpriceable = |reason: String| QuoteValidationError::UnpriceableToken {
			symbol: token.symbol.clone(),
			reason,
		};
		let (amount_units, fiat_amount) = match (self.amount, self.fiat_amount) {
			(Some(units), None) => {
				let fiat = token
					.fiat_for_units(&units)
					.map_err(|e| unpriceable(e.to_string()))?;
				(units, fiat)
			},
			(None, Some(fiat)) => {
				let units = token
					.units_for_fiat(fiat)
					.map_err(|e| unpriceable(e.to_string()))?;
				(units, fiat)
			},
			(Some(_), Some(_)) => return Err(QuoteValidationError::ConflictingAmounts),
			(None, None) => return Err(QuoteValidationError::MissingAmount),
		};

		Ok(QuoteOptions {
			to: self.to,
			chain_id: self.chain_id,
			token,
			amount_units,
			fiat_amount,
			fiat_currency,
			provider_types: self
				.provider_types
				.unwrap_or_else(|| vec![ProviderType::Cex, ProviderType::Onramp]),
			payment_methods: self.payment_methods.unwrap_or_else(PaymentMethod::all),
			services: self.services,
			route_type: self.route_type,
			country: self.country.map(|c| c.to_ascii_uppercase()),
			dev: self.dev,
		})
	}
}

/// Normalized quote options handed to providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteOptions {
	pub to: String,
	pub chain_id: u64,
	pub token: Token,
	pub amount_units: TokenAmount,
	pub fiat_amount: f64,
	pub fiat_currency: FiatCurrency,
	pub provider_types: Vec<ProviderType>,
	pub payment_methods: Vec<PaymentMethod>,
	pub services: Option<Vec<String>>,
	pub route_type: RouteType,
	pub country: Option<String>,
	pub dev: bool,
}

impl QuoteOptions {
	pub fn allows_provider(&self, provider: &ProviderMeta) -> bool {
		let type_allowed = self.provider_types.contains(&provider.provider_type);
		let key_allowed = self
			.services
			.as_ref()
			.map_or(true, |keys| keys.iter().any(|k| k == &provider.key));
		type_allowed && key_allowed
	}

	pub fn allows_payment_method(&self, method: &PaymentMethod) -> bool {
		self.payment_methods.contains(method)
	}

	/// Same request, but asking the provider for `token` instead.
	///
	/// The fiat side is preserved, the unit amount is recomputed at `token`'s price.
	pub fn for_token(&self, token: Token) -> QuoteValidationResult<QuoteOptions> {
		let amount_units = token.units_for_fiat(self.fiat_amount).map_err(|e| {
			QuoteValidationError::UnpriceableToken {
				symbol: token.symbol.clone(),
				reason: e.to_string(),
			}
		})?;
		Ok(QuoteOptions {
			token,
			amount_units,
			..self.clone()
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::ZKSYNC_ERA_CHAIN_ID;

	fn usdc() -> Token {
		Token::new(ZKSYNC_ERA_CHAIN_ID, "0xusdc", "USDC", 6, 1.0)
	}

	fn request() -> QuoteRequest {
		QuoteRequest {
			to: "0xrecipient".to_string(),
			chain_id: ZKSYNC_ERA_CHAIN_ID,
			token: "0xusdc".to_string(),
			fiat_amount: Some(100.0),
			..Default::default()
		}
	}

	#[test]
	fn test_rejects_both_amounts() {
		let req = QuoteRequest {
			amount: Some(TokenAmount::from(1000u64)),
			..request()
		};
		assert_eq!(req.validate(), Err(QuoteValidationError::ConflictingAmounts));
	}

	#[test]
	fn test_rejects_missing_amount() {
		let req = QuoteRequest {
			fiat_amount: None,
			..request()
		};
		assert_eq!(req.validate(), Err(QuoteValidationError::MissingAmount));
	}

	#[test]
	fn test_rejects_sell_route() {
		let req = QuoteRequest {
			route_type: RouteType::Sell,
			..request()
		};
		assert!(matches!(
			req.validate(),
			Err(QuoteValidationError::UnsupportedRouteType { .. })
		));
	}

	#[test]
	fn test_rejects_unknown_chain_and_currency() {
		let req = QuoteRequest {
			chain_id: 42161,
			..request()
		};
		assert_eq!(
			req.validate(),
			Err(QuoteValidationError::UnsupportedChain { chain_id: 42161 })
		);

		let req = QuoteRequest {
			fiat_currency: Some("EUR".to_string()),
			..request()
		};
		assert!(matches!(
			req.validate(),
			Err(QuoteValidationError::UnsupportedFiatCurrency { .. })
		));
	}

	#[test]
	fn test_normalize_derives_units_from_fiat() {
		let options = request().normalize(usdc()).unwrap();
		assert_eq!(options.amount_units.as_str(), "100000000");
		assert_eq!(options.fiat_amount, 100.0);
		assert_eq!(options.payment_methods.len(), PaymentMethod::all().len());
		assert_eq!(options.fiat_currency, FiatCurrency::Usd);
	}

	#[test]
	fn test_normalize_derives_fiat_from_units() {
		let req = QuoteRequest {
			fiat_amount: None,
			amount: Some(TokenAmount::from(25_000_000u64)),
			..request()
		};
		let options = req.normalize(usdc()).unwrap();
		assert!((options.fiat_amount - 25.0).abs() < 1e-9);
	}

	#[test]
	fn test_provider_filters() {
		let options = QuoteRequest {
			services: Some(vec!["kado".to_string()]),
			provider_types: Some(vec![ProviderType::Onramp]),
			..request()
		}
		.normalize(usdc())
		.unwrap();

		let kado = ProviderMeta::new("kado", ProviderType::Onramp, "Kado", "");
		let transak = ProviderMeta::new("transak", ProviderType::Onramp, "Transak", "");
		let binance = ProviderMeta::new("kado", ProviderType::Cex, "Kado CEX", "");
		assert!(options.allows_provider(&kado));
		assert!(!options.allows_provider(&transak));
		assert!(!options.allows_provider(&binance));
	}

	#[test]
	fn test_for_token_keeps_fiat_side() {
		let options = request().normalize(usdc()).unwrap();
		let eth = Token::new(ZKSYNC_ERA_CHAIN_ID, "0xeth", "ETH", 18, 2000.0);
		let swapped = options.for_token(eth).unwrap();
		assert_eq!(swapped.fiat_amount, 100.0);
		assert_eq!(swapped.amount_units.as_str(), "50000000000000000");
		assert_eq!(swapped.token.symbol, "ETH");
	}
}
