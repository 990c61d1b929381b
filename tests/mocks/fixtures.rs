//! Catalog tokens, settings and requests shared across the integration tests

#![allow(dead_code)]

use onramp_aggregator::config::{Settings, TokenConfig};
use onramp_aggregator::models::{QuoteRequest, Token};

pub const RECIPIENT: &str = "0x8f1cF0A5e5E8E2F47BfaF9c1A9e0f1f2b5cD7e11";
pub const USDC_ADDRESS: &str = "0x1d17CBcF0D6D143135aE902365D2E5e2A16538D4";
pub const ZK_ADDRESS: &str = "0x5A7d6b2F92C77FAD6CCaBd7EE0624E64907Eaf3E";

pub fn usdc() -> Token {
	Token::new(324, USDC_ADDRESS, "USDC", 6, 1.0)
}

pub fn zk() -> Token {
	Token::new(324, ZK_ADDRESS, "ZK", 18, 0.5)
}

fn token_config(token: &Token) -> TokenConfig {
	TokenConfig {
		chain_id: token.chain_id,
		address: token.address.clone(),
		symbol: token.symbol.clone(),
		name: None,
		decimals: token.decimals,
		usd_price: token.usd_price,
		market_cap: None,
		icon_url: None,
	}
}

/// Settings with no configured providers, no LiFi resolver and short timeouts
pub fn settings() -> Settings {
	let mut settings = Settings::default();
	settings.tokens = vec![token_config(&usdc()), token_config(&zk())];
	settings.swap.enabled = false;
	settings.aggregation.per_provider_timeout_ms = 300;
	settings.sync.readiness_timeout_ms = 2_000;
	settings.execution.status_poll_interval_ms = 10;
	settings
}

pub fn fiat_request(token: &Token, fiat_amount: f64) -> QuoteRequest {
	QuoteRequest {
		to: RECIPIENT.to_string(),
		chain_id: token.chain_id,
		token: token.address.clone(),
		fiat_amount: Some(fiat_amount),
		..Default::default()
	}
}
