//! Small HTTP helpers shared by the provider adapters

use onramp_types::{ProviderError, ProviderResult};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Join `path` onto `base_url`, treating the base as a directory
pub fn build_url(provider: &str, base_url: &str, path: &str) -> ProviderResult<Url> {
	let mut base = Url::parse(base_url).map_err(|e| ProviderError::Config {
		reason: format!("Invalid {} base URL '{}': {}", provider, base_url, e),
	})?;

	if !base.path().ends_with('/') {
		base.set_path(&format!("{}/", base.path()));
	}

	base.join(path.trim_start_matches('/')).map_err(|e| {
		ProviderError::invalid_response(
			provider,
			format!("Failed to join '{}' to '{}': {}", path, base_url, e),
		)
	})
}

/// Check the status and decode the JSON body of a provider response
pub async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> ProviderResult<T> {
	let status = response.status();
	let url = response.url().to_string();
	let body = response.text().await?;

	if !status.is_success() {
		debug!("{} responded {} for {}: {}", provider, status, url, body);
		return Err(ProviderError::HttpStatus {
			status_code: status.as_u16(),
			reason: body,
		});
	}

	debug!("{} responded with {} bytes for {}", provider, body.len(), url);
	serde_json::from_str(&body).map_err(|e| {
		ProviderError::invalid_response(provider, format!("Failed to parse response from {}: {}", url, e))
	})
}

/// Same as [`read_json`] but maps a 404 to [`ProviderError::OrderNotFound`]
pub async fn read_order_json<T: DeserializeOwned>(
	provider: &str,
	order_id: &str,
	response: Response,
) -> ProviderResult<T> {
	if response.status() == StatusCode::NOT_FOUND {
		return Err(ProviderError::OrderNotFound {
			provider: provider.to_string(),
			order_id: order_id.to_string(),
		});
	}
	read_json(provider, response).await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_build_url_keeps_base_path() {
		let url = build_url("transak", "https://api.transak.com/api", "/v2/countries").unwrap();
		assert_eq!(url.as_str(), "https://api.transak.com/api/v2/countries");

		let url = build_url("kado", "https://api.kado.money/", "v2/ramp/quote").unwrap();
		assert_eq!(url.as_str(), "https://api.kado.money/v2/ramp/quote");
	}

	#[test]
	fn test_build_url_rejects_garbage_base() {
		assert!(matches!(
			build_url("kado", "not a url", "x"),
			Err(ProviderError::Config { .. })
		));
	}
}
