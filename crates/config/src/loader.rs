//! Configuration loading utilities

use crate::{settings::ConfigValidationError, Settings};
use config::{Config, ConfigError, Environment, File};

/// Prefix for environment overrides, e.g. `ONRAMP__EXECUTION__DEV=true`
pub const ENV_PREFIX: &str = "ONRAMP";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
	#[error("Failed to load configuration: {0}")]
	Load(#[from] ConfigError),
	#[error("Invalid configuration: {0}")]
	Invalid(#[from] ConfigValidationError),
}

/// Load `config/config.*` overlaid with `ONRAMP__` environment variables, then validate
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	load_config_from("config/config")
}

/// Same as [`load_config`] with an explicit file stem
pub fn load_config_from(path: &str) -> Result<Settings, ConfigLoadError> {
	let s = Config::builder()
		.add_source(File::with_name(path).required(false))
		.add_source(
			Environment::with_prefix(ENV_PREFIX)
				.prefix_separator("__")
				.separator("__")
				.try_parsing(true),
		)
		.build()?;

	let settings: Settings = s.try_deserialize()?;
	settings.validate()?;
	Ok(settings)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_file_yields_defaults() {
		let settings = load_config_from("config/does-not-exist").unwrap();
		assert_eq!(settings.sync.resync_delay_secs, 3_600);
		assert!(settings.tokens.is_empty());
	}
}
