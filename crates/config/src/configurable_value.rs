//! Credentials that load from environment variables or plain config values

use onramp_types::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A provider credential given either inline or by environment variable name
///
/// ```json
/// { "type": "env", "value": "TRANSAK_API_KEY" }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConfigurableValue {
	#[serde(rename = "type")]
	pub value_type: ValueType,
	/// Environment variable name or the literal value
	pub value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
	Env,
	Plain,
}

impl ConfigurableValue {
	pub fn from_env(env_var_name: &str) -> Self {
		Self {
			value_type: ValueType::Env,
			value: env_var_name.to_string(),
		}
	}

	pub fn from_plain(plain_value: &str) -> Self {
		Self {
			value_type: ValueType::Plain,
			value: plain_value.to_string(),
		}
	}

	pub fn resolve(&self) -> Result<String, ConfigurableValueError> {
		match self.value_type {
			ValueType::Env => match std::env::var(&self.value) {
				Ok(value) if !value.is_empty() => Ok(value),
				Ok(_) => Err(ConfigurableValueError::EmptyValue(self.description())),
				Err(_) => Err(ConfigurableValueError::EnvironmentVariableNotFound(
					self.value.clone(),
				)),
			},
			ValueType::Plain if self.value.is_empty() => {
				Err(ConfigurableValueError::EmptyValue(self.description()))
			},
			ValueType::Plain => Ok(self.value.clone()),
		}
	}

	/// Resolve straight into a zeroizing secret
	pub fn resolve_for_secret(&self) -> Result<SecretString, ConfigurableValueError> {
		self.resolve().map(SecretString::new)
	}

	/// Description safe for logs
	pub fn description(&self) -> String {
		match self.value_type {
			ValueType::Env => format!("environment variable '{}'", self.value),
			ValueType::Plain => "configured plain value".to_string(),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurableValueError {
	#[error("Environment variable '{0}' not found")]
	EnvironmentVariableNotFound(String),
	#[error("Empty credential from {0}")]
	EmptyValue(String),
}

impl fmt::Display for ConfigurableValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.value_type {
			ValueType::Env => write!(f, "env:{}", self.value),
			ValueType::Plain => write!(f, "plain:[REDACTED]"),
		}
	}
}

impl From<&str> for ConfigurableValue {
	fn from(value: &str) -> Self {
		match value.strip_prefix("env:") {
			Some(env_var) => Self::from_env(env_var),
			None => Self::from_plain(value),
		}
	}
}

impl From<String> for ConfigurableValue {
	fn from(value: String) -> Self {
		ConfigurableValue::from(value.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::env;

	#[test]
	fn test_env_value() {
		env::set_var("ONRAMP_TEST_KADO_KEY", "kado-key-from-env");
		let config = ConfigurableValue::from_env("ONRAMP_TEST_KADO_KEY");
		assert_eq!(config.resolve().unwrap(), "kado-key-from-env");
		assert_eq!(
			config.resolve_for_secret().unwrap().expose_secret(),
			"kado-key-from-env"
		);
		env::remove_var("ONRAMP_TEST_KADO_KEY");
		assert!(matches!(
			config.resolve(),
			Err(ConfigurableValueError::EnvironmentVariableNotFound(_))
		));
	}

	#[test]
	fn test_empty_plain_value_rejected() {
		let config = ConfigurableValue::from_plain("");
		assert!(matches!(
			config.resolve(),
			Err(ConfigurableValueError::EmptyValue(_))
		));
	}

	#[test]
	fn test_prefix_conversion_and_redaction() {
		let env_config = ConfigurableValue::from("env:TRANSAK_API_KEY");
		assert_eq!(env_config.value_type, ValueType::Env);
		assert_eq!(env_config.to_string(), "env:TRANSAK_API_KEY");

		let plain = ConfigurableValue::from("pk_live_123");
		assert_eq!(plain.value_type, ValueType::Plain);
		assert_eq!(plain.to_string(), "plain:[REDACTED]");
		assert_eq!(plain.description(), "configured plain value");
	}

	#[test]
	fn test_deserialize_tagged_shape() {
		let config: ConfigurableValue =
			serde_json::from_str(r#"{"type":"env","value":"TRANSAK_SECRET"}"#).unwrap();
		assert_eq!(config, ConfigurableValue::from_env("TRANSAK_SECRET"));
	}
}
