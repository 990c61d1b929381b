//! On-ramp Configuration
//!
//! Settings, credential resolution and startup logging for the on-ramp aggregator.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, load_config_from, ConfigLoadError, ENV_PREFIX};
pub use settings::{
	AggregationSettings, ConfigValidationError, ExecutionConfig, KadoSettings, LogFormat,
	LoggingSettings, ProvidersSettings, Settings, SwapSettings, SyncSettings, TimeoutSettings,
	TokenConfig, TransakSettings,
};
pub use startup_logger::{
	log_service_info, log_service_shutdown, log_settings_summary, log_startup_complete,
};
