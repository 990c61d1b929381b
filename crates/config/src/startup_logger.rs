//! Service startup logging for the on-ramp aggregator

use std::env;
use tracing::info;

use crate::Settings;

/// Logs service and environment information at startup
pub fn log_service_info() {
	let service_name = "onramp-aggregator";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== On-ramp Aggregator Starting ===");
	info!("🚀 Service: {} v{}", service_name, service_version);
	info!("💻 Platform: {}", env::consts::OS);
	info!("🏗️ Architecture: {}", env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("📁 Working Directory: {}", cwd.display());
	}

	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Level: {}", rust_log);
	}

	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs the effective configuration without secrets
pub fn log_settings_summary(settings: &Settings) {
	info!(
		"🔌 Providers: transak={} kado={}",
		settings.providers.transak.enabled, settings.providers.kado.enabled
	);
	info!(
		"🔁 Swap routing: enabled={} base_url={}",
		settings.swap.enabled, settings.swap.base_url
	);
	info!("🪙 Catalog tokens: {}", settings.tokens.len());
	info!(
		"⏱️ Status polling every {}ms, budget {}",
		settings.execution.status_poll_interval_ms,
		settings
			.execution
			.status_poll_timeout_ms
			.map(|ms| format!("{}ms", ms))
			.unwrap_or_else(|| "unbounded".to_string())
	);
	if settings.execution.dev {
		info!("🧪 Dev mode: provider sandboxes in use");
	}
}

pub fn log_service_shutdown() {
	info!("🛑 On-ramp Aggregator Shutting Down");
	info!(
		"🕒 Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs that the first sync cycle finished and quotes can be served
pub fn log_startup_complete(provider_count: usize) {
	info!("✅ On-ramp Aggregator Started Successfully");
	info!("📡 {} provider(s) synced, ready to quote", provider_count);
}
