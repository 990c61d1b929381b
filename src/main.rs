//! On-ramp Aggregator
//!
//! Runs the provider sync workers and keeps the catalog fresh until interrupted.

use onramp_aggregator::{
	init_tracing_from_settings, load_config, log_service_info, log_startup_complete,
	OnrampBuilder, Settings,
};
use onramp_config::{log_service_shutdown, log_settings_summary};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Load .env file if it exists
	dotenvy::dotenv().ok();

	let (settings, load_error) = match load_config() {
		Ok(settings) => (settings, None),
		Err(e) => (Settings::default(), Some(e)),
	};
	init_tracing_from_settings(&settings);
	log_service_info();
	if let Some(e) = load_error {
		warn!("Falling back to default configuration: {}", e);
	}
	log_settings_summary(&settings);

	let mut app = OnrampBuilder::new(settings).build().await?;
	let provider_count = app.providers.len();
	app.start_sync();

	match app.wait_until_ready().await {
		Ok(()) => log_startup_complete(provider_count),
		Err(e) => error!("Initial sync did not complete: {}", e),
	}

	info!("Press Ctrl-C to stop");
	tokio::signal::ctrl_c().await?;

	app.shutdown().await;
	log_service_shutdown();
	Ok(())
}
