//! Shared mocks and fixtures for the integration tests

pub mod adapters;
pub mod fixtures;
pub mod provider_server;
pub mod services;

#[allow(unused_imports)]
pub use adapters::ScriptedAdapter;
#[allow(unused_imports)]
pub use services::{FixedSwapResolver, RecordingSwapService, ScriptedPaymentFlow};
