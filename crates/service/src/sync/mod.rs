//! Background synchronization of provider routes and the token catalog
//!
//! Each [`SyncTask`] is driven by its own [`SyncWorker`]. Workers share a [`ReadinessGate`]
//! that the quote aggregator waits on before serving its first request.

pub mod readiness;
pub mod tasks;
pub mod worker;

pub use readiness::ReadinessGate;
pub use tasks::{ProviderSyncTask, TokenCatalogSyncTask};
pub use worker::{SyncManager, SyncWorker, SyncWorkerConfig};

use async_trait::async_trait;
use onramp_types::{ProviderError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
	#[error("Provider sync failed: {0}")]
	Provider(#[from] ProviderError),

	#[error("Catalog error: {0}")]
	Storage(#[from] StorageError),

	#[error("Not ready: {reason}")]
	NotReady { reason: String },
}

pub type SyncResult<T> = Result<T, SyncError>;

/// One unit of periodic synchronization
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SyncTask: Send + Sync {
	/// Stable key, also used for the shared last-synced timestamp
	fn key(&self) -> String;

	async fn run(&self) -> SyncResult<()>;
}
