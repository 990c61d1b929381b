//! Storage traits for pluggable catalog implementations

// Re-export the storage traits from types crate
pub use onramp_types::storage::{
	CatalogStorage as Storage, ProviderRouteStorageTrait as ProviderRouteStorage, ReconcileOutcome,
	StorageError, StorageResult, SyncStateStorageTrait as SyncStateStorage,
	TokenStorageTrait as TokenStorage,
};
