//! Storage contracts for the token and provider catalog

pub mod errors;
pub mod traits;

pub use errors::{StorageError, StorageResult};
pub use traits::{
	diff_sets, CatalogStorage, ProviderRouteStorageTrait, ReconcileOutcome, SyncStateStorageTrait,
	TokenStorageTrait,
};
