//! Monitoring record storage.
//!
//! The engine only sees the read side (`RecordSource`). Writes go through the
//! concrete store, as the input forms and asset registry would.

pub mod in_memory;

pub use in_memory::InMemoryRecordStore;

use thiserror::Error;

use agrimon_core::{AssetId, DomainError};

/// Store write error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("asset {0} is already registered")]
    DuplicateAsset(AssetId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store lock poisoned")]
    LockPoisoned,
}
