//! Infrastructure layer: record storage and configuration.

pub mod config;
pub mod store;

mod integration_tests;

pub use config::{AgrimonConfig, ConfigError};
pub use store::{InMemoryRecordStore, StoreError};
