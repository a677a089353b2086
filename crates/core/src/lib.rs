//! `agrimon-core`: foundation building blocks shared by the monitoring crates.
//!
//! This crate contains **pure** primitives (no storage, no IO): identifiers, the
//! record contract used by windowing/resolution, and the domain error model.

pub mod error;
pub mod id;
pub mod record;
pub mod window;

pub use error::{DomainError, DomainResult};
pub use id::AssetId;
pub use record::AssetRecord;
pub use window::TimeWindow;
