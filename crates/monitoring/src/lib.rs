//! Monitoring data model.
//!
//! Typed records for the assets under watch and everything they report. These
//! types are produced by the storage/input collaborators; the advisory engine only
//! reads them. `ingest` is the parse step that turns loosely-typed stored rows into
//! these records.

pub mod asset;
pub mod event;
pub mod ingest;
pub mod profile;
pub mod reading;
pub mod targets;

pub use asset::{ActivityKind, MonitoredAsset};
pub use event::{
    ColonyStrength, EventDetail, EventDomain, FieldEvent, InspectionLog, ProductionLog,
    ReproductionLog,
};
pub use ingest::{IngestIssue, IngestReport, Ingested, RawEvent, RawReading};
pub use profile::{Bounds, ProfileSet, ThresholdProfile};
pub use reading::{Metric, Reading};
pub use targets::Targets;
