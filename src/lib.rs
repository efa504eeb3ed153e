// Library interface for skyfence
// This allows integration tests to access internal modules

pub mod alerts;
pub mod config;
pub mod display;
pub mod errors;
pub mod geofence;
pub mod ingest;
pub mod recorder;
pub mod stats;
pub mod validation;

// Re-export commonly used types
pub use display::{DisplayRecord, select_for_display};
pub use errors::SkyfenceError;
pub use geofence::{Classification, Zone, ZoneCategory, classify};
pub use ingest::{
    ConnectionState, DatasetSnapshot, IngestUpdate, RawTelemetry, TelemetryRecord,
};
pub use stats::{Stats, ThreatTier, summarize};
pub use validation::{ValidationReport, validate};
