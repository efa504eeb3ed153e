//! Telemetry ingestion: data model, normalization, sources, and the
//! pipeline that owns the canonical dataset.

pub mod fallback;
pub mod normalizer;
pub mod pipeline;
pub mod source;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geofence::{self, Classification, Zone};
use normalizer::{lenient_bool, lenient_f64, normalize};

/// One telemetry object as delivered by the snapshot endpoint or the stream.
/// Every field is optional and numeric fields tolerate non-numeric values;
/// the normalizer fills in the defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawTelemetry {
    #[serde(default)]
    pub callsign: Option<String>,
    /// Secondary identifier (e.g. an external registration code), used for
    /// id derivation when the callsign is absent.
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    /// Altitude in meters.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude: Option<f64>,
    /// Ground speed in km/h.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub velocity: Option<f64>,
    /// Authoritative when true; the geofence result can only add to it.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub unauthorized: Option<bool>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A normalized telemetry record. Invariants: `altitude_m` and
/// `velocity_kmh` are non-negative, and `zone_name` is `None` whenever
/// `unauthorized` is false.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Derived identifier, stable within one update cycle but not globally
    /// unique; rendering keys must add the record position (see
    /// [`crate::display::select_for_display`]).
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub velocity_kmh: f64,
    pub unauthorized: bool,
    pub zone_name: Option<String>,
}

/// The canonical dataset as published to consumers: an immutable snapshot
/// replaced wholesale on every ingestion cycle.
#[derive(Clone, Debug)]
pub struct DatasetSnapshot {
    pub records: Arc<Vec<TelemetryRecord>>,
    pub updated_at: DateTime<Utc>,
}

/// Connection lifecycle of the streaming subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

/// Events published by the ingestion pipeline. Consumers never see errors;
/// source failures degrade to fallback data and state transitions.
#[derive(Clone, Debug)]
pub enum IngestUpdate {
    Dataset(DatasetSnapshot),
    Connection(ConnectionState),
}

/// Classify and normalize one batch of raw telemetry against the current
/// zone set. Records missing either coordinate are classified as clear, the
/// same way the zone check treats unknown positions.
pub fn ingest_batch(raw_records: &[RawTelemetry], zones: &[Zone]) -> Vec<TelemetryRecord> {
    raw_records
        .iter()
        .map(|raw| {
            let classification = match (raw.latitude, raw.longitude) {
                (Some(latitude), Some(longitude)) => geofence::classify(latitude, longitude, zones),
                _ => Classification::default(),
            };
            normalize(raw, &classification)
        })
        .collect()
}
