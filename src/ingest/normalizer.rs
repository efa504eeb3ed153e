//! Record normalization: fill missing or invalid telemetry fields with
//! defaults and derive a stable identifier for the update cycle.

use chrono::Utc;
use serde::{Deserialize, Deserializer};

use super::{RawTelemetry, TelemetryRecord};
use crate::geofence::Classification;

/// Zone label used when the source flags a record unauthorized but neither
/// the source nor the classifier names a zone.
const GENERIC_ZONE_LABEL: &str = "Unauthorized";

/// Deserialize a JSON value into `Some(f64)` only when it is numeric.
/// Strings, booleans, nulls, and structures all collapse to `None`; the
/// normalizer turns that into the documented lossy default of 0.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

/// Deserialize a JSON value into `Some(bool)` only when it is a boolean.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}

/// Derive the record id: a trimmed non-empty callsign wins, then the
/// registration code, then a time-based placeholder. Ids are not globally
/// unique across a batch.
fn derive_record_id(raw: &RawTelemetry) -> String {
    if let Some(callsign) = trimmed_non_empty(raw.callsign.as_deref()) {
        return callsign;
    }
    if let Some(registration) = trimmed_non_empty(raw.registration.as_deref()) {
        return registration;
    }
    format!("UAV-{}", Utc::now().timestamp_millis())
}

fn trimmed_non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Merge a raw telemetry object with its geofence classification into a
/// normalized record.
///
/// The source's own `unauthorized` flag is authoritative when true and is
/// OR-ed with the geofence result, never overridden back to false. When the
/// source asserts unauthorized, its own zone label is preferred, falling
/// back to the classifier's label and finally to a generic marker; otherwise
/// the classifier's zone name is used only when it independently matched.
pub fn normalize(raw: &RawTelemetry, classification: &Classification) -> TelemetryRecord {
    let source_flagged = raw.unauthorized.unwrap_or(false);
    let unauthorized = source_flagged || classification.unauthorized;

    let zone_name = if source_flagged {
        raw.zone
            .clone()
            .or_else(|| classification.zone_name.clone())
            .or_else(|| Some(GENERIC_ZONE_LABEL.to_string()))
    } else if classification.unauthorized {
        classification.zone_name.clone()
    } else {
        None
    };

    TelemetryRecord {
        id: derive_record_id(raw),
        latitude: raw.latitude.unwrap_or(0.0),
        longitude: raw.longitude.unwrap_or(0.0),
        altitude_m: raw.altitude.unwrap_or(0.0).max(0.0),
        velocity_kmh: raw.velocity.unwrap_or(0.0).max(0.0),
        unauthorized,
        zone_name,
    }
}
