//! Synthetic telemetry generation.
//!
//! When the snapshot source is unavailable the pipeline fabricates a
//! dataset instead of publishing nothing, so downstream consumers always
//! start with data. Positions are randomized inside a continental bounding
//! box; forced-unauthorized records are placed near a restricted zone and
//! carry the source `unauthorized` flag, so the normalizer's OR rule keeps
//! them flagged even when the active zone set is empty.

use rand::Rng;

use super::{RawTelemetry, TelemetryRecord, ingest_batch};
use crate::geofence::{Zone, classify};

// Approximate CONUS bounding box
const LAT_RANGE: (f64, f64) = (24.0, 49.0);
const LON_RANGE: (f64, f64) = (-125.0, -66.0);

const KM_PER_DEGREE: f64 = 111.0;
const MAX_PLACEMENT_ATTEMPTS_PER_RECORD: usize = 10;

/// Generate `count` synthetic records against the given zone set. With
/// `force_unauthorized` every record is source-flagged unauthorized and
/// placed near a zone when one exists; otherwise records are kept clear of
/// all zones on a best-effort basis.
pub fn synthesize_batch(
    count: usize,
    force_unauthorized: bool,
    zones: &[Zone],
) -> Vec<TelemetryRecord> {
    let mut rng = rand::thread_rng();
    let mut raw_records = Vec::with_capacity(count);

    for index in 0..count {
        let raw = if force_unauthorized {
            synthesize_unauthorized(&mut rng, index, zones)
        } else {
            synthesize_authorized(&mut rng, index, zones)
        };
        raw_records.push(raw);
    }

    ingest_batch(&raw_records, zones)
}

fn synthesize_authorized(rng: &mut impl Rng, index: usize, zones: &[Zone]) -> RawTelemetry {
    let mut position = random_position(rng);
    for _ in 0..MAX_PLACEMENT_ATTEMPTS_PER_RECORD {
        if !classify(position.0, position.1, zones).unauthorized {
            break;
        }
        position = random_position(rng);
    }

    RawTelemetry {
        callsign: Some(format!("SIM-A-{}{:04}", index, rng.gen_range(0..10_000))),
        latitude: Some(position.0),
        longitude: Some(position.1),
        altitude: Some(rng.gen_range(300.0..5000.0)),
        velocity: Some(rng.gen_range(50.0..300.0)),
        unauthorized: Some(false),
        ..Default::default()
    }
}

fn synthesize_unauthorized(rng: &mut impl Rng, index: usize, zones: &[Zone]) -> RawTelemetry {
    let position = if zones.is_empty() {
        random_position(rng)
    } else {
        let zone = &zones[rng.gen_range(0..zones.len())];
        position_near_zone(rng, zone)
    };

    RawTelemetry {
        callsign: Some(format!("SIM-U-{}{:03}", index, rng.gen_range(0..1_000))),
        latitude: Some(position.0),
        longitude: Some(position.1),
        altitude: Some(rng.gen_range(50.0..1500.0)),
        velocity: Some(rng.gen_range(30.0..150.0)),
        unauthorized: Some(true),
        ..Default::default()
    }
}

fn random_position(rng: &mut impl Rng) -> (f64, f64) {
    (
        rng.gen_range(LAT_RANGE.0..LAT_RANGE.1),
        rng.gen_range(LON_RANGE.0..LON_RANGE.1),
    )
}

/// A point inside the zone circle, offset from the center by a fraction of
/// the radius in a random direction.
fn position_near_zone(rng: &mut impl Rng, zone: &Zone) -> (f64, f64) {
    let radius_factor: f64 = rng.gen_range(0.2..0.9);
    let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let offset_deg = zone.radius_km * radius_factor / KM_PER_DEGREE;

    let latitude = zone.latitude + offset_deg * angle.cos();
    let longitude = zone.longitude + offset_deg * angle.sin() / zone.latitude.to_radians().cos();
    (latitude, longitude)
}
