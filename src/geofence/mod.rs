//! Restricted-zone geofencing.
//!
//! A zone is a named circle on the globe. Classification walks the active
//! zone set in order and reports the first zone whose great-circle distance
//! to the point is within the zone radius. First match wins; there is no
//! distance-based tie-break.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ingest::normalizer::lenient_f64;

/// Earth mean radius in kilometers, used by the haversine distance.
const EARTH_RADIUS_KM: f64 = 6371.0;

const MILITARY_KEYWORDS: [&str; 4] = ["base", "fort", "military", "complex"];
const GOVERNMENT_KEYWORDS: [&str; 4] = ["white house", "pentagon", "government", "national lab"];

/// A zone object as delivered by the zone source. Numeric fields tolerate
/// null/missing/non-numeric values so that one malformed zone cannot fail
/// the whole fetch; such zones are dropped by [`active_zones`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawZone {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub radius: Option<f64>,
}

/// A validated, immutable restricted zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub category: ZoneCategory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneCategory {
    Airport,
    Military,
    Government,
    Other,
}

/// Derive the presentation category from the zone name. Case-insensitive
/// substring rules evaluated in fixed priority order; first rule wins.
pub fn categorize(name: &str) -> ZoneCategory {
    let name = name.to_lowercase();
    if name.contains("airport") {
        ZoneCategory::Airport
    } else if MILITARY_KEYWORDS.iter().any(|k| name.contains(k)) {
        ZoneCategory::Military
    } else if GOVERNMENT_KEYWORDS.iter().any(|k| name.contains(k)) {
        ZoneCategory::Government
    } else {
        ZoneCategory::Other
    }
}

/// Build the active zone set from raw wire objects. A zone with a missing or
/// non-numeric latitude/longitude/radius, a non-finite value, or a
/// non-positive radius is excluded entirely, with a warning.
pub fn active_zones(raw_zones: Vec<RawZone>) -> Vec<Zone> {
    let mut zones = Vec::with_capacity(raw_zones.len());
    for raw in raw_zones {
        let (Some(latitude), Some(longitude), Some(radius)) =
            (raw.latitude, raw.longitude, raw.radius)
        else {
            warn!(
                "Skipping zone '{}' with missing or non-numeric coordinates/radius",
                raw.name
            );
            continue;
        };
        if !latitude.is_finite() || !longitude.is_finite() || !radius.is_finite() || radius <= 0.0 {
            warn!("Skipping zone '{}' with invalid geometry", raw.name);
            continue;
        }
        let category = categorize(&raw.name);
        zones.push(Zone {
            name: raw.name,
            latitude,
            longitude,
            radius_km: radius,
            category,
        });
    }
    zones
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// The outcome of checking one point against the zone set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification {
    pub unauthorized: bool,
    pub zone_name: Option<String>,
}

/// Classify a point against the zone set. Returns the first matching zone in
/// iteration order, or an authorized classification when no zone contains
/// the point.
pub fn classify(latitude: f64, longitude: f64, zones: &[Zone]) -> Classification {
    for zone in zones {
        let distance = haversine_km(latitude, longitude, zone.latitude, zone.longitude);
        if distance <= zone.radius_km {
            return Classification {
                unauthorized: true,
                zone_name: Some(zone.name.clone()),
            };
        }
    }
    Classification::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn zone(name: &str, latitude: f64, longitude: f64, radius_km: f64) -> Zone {
        Zone {
            name: name.to_string(),
            latitude,
            longitude,
            radius_km,
            category: categorize(name),
        }
    }

    #[test]
    fn test_point_inside_zone_is_unauthorized() {
        let zones = vec![zone("Capital Airport", 40.0, -75.0, 10.0)];

        // ~1.1km north of the zone center
        let classification = classify(40.01, -75.0, &zones);
        assert!(classification.unauthorized);
        assert_eq!(classification.zone_name.as_deref(), Some("Capital Airport"));
        assert_eq!(zones[0].category, ZoneCategory::Airport);
    }

    #[test]
    fn test_point_outside_all_zones_is_authorized() {
        let zones = vec![
            zone("Capital Airport", 40.0, -75.0, 10.0),
            zone("Fort North", 45.0, -90.0, 10.0),
        ];

        let classification = classify(10.0, 10.0, &zones);
        assert!(!classification.unauthorized);
        assert_eq!(classification.zone_name, None);
    }

    #[test]
    fn test_first_matching_zone_wins() {
        // Both circles contain the point; the second is much closer but the
        // policy is first-match, not nearest-match.
        let zones = vec![
            zone("Wide Zone", 40.0, -75.0, 200.0),
            zone("Near Zone", 40.01, -75.0, 5.0),
        ];

        let classification = classify(40.01, -75.0, &zones);
        assert_eq!(classification.zone_name.as_deref(), Some("Wide Zone"));
    }

    #[test]
    fn test_boundary_distance_matches() {
        // A point exactly on the circle (distance == radius) is inside.
        let zones = vec![zone("Edge Zone", 0.0, 0.0, haversine_km(0.0, 0.0, 0.0, 0.5))];
        assert!(classify(0.0, 0.5, &zones).unauthorized);
    }

    #[test]
    fn test_haversine_known_distance() {
        // JFK to LAX is roughly 3,974km
        let distance = haversine_km(40.6413, -73.7781, 33.9416, -118.4085);
        assert!((distance - 3974.0).abs() < 15.0, "got {distance}");
    }

    #[test]
    fn test_categorize_priority_order() {
        assert_eq!(categorize("Denver International Airport"), ZoneCategory::Airport);
        // "airport" beats the military keywords even when both appear
        assert_eq!(categorize("Airport Base"), ZoneCategory::Airport);
        assert_eq!(categorize("Fort Liberty"), ZoneCategory::Military);
        assert_eq!(categorize("Cheyenne Mountain Complex"), ZoneCategory::Military);
        assert_eq!(categorize("White House"), ZoneCategory::Government);
        assert_eq!(categorize("Los Alamos National Lab"), ZoneCategory::Government);
        assert_eq!(categorize("Downtown Heliport"), ZoneCategory::Other);
        assert_eq!(categorize("PENTAGON"), ZoneCategory::Government);
    }

    #[test]
    fn test_active_zones_skips_malformed_entries() {
        let raw = vec![
            RawZone {
                name: "Good Zone".to_string(),
                latitude: Some(40.0),
                longitude: Some(-75.0),
                radius: Some(10.0),
            },
            RawZone {
                name: "No Radius".to_string(),
                latitude: Some(40.0),
                longitude: Some(-75.0),
                radius: None,
            },
            RawZone {
                name: "Negative Radius".to_string(),
                latitude: Some(40.0),
                longitude: Some(-75.0),
                radius: Some(-3.0),
            },
            RawZone {
                name: "NaN Latitude".to_string(),
                latitude: Some(f64::NAN),
                longitude: Some(-75.0),
                radius: Some(10.0),
            },
        ];

        let zones = active_zones(raw);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "Good Zone");
    }

    #[test]
    fn test_raw_zone_tolerates_non_numeric_fields() {
        let raw: RawZone = serde_json::from_str(
            r#"{"name": "Broken", "latitude": "forty", "longitude": -75.0, "radius": 10}"#,
        )
        .unwrap();
        assert_eq!(raw.latitude, None);
        assert_eq!(raw.longitude, Some(-75.0));
        assert_eq!(raw.radius, Some(10.0));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            // classify reports unauthorized iff some zone contains the point,
            // and names the first such zone in set order.
            #[test]
            fn classification_agrees_with_containment(
                lat in -80.0f64..80.0,
                lon in -179.0f64..179.0,
                zone_lat in -80.0f64..80.0,
                zone_lon in -179.0f64..179.0,
                radius in 1.0f64..2000.0,
            ) {
                let zones = vec![
                    zone("Alpha", zone_lat, zone_lon, radius),
                    zone("Beta", zone_lat, zone_lon, radius),
                ];
                let contained = haversine_km(lat, lon, zone_lat, zone_lon) <= radius;
                let classification = classify(lat, lon, &zones);

                prop_assert_eq!(classification.unauthorized, contained);
                if contained {
                    prop_assert_eq!(classification.zone_name.as_deref(), Some("Alpha"));
                } else {
                    prop_assert_eq!(classification.zone_name, None);
                }
            }

            #[test]
            fn empty_zone_set_never_flags(lat in -90.0f64..90.0, lon in -180.0f64..180.0) {
                let classification = classify(lat, lon, &[]);
                prop_assert!(!classification.unauthorized);
                prop_assert_eq!(classification.zone_name, None);
            }
        }
    }
}
