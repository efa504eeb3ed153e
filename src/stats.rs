//! Aggregate statistics over the canonical dataset.

use serde::{Deserialize, Serialize};

use crate::ingest::TelemetryRecord;

const HIGH_THREAT_THRESHOLD: usize = 5;

/// Discrete threat level, a total function of the unauthorized count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatTier {
    Low,
    Medium,
    High,
}

impl ThreatTier {
    pub fn from_unauthorized_count(count: usize) -> Self {
        if count >= HIGH_THREAT_THRESHOLD {
            ThreatTier::High
        } else if count >= 1 {
            ThreatTier::Medium
        } else {
            ThreatTier::Low
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub unauthorized_count: usize,
    /// Mean ground speed in km/h, rounded to one decimal. 0 when empty.
    pub avg_velocity_kmh: f64,
    /// Mean altitude in meters, rounded to a whole number. 0 when empty.
    pub avg_altitude_m: f64,
    /// By definition the unauthorized count, not an independent recount.
    pub violations: usize,
    pub threat_tier: ThreatTier,
}

pub fn summarize(dataset: &[TelemetryRecord]) -> Stats {
    let total = dataset.len();
    let unauthorized_count = dataset.iter().filter(|r| r.unauthorized).count();

    let (avg_velocity_kmh, avg_altitude_m) = if total == 0 {
        (0.0, 0.0)
    } else {
        let velocity_sum: f64 = dataset.iter().map(|r| r.velocity_kmh).sum();
        let altitude_sum: f64 = dataset.iter().map(|r| r.altitude_m).sum();
        (
            (velocity_sum / total as f64 * 10.0).round() / 10.0,
            (altitude_sum / total as f64).round(),
        )
    };

    Stats {
        total,
        unauthorized_count,
        avg_velocity_kmh,
        avg_altitude_m,
        violations: unauthorized_count,
        threat_tier: ThreatTier::from_unauthorized_count(unauthorized_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(unauthorized: bool, velocity_kmh: f64, altitude_m: f64) -> TelemetryRecord {
        TelemetryRecord {
            id: "r".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            altitude_m,
            velocity_kmh,
            unauthorized,
            zone_name: unauthorized.then(|| "Zone".to_string()),
        }
    }

    #[test]
    fn test_empty_dataset_summary() {
        let stats = summarize(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.unauthorized_count, 0);
        assert_eq!(stats.avg_velocity_kmh, 0.0);
        assert_eq!(stats.avg_altitude_m, 0.0);
        assert_eq!(stats.violations, 0);
        assert_eq!(stats.threat_tier, ThreatTier::Low);
    }

    #[test]
    fn test_averages_and_rounding() {
        let dataset = vec![
            record(false, 100.0, 1000.4),
            record(true, 150.55, 2000.4),
            record(false, 120.0, 999.9),
        ];
        let stats = summarize(&dataset);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unauthorized_count, 1);
        assert_eq!(stats.violations, 1);
        // (100 + 150.55 + 120) / 3 = 123.516..., one decimal
        assert_eq!(stats.avg_velocity_kmh, 123.5);
        // (1000.4 + 2000.4 + 999.9) / 3 = 1333.566..., whole meters
        assert_eq!(stats.avg_altitude_m, 1334.0);
    }

    #[test]
    fn test_threat_tier_boundaries() {
        assert_eq!(ThreatTier::from_unauthorized_count(0), ThreatTier::Low);
        assert_eq!(ThreatTier::from_unauthorized_count(1), ThreatTier::Medium);
        assert_eq!(ThreatTier::from_unauthorized_count(4), ThreatTier::Medium);
        assert_eq!(ThreatTier::from_unauthorized_count(5), ThreatTier::High);
        assert_eq!(ThreatTier::from_unauthorized_count(100), ThreatTier::High);
    }

    #[test]
    fn test_violations_track_unauthorized_count() {
        let dataset = vec![
            record(true, 0.0, 0.0),
            record(true, 0.0, 0.0),
            record(false, 0.0, 0.0),
        ];
        let stats = summarize(&dataset);
        assert_eq!(stats.violations, stats.unauthorized_count);
        assert_eq!(stats.violations, 2);
    }
}
