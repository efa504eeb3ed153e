//! Batched unauthorized-flight alerts with a per-record cooldown.
//!
//! Each ingestion cycle yields at most one alert per record id; a record
//! that stays inside a restricted zone does not re-alert until the cooldown
//! has elapsed. Expired entries are pruned on every collection so the cache
//! cannot grow past the set of recently-alerting ids.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

use crate::ingest::TelemetryRecord;

pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(300);

#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zone_name: String,
}

pub struct AlertBatcher {
    cooldown: Duration,
    recent: HashMap<String, Instant>,
}

impl Default for AlertBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_COOLDOWN)
    }
}

impl AlertBatcher {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            recent: HashMap::new(),
        }
    }

    /// Collect one batch of alerts for the unauthorized records of the given
    /// dataset that are off cooldown.
    pub fn collect(&mut self, dataset: &[TelemetryRecord]) -> Vec<Alert> {
        self.collect_at(dataset, Instant::now())
    }

    fn collect_at(&mut self, dataset: &[TelemetryRecord], now: Instant) -> Vec<Alert> {
        let cooldown = self.cooldown;
        let before = self.recent.len();
        self.recent
            .retain(|_, alerted_at| now.duration_since(*alerted_at) <= cooldown);
        if self.recent.len() < before {
            debug!(
                "Pruned {} expired alert cooldown entries",
                before - self.recent.len()
            );
        }

        let mut alerts = Vec::new();
        for record in dataset.iter().filter(|r| r.unauthorized) {
            if self.recent.contains_key(&record.id) {
                continue;
            }
            self.recent.insert(record.id.clone(), now);
            alerts.push(Alert {
                id: record.id.clone(),
                latitude: record.latitude,
                longitude: record.longitude,
                zone_name: record
                    .zone_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
            });
        }
        alerts
    }
}
