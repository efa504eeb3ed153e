//! The ingestion pipeline owns the canonical dataset and the streaming
//! connection lifecycle.
//!
//! Startup is strictly ordered: fetch zones (failure degrades to an empty
//! zone set), fetch the telemetry snapshot (failure degrades to a synthetic
//! dataset), publish, then maintain the streaming subscription. Every source
//! failure is handled here; consumers only ever observe connection-state
//! transitions and wholesale dataset replacements on the update channel.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use chrono::Utc;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::sleep;

use super::source::{StreamEvent, TelemetrySource, TelemetryStream};
use super::{
    ConnectionState, DatasetSnapshot, IngestUpdate, RawTelemetry, TelemetryRecord, ingest_batch,
};
use crate::SkyfenceError;
use crate::alerts::AlertBatcher;
use crate::geofence::{Zone, active_zones};
use crate::ingest::fallback::synthesize_batch;
use crate::validation::validate;

/// Close codes after which no reconnect is scheduled: 1000 (normal closure)
/// and 1005 (closed without a status code).
const INTENTIONAL_CLOSE_CODES: [u16; 2] = [1000, 1005];

const ERROR_RETRY_DELAY: Duration = Duration::from_secs(10);
const CLOSE_RETRY_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_FALLBACK_AUTHORIZED: usize = 30;
const DEFAULT_FALLBACK_UNAUTHORIZED: usize = 5;

pub fn is_intentional_close(code: u16) -> bool {
    INTENTIONAL_CLOSE_CODES.contains(&code)
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Synthetic records generated when the snapshot fetch fails.
    pub fallback_authorized: usize,
    /// Synthetic records forced unauthorized in the fallback dataset.
    pub fallback_unauthorized: usize,
    /// Reconnect delay after a transport error.
    pub error_retry_delay: Duration,
    /// Reconnect delay after an unexpected closure.
    pub close_retry_delay: Duration,
    /// Minimum time between repeated alerts for the same record id.
    pub alert_cooldown: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_authorized: DEFAULT_FALLBACK_AUTHORIZED,
            fallback_unauthorized: DEFAULT_FALLBACK_UNAUTHORIZED,
            error_retry_delay: ERROR_RETRY_DELAY,
            close_retry_delay: CLOSE_RETRY_DELAY,
            alert_cooldown: crate::alerts::DEFAULT_ALERT_COOLDOWN,
        }
    }
}

/// Expected shape of one stream message. A payload that does not carry a
/// `drones` array is malformed and gets dropped.
#[derive(Deserialize)]
struct StreamPayload {
    drones: Vec<RawTelemetry>,
}

enum StreamOutcome {
    Retry(Duration),
    IntentionalClose,
    Shutdown,
}

pub struct IngestPipeline<S: TelemetrySource> {
    source: S,
    config: PipelineConfig,
    zones: Vec<Zone>,
    alerts: AlertBatcher,
    updates: Sender<IngestUpdate>,
    shutdown: watch::Receiver<bool>,
}

impl<S: TelemetrySource> IngestPipeline<S> {
    pub fn new(
        source: S,
        config: PipelineConfig,
        updates: Sender<IngestUpdate>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let alerts = AlertBatcher::new(config.alert_cooldown);
        Self {
            source,
            config,
            zones: Vec::new(),
            alerts,
            updates,
            shutdown,
        }
    }

    /// Run the pipeline to completion: startup sequence, then the streaming
    /// subscription until an intentional closure or an external shutdown.
    ///
    /// # Errors
    ///
    /// Only fails when the update channel receiver is gone; every source
    /// failure is recovered internally.
    pub async fn run(mut self) -> Result<(), SkyfenceError> {
        match self.source.fetch_zones().await {
            Ok(raw_zones) => {
                self.zones = active_zones(raw_zones);
                info!("Loaded {} restricted zone(s)", self.zones.len());
            }
            Err(e) => {
                warn!("Zone fetch failed, continuing with an empty zone set: {e}");
            }
        }

        let records = match self.source.fetch_snapshot().await {
            Ok(raw_records) => ingest_batch(&raw_records, &self.zones),
            Err(e) => {
                warn!("Snapshot fetch failed, fabricating a synthetic dataset: {e}");
                let mut records =
                    synthesize_batch(self.config.fallback_authorized, false, &self.zones);
                records.extend(synthesize_batch(
                    self.config.fallback_unauthorized,
                    true,
                    &self.zones,
                ));
                records
            }
        };
        self.publish_dataset(records)?;

        loop {
            if *self.shutdown.borrow() {
                return self.finish();
            }

            self.set_state(ConnectionState::Connecting)?;
            let outcome = match self.source.subscribe().await {
                Ok(stream) => self.pump_stream(stream).await?,
                Err(e) => {
                    warn!("Stream subscription failed: {e}");
                    StreamOutcome::Retry(self.config.error_retry_delay)
                }
            };

            let delay = match outcome {
                StreamOutcome::Retry(delay) => delay,
                StreamOutcome::IntentionalClose | StreamOutcome::Shutdown => {
                    return self.finish();
                }
            };

            self.set_state(ConnectionState::Reconnecting)?;
            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                // Shutdown disarms the pending reconnect
                _ = shutdown_signalled(&mut shutdown) => return self.finish(),
                _ = sleep(delay) => {}
            }
        }
    }

    /// Drive one open stream until it fails, closes, or shutdown is
    /// requested. The connection is force-closed before any reconnect is
    /// scheduled and before teardown, so its own closure events can never
    /// feed back into the state machine.
    async fn pump_stream(
        &mut self,
        mut stream: Box<dyn TelemetryStream>,
    ) -> Result<StreamOutcome, SkyfenceError> {
        self.set_state(ConnectionState::Open)?;
        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown) => {
                    stream.close().await;
                    return Ok(StreamOutcome::Shutdown);
                }
                event = stream.next_event() => match event {
                    StreamEvent::Message(text) => self.handle_message(&text)?,
                    StreamEvent::TransportError(description) => {
                        warn!("Telemetry stream error: {description}");
                        stream.close().await;
                        return Ok(StreamOutcome::Retry(self.config.error_retry_delay));
                    }
                    StreamEvent::Closed { code } if is_intentional_close(code) => {
                        info!("Telemetry stream closed normally (code {code})");
                        return Ok(StreamOutcome::IntentionalClose);
                    }
                    StreamEvent::Closed { code } => {
                        warn!("Telemetry stream closed unexpectedly (code {code})");
                        stream.close().await;
                        return Ok(StreamOutcome::Retry(self.config.close_retry_delay));
                    }
                }
            }
        }
    }

    /// Parse one stream message and replace the canonical dataset. Malformed
    /// payloads are dropped with a warning and never mutate the dataset.
    fn handle_message(&mut self, text: &str) -> Result<(), SkyfenceError> {
        let payload: StreamPayload = match serde_json::from_str(text) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping malformed stream message: {e}");
                return Ok(());
            }
        };

        let records = ingest_batch(&payload.drones, &self.zones);
        self.publish_dataset(records)
    }

    fn publish_dataset(&mut self, records: Vec<TelemetryRecord>) -> Result<(), SkyfenceError> {
        let report = validate(&records);
        if !report.passed {
            warn!(
                "Dataset failed consistency check: total={} authorized={} unauthorized={}",
                report.total, report.authorized, report.unauthorized
            );
        }

        let alerts = self.alerts.collect(&records);
        if !alerts.is_empty() {
            warn!(
                "{} new unauthorized flight(s): {}",
                alerts.len(),
                alerts
                    .iter()
                    .map(|a| format!("{} in {}", a.id, a.zone_name))
                    .join(", ")
            );
        }

        debug!(
            "Publishing dataset: {} record(s), {} unauthorized",
            report.total, report.unauthorized
        );
        self.updates.send(IngestUpdate::Dataset(DatasetSnapshot {
            records: Arc::new(records),
            updated_at: Utc::now(),
        }))?;
        Ok(())
    }

    fn set_state(&mut self, state: ConnectionState) -> Result<(), SkyfenceError> {
        debug!("Connection state: {state:?}");
        self.updates.send(IngestUpdate::Connection(state))?;
        Ok(())
    }

    fn finish(mut self) -> Result<(), SkyfenceError> {
        self.set_state(ConnectionState::Closed)?;
        info!("Ingestion pipeline stopped");
        Ok(())
    }
}

/// Resolves when shutdown is requested. A dropped sender counts as a
/// shutdown request, since the pipeline owner is gone.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|requested| *requested).await;
}
