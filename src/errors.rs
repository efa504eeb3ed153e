// Error types for skyfence

use crate::ingest::IngestUpdate;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum SkyfenceError {
    // Errors talking to the zone/telemetry service
    #[snafu(display("Error fetching restricted zones"))]
    ZoneFetchError { source: reqwest::Error },
    #[snafu(display("Error fetching telemetry snapshot"))]
    SnapshotFetchError { source: reqwest::Error },
    #[snafu(display("Could not open telemetry stream: {description}"))]
    StreamConnectError { description: String },
    #[snafu(display("Telemetry source error: {description}"))]
    TelemetrySourceError { description: String },

    // Errors while publishing dataset updates to consumers
    #[snafu(display("Error broadcasting ingest update"))]
    UpdateBroadcastError {
        source: Box<SendError<IngestUpdate>>,
    },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Errors for the dataset recorder
    #[snafu(display("Error writing recorded telemetry file"))]
    RecorderError { source: io::Error },
}

impl From<SendError<IngestUpdate>> for SkyfenceError {
    fn from(value: SendError<IngestUpdate>) -> Self {
        SkyfenceError::UpdateBroadcastError {
            source: Box::new(value),
        }
    }
}
