use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::mpsc::Receiver,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SkyfenceError, ingest::DatasetSnapshot, ingest::TelemetryRecord};

/// One recorded telemetry record, tagged with the publication timestamp of
/// the dataset it came from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordedSample {
    pub observed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: TelemetryRecord,
}

/// Append every record of every published dataset to a JSON-lines file.
/// Runs until the sending side of the channel is dropped.
pub fn record_datasets(
    file: &PathBuf,
    dataset_receiver: Receiver<DatasetSnapshot>,
) -> Result<(), SkyfenceError> {
    let record_file = File::create(file).map_err(|e| SkyfenceError::RecorderError { source: e })?;
    let mut record_writer = BufWriter::new(record_file);
    for snapshot in &dataset_receiver {
        for record in snapshot.records.iter() {
            let sample = RecordedSample {
                observed_at: snapshot.updated_at,
                record: record.clone(),
            };
            let _ = writeln!(record_writer, "{}", serde_json::to_string(&sample).unwrap())
                .map_err(|e| {
                    println!("Error while writing telemetry record to output file: {}", e);
                });
        }
    }
    record_writer
        .flush()
        .map_err(|e| SkyfenceError::RecorderError { source: e })
}
