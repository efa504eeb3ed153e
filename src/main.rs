use std::{path::PathBuf, sync::mpsc, thread, time::Duration};

use clap::{Parser, Subcommand};
use log::{error, info};
use tokio::sync::watch;

use skyfence::config::AppConfig;
use skyfence::ingest::pipeline::{IngestPipeline, PipelineConfig};
use skyfence::ingest::source::{HttpTelemetrySource, TelemetrySource};
use skyfence::{
    DatasetSnapshot, IngestUpdate, SkyfenceError, classify, geofence, recorder,
    select_for_display, summarize, validate,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the live telemetry feed and log the derived views
    Watch {
        /// Base URL of the telemetry service
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Maximum number of records selected for display
        #[arg(short, long)]
        capacity: Option<usize>,

        /// Record every ingested dataset to a JSON-lines file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Classify a single coordinate against the restricted zones
    Check {
        #[arg(long)]
        latitude: f64,

        #[arg(long)]
        longitude: f64,

        #[arg(short, long)]
        endpoint: Option<String>,
    },
}

/// Derive the websocket stream URL from a REST base URL.
fn stream_url_for(base_url: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    format!("{}/ws", ws_base.trim_end_matches('/'))
}

fn watch_feed(
    endpoint: Option<String>,
    capacity: Option<usize>,
    output: Option<PathBuf>,
) -> Result<(), SkyfenceError> {
    let mut app_config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(endpoint) = endpoint {
        app_config.stream_url = stream_url_for(&endpoint);
        app_config.base_url = endpoint;
    }
    if let Some(capacity) = capacity {
        app_config.display_capacity = capacity;
    }

    let (update_tx, update_rx) = mpsc::channel::<IngestUpdate>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        println!("Exiting...");
        let _ = shutdown_tx.send(true);
    })
    .expect("Could not set Ctrl-C handler");

    // if we need to record datasets we create a second channel and forward
    // every published snapshot to the recorder thread
    let mut recorder_handle = None;
    let recorder_tx = output.map(|output_file| {
        let (recorder_tx, recorder_rx) = mpsc::channel::<DatasetSnapshot>();
        recorder_handle = Some(thread::spawn(move || {
            recorder::record_datasets(&output_file, recorder_rx)
        }));
        recorder_tx
    });

    let pipeline_config = PipelineConfig {
        fallback_authorized: app_config.fallback_authorized,
        fallback_unauthorized: app_config.fallback_unauthorized,
        alert_cooldown: Duration::from_secs(app_config.alert_cooldown_s),
        ..Default::default()
    };
    let source =
        HttpTelemetrySource::new(app_config.base_url.clone(), app_config.stream_url.clone());
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Could not build tokio runtime for the ingestion pipeline");
        let pipeline = IngestPipeline::new(source, pipeline_config, update_tx, shutdown_rx);
        if let Err(e) = runtime.block_on(pipeline.run()) {
            error!("Ingestion pipeline stopped with an error: {e}");
        }
    });

    for update in &update_rx {
        match update {
            IngestUpdate::Connection(state) => info!("Connection: {state:?}"),
            IngestUpdate::Dataset(snapshot) => {
                let stats = summarize(&snapshot.records);
                let report = validate(&snapshot.records);
                let subset = select_for_display(&snapshot.records, app_config.display_capacity);
                info!(
                    "{} | {} tracked, {} unauthorized, threat {:?}, avg {:.1} km/h at {:.0} m, displaying {}, validation {}",
                    snapshot.updated_at.format("%H:%M:%S"),
                    stats.total,
                    stats.unauthorized_count,
                    stats.threat_tier,
                    stats.avg_velocity_kmh,
                    stats.avg_altitude_m,
                    subset.len(),
                    if report.passed { "ok" } else { "FAILED" },
                );
                if let Some(ref recorder_tx) = recorder_tx {
                    let _ = recorder_tx.send(snapshot);
                }
            }
        }
    }

    drop(recorder_tx);
    if let Some(handle) = recorder_handle {
        if let Err(e) = handle.join().expect("Recorder thread panicked") {
            error!("Recorder stopped with an error: {e}");
        }
    }
    Ok(())
}

fn check_coordinate(
    latitude: f64,
    longitude: f64,
    endpoint: Option<String>,
) -> Result<(), SkyfenceError> {
    let app_config = AppConfig::from_local_file().unwrap_or_default();
    let base_url = endpoint.unwrap_or(app_config.base_url);
    let source = HttpTelemetrySource::new(base_url.clone(), stream_url_for(&base_url));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Could not build tokio runtime");
    let zones = geofence::active_zones(runtime.block_on(source.fetch_zones())?);
    let classification = classify(latitude, longitude, &zones);

    match classification.zone_name {
        Some(zone_name) => {
            println!("({latitude}, {longitude}) is inside restricted zone '{zone_name}'")
        }
        None => println!(
            "({latitude}, {longitude}) is clear of all {} restricted zones",
            zones.len()
        ),
    }
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    match cli.command {
        Commands::Watch {
            endpoint,
            capacity,
            output,
        } => watch_feed(endpoint, capacity, output).expect("Error while watching telemetry feed"),
        Commands::Check {
            latitude,
            longitude,
            endpoint,
        } => check_coordinate(latitude, longitude, endpoint)
            .expect("Error while checking coordinate"),
    };
}
