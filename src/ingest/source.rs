//! Telemetry source collaborators.
//!
//! The pipeline never talks to the network directly; it is handed a
//! [`TelemetrySource`] that knows how to fetch the zone set, fetch a
//! telemetry snapshot, and open the streaming subscription. The production
//! implementation speaks HTTP + websocket; [`ScriptedSource`] replays
//! pre-built responses for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use super::RawTelemetry;
use crate::SkyfenceError;
use crate::geofence::RawZone;

/// Close code reported when the peer closed without a status code.
pub const NO_STATUS_CLOSE_CODE: u16 = 1005;
/// Close code reported when the transport ended without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// One event observed on an open telemetry stream.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// A discrete text message, expected to carry a telemetry payload.
    Message(String),
    /// A stream-level error; the connection is no longer usable.
    TransportError(String),
    /// The stream closed with the given close code.
    Closed { code: u16 },
}

#[async_trait]
pub trait TelemetryStream: Send {
    /// Wait for the next stream event. After a `TransportError` or `Closed`
    /// event the stream must not be polled again.
    async fn next_event(&mut self) -> StreamEvent;

    /// Force-close the underlying connection. Safe to call at any point;
    /// no further events are produced afterwards.
    async fn close(&mut self);
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_zones(&self) -> Result<Vec<RawZone>, SkyfenceError>;
    async fn fetch_snapshot(&self) -> Result<Vec<RawTelemetry>, SkyfenceError>;
    async fn subscribe(&self) -> Result<Box<dyn TelemetryStream>, SkyfenceError>;
}

#[derive(Deserialize)]
struct ZonesEnvelope {
    #[serde(default)]
    restricted_zones: Vec<RawZone>,
}

#[derive(Deserialize)]
struct SnapshotEnvelope {
    #[serde(default)]
    drones: Vec<RawTelemetry>,
}

/// Production source: REST fetches for zones and the initial snapshot, plus
/// a websocket subscription for the live feed.
pub struct HttpTelemetrySource {
    base_url: String,
    stream_url: String,
    client: reqwest::Client,
}

impl HttpTelemetrySource {
    pub fn new(base_url: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stream_url: stream_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    async fn fetch_zones(&self) -> Result<Vec<RawZone>, SkyfenceError> {
        let envelope: ZonesEnvelope = self
            .client
            .get(format!("{}/restricted-zones", self.base_url))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SkyfenceError::ZoneFetchError { source: e })?
            .json()
            .await
            .map_err(|e| SkyfenceError::ZoneFetchError { source: e })?;
        Ok(envelope.restricted_zones)
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RawTelemetry>, SkyfenceError> {
        let envelope: SnapshotEnvelope = self
            .client
            .get(format!("{}/fetch-drones-live", self.base_url))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SkyfenceError::SnapshotFetchError { source: e })?
            .json()
            .await
            .map_err(|e| SkyfenceError::SnapshotFetchError { source: e })?;
        Ok(envelope.drones)
    }

    async fn subscribe(&self) -> Result<Box<dyn TelemetryStream>, SkyfenceError> {
        let (stream, _response) = connect_async(self.stream_url.as_str()).await.map_err(|e| {
            SkyfenceError::StreamConnectError {
                description: e.to_string(),
            }
        })?;
        Ok(Box::new(WsTelemetryStream { inner: stream }))
    }
}

struct WsTelemetryStream {
    inner: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
}

#[async_trait]
impl TelemetryStream for WsTelemetryStream {
    async fn next_event(&mut self) -> StreamEvent {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return StreamEvent::Message(text.to_string()),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame
                        .map(|f| u16::from(f.code))
                        .unwrap_or(NO_STATUS_CLOSE_CODE);
                    return StreamEvent::Closed { code };
                }
                // ping/pong/binary frames carry no telemetry
                Some(Ok(_)) => continue,
                Some(Err(e)) => return StreamEvent::TransportError(e.to_string()),
                None => {
                    return StreamEvent::Closed {
                        code: ABNORMAL_CLOSE_CODE,
                    };
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}

/// A source that replays scripted responses, in the spirit of a mock
/// telemetry producer: each call to `subscribe` serves the next scripted
/// connection, and an exhausted connection stays idle until closed.
pub struct ScriptedSource {
    zones: Option<Vec<RawZone>>,
    snapshot: Option<Vec<RawTelemetry>>,
    scripts: Mutex<VecDeque<Vec<StreamEvent>>>,
    closed_streams: Arc<AtomicUsize>,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self {
            zones: None,
            snapshot: None,
            scripts: Mutex::new(VecDeque::new()),
            closed_streams: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ScriptedSource {
    /// A source whose zone and snapshot fetches both fail and that has no
    /// scripted connections.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_zones(mut self, zones: Vec<RawZone>) -> Self {
        self.zones = Some(zones);
        self
    }

    pub fn with_snapshot(mut self, snapshot: Vec<RawTelemetry>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Queue the event script for the next streaming connection.
    pub fn with_connection(self, events: Vec<StreamEvent>) -> Self {
        self.scripts
            .lock()
            .expect("scripted source lock poisoned")
            .push_back(events);
        self
    }

    /// Number of streams that were force-closed by the pipeline.
    pub fn closed_stream_count(&self) -> usize {
        self.closed_streams.load(Ordering::SeqCst)
    }

    /// Handle to the force-close counter, for observing closes after the
    /// source has been handed to the pipeline.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closed_streams)
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn fetch_zones(&self) -> Result<Vec<RawZone>, SkyfenceError> {
        self.zones
            .clone()
            .ok_or_else(|| SkyfenceError::TelemetrySourceError {
                description: "scripted zone fetch failure".to_string(),
            })
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RawTelemetry>, SkyfenceError> {
        self.snapshot
            .clone()
            .ok_or_else(|| SkyfenceError::TelemetrySourceError {
                description: "scripted snapshot fetch failure".to_string(),
            })
    }

    async fn subscribe(&self) -> Result<Box<dyn TelemetryStream>, SkyfenceError> {
        let script = self
            .scripts
            .lock()
            .expect("scripted source lock poisoned")
            .pop_front()
            .ok_or_else(|| SkyfenceError::StreamConnectError {
                description: "no scripted connection left".to_string(),
            })?;
        Ok(Box::new(ScriptedStream {
            events: script.into(),
            closed_streams: Arc::clone(&self.closed_streams),
        }))
    }
}

struct ScriptedStream {
    events: VecDeque<StreamEvent>,
    closed_streams: Arc<AtomicUsize>,
}

#[async_trait]
impl TelemetryStream for ScriptedStream {
    async fn next_event(&mut self) -> StreamEvent {
        match self.events.pop_front() {
            Some(event) => event,
            // Idle connection: nothing further arrives until teardown.
            None => futures::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closed_streams.fetch_add(1, Ordering::SeqCst);
    }
}
