use serde::{Deserialize, Serialize};

use crate::SkyfenceError;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = "skyfence";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_STREAM_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_DISPLAY_CAPACITY: usize = 100;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the zone/telemetry REST endpoints.
    pub base_url: String,
    /// Websocket URL of the telemetry stream.
    pub stream_url: String,
    /// Maximum number of records in the display subset.
    pub display_capacity: usize,
    /// Synthetic record counts used when the snapshot fetch fails.
    pub fallback_authorized: usize,
    pub fallback_unauthorized: usize,
    /// Seconds between repeated alerts for the same record id.
    pub alert_cooldown_s: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            display_capacity: DEFAULT_DISPLAY_CAPACITY,
            fallback_authorized: 30,
            fallback_unauthorized: 5,
            alert_cooldown_s: 300,
        }
    }
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let file = std::fs::File::open(config_path).expect("Could not open config file");
            Some(serde_json::from_reader(file).expect("Could not parse config file"))
        } else {
            None
        }
    }

    pub fn save(&self) -> Result<(), SkyfenceError> {
        let config_path = dirs::config_dir()
            .ok_or(SkyfenceError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            std::fs::create_dir_all(config_path.parent().unwrap())
                .map_err(|e| SkyfenceError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| SkyfenceError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| SkyfenceError::ConfigSerializeError { source: e })
    }
}
