//! Configuration for the dashboard agent.

use crate::core::metric::MetricKind;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interval between timer-triggered refreshes
    #[serde(with = "duration_serde")]
    pub refresh_interval: Duration,

    /// Path for the persisted history and transparency stats
    pub data_path: PathBuf,

    /// IANA timezone for day boundaries; the host zone when unset
    #[serde(default)]
    pub timezone: Option<String>,

    /// Which metrics are shown
    #[serde(default)]
    pub display: DisplaySettings,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hrv-dashboard");

        Self {
            refresh_interval: Duration::from_secs(3600),
            data_path: data_dir,
            timezone: None,
            display: DisplaySettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hrv-dashboard")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Parsed timezone, `None` when the host zone should be used.
    pub fn zone(&self) -> Result<Option<Tz>, ConfigError> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
            })
            .transpose()
    }

    /// Directory backing the key-value store.
    pub fn store_path(&self) -> PathBuf {
        self.data_path.join("store")
    }

    /// File holding cumulative transparency stats.
    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }
}

/// Per-metric visibility on the dashboard.
///
/// Hidden metrics are still read and historized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub show_hrv: bool,
    pub show_resting_hr: bool,
    pub show_sleep: bool,
    pub show_mindful: bool,
    pub show_steps: bool,
    pub show_energy: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_hrv: true,
            show_resting_hr: true,
            show_sleep: true,
            show_mindful: true,
            show_steps: true,
            show_energy: true,
        }
    }
}

impl DisplaySettings {
    pub fn is_visible(&self, kind: MetricKind) -> bool {
        *self.flag(kind)
    }

    pub fn set_visible(&mut self, kind: MetricKind, visible: bool) {
        *self.flag_mut(kind) = visible;
    }

    /// Metrics currently shown, in dashboard order.
    pub fn visible(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .into_iter()
            .filter(|k| self.is_visible(*k))
            .collect()
    }

    fn flag(&self, kind: MetricKind) -> &bool {
        match kind {
            MetricKind::Hrv => &self.show_hrv,
            MetricKind::RestingHeartRate => &self.show_resting_hr,
            MetricKind::Sleep => &self.show_sleep,
            MetricKind::MindfulMinutes => &self.show_mindful,
            MetricKind::Steps => &self.show_steps,
            MetricKind::ActiveEnergy => &self.show_energy,
        }
    }

    fn flag_mut(&mut self, kind: MetricKind) -> &mut bool {
        match kind {
            MetricKind::Hrv => &mut self.show_hrv,
            MetricKind::RestingHeartRate => &mut self.show_resting_hr,
            MetricKind::Sleep => &mut self.show_sleep,
            MetricKind::MindfulMinutes => &mut self.show_mindful,
            MetricKind::Steps => &mut self.show_steps,
            MetricKind::ActiveEnergy => &mut self.show_energy,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Unknown timezone '{0}'")]
    InvalidTimezone(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
