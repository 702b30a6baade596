use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::drivers::plot::GAP_THRESHOLD_MS;
use crate::drivers::{ChannelConfig, DashboardError, MAX_POINTS, NORMAL_BAND_PERCENT};
use crate::tables::{RECORD_ROWS, SCORE_LOG_ROWS};
/// Where records come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic wearable stream. A missing seed means "seed from the clock".
    Simulation {
        #[serde(default)]
        seed: Option<u64>,
    },
    /// JSON array of records replayed one per poll.
    Replay { path: PathBuf },
}
impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulation { seed: None }
    }
}
/// Dashboard settings, read from a JSON file. Every field is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Window size of every channel buffer.
    pub max_points: usize,
    pub poll_interval_ms: u64,
    /// Consecutive samples further apart than this are drawn as a gap.
    pub gap_threshold_ms: i64,
    /// Half-width of the "Normal" heart-rate band, as a fraction of the mean.
    pub normal_band_percent: f64,
    /// Records requested when going live.
    pub initial_history_points: usize,
    pub record_rows: usize,
    pub score_log_rows: usize,
    /// Session CSV logs are written here while connected; `None` disables logging.
    pub log_dir: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub source: SourceConfig,
    pub channels: Vec<ChannelConfig>,
}
impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            max_points: MAX_POINTS,
            poll_interval_ms: 5000,
            gap_threshold_ms: GAP_THRESHOLD_MS,
            normal_band_percent: NORMAL_BAND_PERCENT,
            initial_history_points: MAX_POINTS,
            record_rows: RECORD_ROWS,
            score_log_rows: SCORE_LOG_ROWS,
            log_dir: None,
            export_dir: PathBuf::from("exports"),
            source: SourceConfig::default(),
            channels: default_channels(),
        }
    }
}
impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
    pub fn from_json(text: &str) -> Result<Self, DashboardError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.max_points == 0 {
            return Err(DashboardError::Config("max_points must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(DashboardError::Config("poll_interval_ms must be positive".into()));
        }
        if self.gap_threshold_ms < 0 {
            return Err(DashboardError::Config("gap_threshold_ms must not be negative".into()));
        }
        if !(self.normal_band_percent > 0.0 && self.normal_band_percent < 1.0) {
            return Err(DashboardError::Config(format!(
                "normal_band_percent must be in (0, 1), got {}",
                self.normal_band_percent
            )));
        }
        if self.channels.is_empty() {
            return Err(DashboardError::Config("at least one channel is required".into()));
        }
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.key.trim().is_empty() {
                return Err(DashboardError::Config("channel keys must not be empty".into()));
            }
            if !seen.insert(channel.key.as_str()) {
                return Err(DashboardError::DuplicateChannel(channel.key.clone()));
            }
        }
        Ok(())
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn channel_keys(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.key.clone()).collect()
    }
}
/// The fourteen wearable channels, in display order. Heart rate carries statistics.
pub fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::new("hr", "Heart Rate (bpm)").with_stats().with_precision(1),
        ChannelConfig::new("ibi", "Inter-beat Interval (ms)").with_precision(0),
        ChannelConfig::new("spo2", "SpO2 (%)"),
        ChannelConfig::new("skinTemp", "Skin Temperature (°C)"),
        ChannelConfig::new("eda", "EDA (µS)").with_precision(4),
        ChannelConfig::new("ecg", "ECG (mV)").with_precision(4),
        ChannelConfig::new("bvp", "BVP").with_precision(4),
        ChannelConfig::new("ppgGreen", "PPG Green").with_precision(0),
        ChannelConfig::new("ppgRed", "PPG Red").with_precision(0),
        ChannelConfig::new("ppgIr", "PPG IR").with_precision(0),
        ChannelConfig::new("accX", "Accelerometer X (g)").with_precision(4),
        ChannelConfig::new("accY", "Accelerometer Y (g)").with_precision(4),
        ChannelConfig::new("accZ", "Accelerometer Z (g)").with_precision(4),
        ChannelConfig::new("respirationRate", "Respiration Rate (brpm)"),
    ]
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_are_valid() {
        let config = DashboardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_points, 100);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.gap_threshold_ms, 5000);
        assert_eq!(config.channels.len(), 14);
        assert_eq!(
            config.channels.iter().filter(|c| c.stats_enabled).map(|c| c.key.as_str()).collect::<Vec<_>>(),
            vec!["hr"]
        );
    }
    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = DashboardConfig::from_json(
            r#"{"max_points": 50, "source": {"kind": "replay", "path": "session.json"}}"#,
        )
        .unwrap();
        assert_eq!(config.max_points, 50);
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.source, SourceConfig::Replay { path: PathBuf::from("session.json") });
        assert_eq!(config.channels, default_channels());
    }
    #[test]
    fn channel_entries_default_precision_and_stats() {
        let config = DashboardConfig::from_json(
            r#"{"channels": [{"key": "hr", "label": "HR", "stats_enabled": true}, {"key": "ecg", "label": "ECG"}]}"#,
        )
        .unwrap();
        assert!(config.channels[0].stats_enabled);
        assert!(!config.channels[1].stats_enabled);
        assert_eq!(config.channels[1].precision, 2);
    }
    #[test]
    fn rejects_bad_settings() {
        let bad_band = DashboardConfig { normal_band_percent: 1.5, ..DashboardConfig::default() };
        assert!(matches!(bad_band.validate(), Err(DashboardError::Config(_))));
        let no_interval = DashboardConfig { poll_interval_ms: 0, ..DashboardConfig::default() };
        assert!(no_interval.validate().is_err());
        let mut duplicated = DashboardConfig::default();
        duplicated.channels.push(ChannelConfig::new("hr", "again"));
        assert!(matches!(
            duplicated.validate(),
            Err(DashboardError::DuplicateChannel(key)) if key == "hr"
        ));
        assert!(matches!(
            DashboardConfig::from_json("{\"max_points\": \"many\"}"),
            Err(DashboardError::Json(_))
        ));
    }
}
