//! Trainer configuration, loaded from an optional JSON file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use vocal_core::{SessionConfig, TrackerSettings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub tracker: TrackerSettings,
    pub session: SessionConfig,
    /// Samples per analysis block (~46 ms at 44.1 kHz).
    pub block_size: usize,
    /// Display refresh rate of the console meter.
    pub refresh_hz: f32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerSettings::default(),
            session: SessionConfig::default(),
            block_size: 2048,
            refresh_hz: 30.0,
        }
    }
}

impl TrainerConfig {
    /// Reads a config file, or returns the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let mut file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: TrainerConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.block_size > 0, "block_size must be positive");
        ensure!(
            self.refresh_hz.is_finite() && self.refresh_hz > 0.0,
            "refresh_hz must be positive"
        );
        ensure!(
            self.tracker.min_hz < self.tracker.max_hz,
            "tracker.min_hz must be below tracker.max_hz"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: TrainerConfig = serde_json::from_str(
            r#"{ "block_size": 4096, "tracker": { "clarity_threshold": 0.8 } }"#,
        )
        .unwrap();
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.tracker.clarity_threshold, 0.8);
        assert_eq!(config.tracker.rms_threshold, 0.01);
        assert_eq!(config.refresh_hz, 30.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_band() {
        let mut config = TrainerConfig::default();
        config.tracker.min_hz = 1000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_path_means_defaults() {
        assert_eq!(TrainerConfig::load(None).unwrap(), TrainerConfig::default());
    }
}
