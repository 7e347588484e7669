//! Configuration for the reconciliation service

use crate::scheduler::ScheduleConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reconciliation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for the record store
    pub data_dir: PathBuf,

    /// Daily run schedule
    pub schedule: ScheduleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/reconciliation"),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("RECON_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(run_time) = std::env::var("RECON_RUN_TIME") {
            config.schedule.run_time = run_time;
        }

        if let Ok(enabled) = std::env::var("RECON_ENABLED") {
            config.schedule.enabled = enabled
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid RECON_ENABLED: {}", e)))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schedule.run_time, "02:00");
        assert!(config.schedule.enabled);
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            data_dir = "/var/lib/recon"

            [schedule]
            run_time = "03:30"
            enabled = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/recon"));
        assert_eq!(config.schedule.run_time, "03:30");
        assert!(!config.schedule.enabled);
    }
}
