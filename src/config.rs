use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Rig configuration for one workflow.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RigConfig {
    /// Imaging device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Trigger hardware settings
    #[serde(default)]
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Swap the two devices' target pages after arming them
    pub flip_target_pages: bool,
    /// Fire both stations at once instead of one after the other
    pub parallel_capture: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// How often the trigger loop polls its sources, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            flip_target_pages: false,
            parallel_capture: true,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
        }
    }
}

impl TriggerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl RigConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. `<workflow>/bookrig.toml` when present
    /// 3. Environment variables (prefixed with BOOKRIG_)
    pub fn load(workflow_path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = workflow_path.join("bookrig.toml");
        if config_file.exists() {
            builder = builder.add_source(File::from(config_file));
        }

        builder = builder.add_source(
            Environment::with_prefix("BOOKRIG")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let loaded = config.try_deserialize::<RigConfig>()?;
        Ok(loaded)
    }
}
