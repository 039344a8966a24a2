use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PIN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_PIN_PROMPTS: u32 = 3;

/// Settings shared by every worker a coordinator starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Upper bound on a single PIN wait. `None` waits forever.
    pub pin_timeout: Option<Duration>,
    /// PIN prompts allowed in one attempt before it fails. `None` allows any
    /// number.
    pub max_pin_prompts: Option<u32>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pin_timeout: Some(DEFAULT_PIN_TIMEOUT),
            max_pin_prompts: Some(DEFAULT_MAX_PIN_PROMPTS),
        }
    }
}

/// On-disk form of [`CoordinatorConfig`]. A value of 0 for either setting
/// disables that bound.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    pin_timeout_secs: Option<u64>,
    max_pin_prompts: Option<u32>,
}

impl CoordinatorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let mut config = Self::default();
        if let Some(secs) = file.pin_timeout_secs {
            config = config.with_pin_timeout_secs(secs);
        }
        if let Some(max) = file.max_pin_prompts {
            config = config.with_max_pin_prompts(max);
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn with_pin_timeout_secs(mut self, secs: u64) -> Self {
        self.pin_timeout = (secs > 0).then_some(Duration::from_secs(secs));
        self
    }

    pub fn with_max_pin_prompts(mut self, max: u32) -> Self {
        self.max_pin_prompts = (max > 0).then_some(max);
        self
    }
}
