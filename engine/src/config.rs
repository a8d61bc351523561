//! # Engine Configuration
//!
//! Settings shared by every form the engine builds. They come from a YAML
//! file when one is given (explicitly or through `FORM_ENGINE_CONFIG`) and
//! fall back to defaults otherwise.
//!
//! ```yaml
//! async_debounce_ms: 300
//! decimal_places: 2
//! log_level: info
//! ```

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::forms::FormError;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "FORM_ENGINE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before an async validator runs after the last edit
    pub async_debounce_ms: u64,
    /// Fraction digits accepted by the decimal quantity validator
    pub decimal_places: u32,
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            async_debounce_ms: 300,
            decimal_places: 2,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, FormError> {
        info!("Loading engine configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, else from `FORM_ENGINE_CONFIG`, else defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self, FormError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                debug!("No engine configuration file given; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn async_debounce(&self) -> Duration {
        Duration::from_millis(self.async_debounce_ms)
    }

    fn validate(&self) -> Result<(), FormError> {
        if self.decimal_places > 9 {
            return Err(FormError::Config(format!(
                "decimal_places must be at most 9, got {}",
                self.decimal_places
            )));
        }
        if self.log_level.trim().is_empty() {
            return Err(FormError::Config("log_level cannot be empty".to_string()));
        }
        Ok(())
    }
}
