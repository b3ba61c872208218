// ==============================================================================
// config.rs — PROCESS CONFIGURATION
// ------------------------------------------------------------------------------
// CAR_SIM_BIND    websocket listen address   (default 0.0.0.0:9001)
// CAR_SIM_CONFIG  optional JSON file: { "vehicle": {...}, "tuning": {...} }
//
// Every field is optional; missing ones keep their defaults.
// ==============================================================================

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dynamics::{TuningParameters, VehicleConfig};

pub const DEFAULT_BIND: &str = "0.0.0.0:9001";
pub const TICK_HZ: u32 = 60;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub vehicle: VehicleConfig,
    pub tuning: TuningParameters,
}

impl SimConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))?;
        info!(path = %path.display(), "loaded vehicle config");
        Ok(cfg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: String,
    pub config_path: Option<PathBuf>,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self {
            bind: std::env::var("CAR_SIM_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string()),
            config_path: std::env::var_os("CAR_SIM_CONFIG").map(PathBuf::from),
        }
    }

    /// Vehicle + tuning for this run, defaults when no file is configured.
    pub fn sim_config(&self) -> anyhow::Result<SimConfig> {
        match &self.config_path {
            Some(path) => SimConfig::load(path),
            None => Ok(SimConfig::default()),
        }
    }
}
