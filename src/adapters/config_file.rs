//! JSON config file adapter.
//!
//! Implements [`ConfigPort`] over a file on disk. Every section is
//! optional; missing fields take their defaults. The same file may carry
//! a `sim` section for the offline simulator, which [`ConfigPort::load`]
//! ignores.
//!
//! ```json
//! {
//!   "bus":    { "baud_rate": 115200, "query_timeout_ms": 20 },
//!   "search": { "threshold_bpm": 10 },
//!   "sim":    { "tau": 10.0, "max_steps": 40 }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;
use crate::sim::SimConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

#[derive(Deserialize)]
struct SimSection {
    #[serde(default)]
    sim: SimConfig,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The simulator section, defaults if absent.
    pub fn load_sim(&self) -> Result<SimConfig, ConfigError> {
        let text = self.read()?;
        let section: SimSection = serde_json::from_str(&text).map_err(|e| {
            warn!("config: {} sim section unreadable: {e}", self.path.display());
            ConfigError::Corrupted
        })?;
        section.sim.validate()?;
        Ok(section.sim)
    }

    fn read(&self) -> Result<String, ConfigError> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => {
                warn!("config: reading {} failed: {e}", self.path.display());
                ConfigError::IoError
            }
        })
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = self.read()?;
        let config = SystemConfig::from_json(&text)?;
        info!("config: loaded {}", self.path.display());
        Ok(config)
    }
}
