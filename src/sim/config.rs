use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::medium::Medium;
use super::scattering::ScatteringModel;

/// Parameters of a propagation and detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Medium
    pub c_sca: f64,
    pub c_abs: f64,
    pub c0: f64,
    pub scattering: ScatteringModel,

    // Detector
    /// Radius shared by all sensors.
    pub radius: f64,

    // Engine
    /// Number of recorded states per photon.
    pub n_steps: usize,
    /// Number of threads used for detection.
    pub n_jobs: usize,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            c_sca: 1.0,
            c_abs: 0.01,
            c0: 1.0,
            scattering: ScatteringModel::default(),
            radius: 1.0,
            n_steps: 50,
            n_jobs: 1,
        }
    }

    /// Parses a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse simulation config")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.medium().validate()?;
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            anyhow::bail!("radius must be a positive finite number, got {}", self.radius);
        }
        if self.n_steps == 0 {
            anyhow::bail!("n_steps must be at least 1");
        }
        if self.n_jobs == 0 {
            anyhow::bail!("n_jobs must be at least 1");
        }
        Ok(())
    }

    /// Physical parameters of the medium.
    pub fn medium(&self) -> Medium {
        Medium {
            c_sca: self.c_sca,
            c_abs: self.c_abs,
            c0: self.c0,
            scattering: self.scattering,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
