use anyhow::Result;
use log::info;
use ndarray as nd;
use rand::Rng;

use super::config::SimulationConfig;
use super::detector::{Detector, HitTable};
use super::photon::{Absorption, PhotonEnsemble};
use super::retro::retro_propagate;

/// Result of a propagation and detection run.
pub struct SimulationResult {
    /// Fully propagated photon ensemble.
    pub ensemble: PhotonEnsemble,
    /// Hits that survived the absorption filter.
    pub hits: HitTable,
}

impl SimulationResult {
    /// Retro-propagates the detected hits through the same medium.
    pub fn retro_propagate(
        &self,
        n_photons_per_hit: usize,
        n_steps: usize,
        rng: &mut impl Rng,
    ) -> Result<Absorption> {
        retro_propagate(
            self.ensemble.medium(),
            &self.hits,
            n_photons_per_hit,
            n_steps,
            rng,
        )
    }
}

/// Photon propagation through a medium observed by a detector.
pub struct Simulation {
    config: SimulationConfig,
    detector: Detector,
}

impl Simulation {
    /// Creates a simulation for sensors at `sensors` (shape `(n_sensors, dims)`).
    pub fn new(sensors: nd::Array2<f64>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let detector = Detector::new(sensors, config.radius)?;
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Propagates photons from the given initial conditions and detects them.
    pub fn run(
        &self,
        x0: nd::Array2<f64>,
        v0: nd::Array2<f64>,
        t0: nd::Array1<f64>,
        rng: &mut impl Rng,
    ) -> Result<SimulationResult> {
        let mut ensemble = PhotonEnsemble::new(x0, v0, t0, self.config.medium())?;
        info!(
            "Propagating {} photons over {} steps",
            ensemble.n_photons(),
            self.config.n_steps
        );
        ensemble.propagate(self.config.n_steps, rng)?;
        let hits = self.detector.detect(&ensemble, self.config.n_jobs, rng)?;
        Ok(SimulationResult { ensemble, hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::sampling::cascade;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_simulation_rejects_invalid_config() {
        let config = SimulationConfig {
            radius: 0.0,
            ..SimulationConfig::default()
        };
        assert!(Simulation::new(nd::Array2::zeros((1, 3)), config).is_err());
    }

    #[test]
    fn test_simulation_run() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = SimulationConfig {
            n_steps: 30,
            n_jobs: 2,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(nd::arr2(&[[2.0, 0.0], [-2.0, 0.0]]), config).unwrap();
        let (x0, v0, t0) = cascade(&[0.0, 0.0], 0.0, 2000, &mut rng);
        let result = sim.run(x0, v0, t0, &mut rng).unwrap();
        assert_eq!(result.ensemble.n_steps(), 30);
        assert!(!result.hits.is_empty());
        assert_eq!(result.hits.dims(), 2);

        let absorption = result.retro_propagate(2, 30, &mut rng).unwrap();
        assert_eq!(absorption.len(), 2 * result.hits.len());
    }
}
