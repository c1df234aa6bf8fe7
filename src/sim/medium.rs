use anyhow::Result;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

use super::scattering::ScatteringModel;

/// Optical properties of a homogeneous scattering and absorbing medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    /// Scattering coefficient (inverse mean free path).
    pub c_sca: f64,
    /// Absorption coefficient (inverse mean absorption length).
    pub c_abs: f64,
    /// Propagation speed.
    pub c0: f64,
    /// Deflection angle distribution at each scattering.
    pub scattering: ScatteringModel,
}

impl Medium {
    pub fn new(c_sca: f64, c_abs: f64, c0: f64, scattering: ScatteringModel) -> Result<Self> {
        let medium = Self {
            c_sca,
            c_abs,
            c0,
            scattering,
        };
        medium.validate()?;
        Ok(medium)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("c_sca", self.c_sca), ("c_abs", self.c_abs), ("c0", self.c0)] {
            if !(value > 0.0 && value.is_finite()) {
                anyhow::bail!("{name} must be a positive finite number, got {value}");
            }
        }
        self.scattering.validate()
    }

    /// Samples `n` free-flight lengths, exponential with mean `1 / c_sca`.
    pub fn free_flights(&self, n: usize, rng: &mut impl Rng) -> Result<Vec<f64>> {
        sample_exponential(self.c_sca, n, rng)
    }

    /// Samples `n` absorption delays, exponential with mean `1 / c_abs`.
    pub fn absorption_delays(&self, n: usize, rng: &mut impl Rng) -> Result<Vec<f64>> {
        sample_exponential(self.c_abs, n, rng)
    }
}

impl Default for Medium {
    fn default() -> Self {
        Self {
            c_sca: 1.0,
            c_abs: 0.01,
            c0: 1.0,
            scattering: ScatteringModel::default(),
        }
    }
}

/// Draws `n` samples from an exponential distribution with the given rate.
pub fn sample_exponential(rate: f64, n: usize, rng: &mut impl Rng) -> Result<Vec<f64>> {
    let exp = Exp::new(rate).map_err(|e| anyhow::anyhow!("Invalid exponential rate {rate}: {e}"))?;
    Ok(exp.sample_iter(rng).take(n).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_medium_validation() {
        assert!(Medium::new(1.0, 0.01, 1.0, ScatteringModel::default()).is_ok());
        assert!(Medium::new(0.0, 0.01, 1.0, ScatteringModel::default()).is_err());
        assert!(Medium::new(1.0, -0.5, 1.0, ScatteringModel::default()).is_err());
        assert!(Medium::new(1.0, 0.01, f64::INFINITY, ScatteringModel::default()).is_err());
        let bad_model = ScatteringModel::HenyeyGreenstein { g: 1.5 };
        assert!(Medium::new(1.0, 0.01, 1.0, bad_model).is_err());
    }

    #[test]
    fn test_free_flight_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        let medium = Medium {
            c_sca: 2.5,
            ..Medium::default()
        };
        let flights = medium.free_flights(200_000, &mut rng).unwrap();
        assert!(flights.iter().all(|&s| s >= 0.0));
        let mean = flights.iter().sum::<f64>() / flights.len() as f64;
        assert!((mean - 0.4).abs() < 0.005, "mean free flight = {mean}");
    }

    #[test]
    fn test_absorption_delay_mean() {
        let mut rng = StdRng::seed_from_u64(6);
        let medium = Medium {
            c_abs: 0.1,
            ..Medium::default()
        };
        let delays = medium.absorption_delays(200_000, &mut rng).unwrap();
        let mean = delays.iter().sum::<f64>() / delays.len() as f64;
        assert!((mean - 10.0).abs() < 0.1, "mean delay = {mean}");
    }
}
