use anyhow::Result;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Asymmetry parameter of the default Henyey-Greenstein model.
pub const DEFAULT_HG_G: f64 = 0.94;

/// Below this |g| the Henyey-Greenstein inversion is replaced by its
/// isotropic limit `cos(phi) = r`.
const HG_ISOTROPIC_G: f64 = 1e-8;

/// Angular distribution of the polar deflection at a scattering event.
///
/// Angles are in radians. The azimuth is not sampled here, 3D rotation
/// randomizes it separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ScatteringModel {
    /// `phi ~ Normal(0, sigma)`.
    Gaussian { sigma: f64 },
    /// Henyey-Greenstein phase function with asymmetry parameter `g` in (-1, 1).
    HenyeyGreenstein { g: f64 },
}

impl Default for ScatteringModel {
    fn default() -> Self {
        Self::HenyeyGreenstein { g: DEFAULT_HG_G }
    }
}

impl ScatteringModel {
    /// Checks the model parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Gaussian { sigma } => {
                if !(sigma > 0.0 && sigma.is_finite()) {
                    anyhow::bail!("Gaussian scattering requires sigma > 0, got {sigma}");
                }
            }
            Self::HenyeyGreenstein { g } => {
                if !(g > -1.0 && g < 1.0) {
                    anyhow::bail!("Henyey-Greenstein scattering requires -1 < g < 1, got {g}");
                }
            }
        }
        Ok(())
    }

    /// Draws `n` scattering angles.
    pub fn generate(&self, n: usize, rng: &mut impl Rng) -> Result<Vec<f64>> {
        self.validate()?;
        match *self {
            Self::Gaussian { sigma } => {
                let normal = Normal::new(0.0, sigma)
                    .map_err(|e| anyhow::anyhow!("Invalid Gaussian scattering sigma {sigma}: {e}"))?;
                Ok(normal.sample_iter(rng).take(n).collect())
            }
            Self::HenyeyGreenstein { g } => Ok((0..n)
                .map(|_| henyey_greenstein_angle(g, rng.gen_range(-1.0..=1.0)))
                .collect()),
        }
    }
}

/// Inverts the Henyey-Greenstein CDF for a uniform draw `r` in [-1, 1].
///
/// ```text
/// cos(phi) = (1 + g^2 - ((1 - g^2) / (1 + g r))^2) / (2 g)
/// ```
/// Reference: https://www.astro.umd.edu/~jph/HG_note.pdf
pub fn henyey_greenstein_angle(g: f64, r: f64) -> f64 {
    let cos_phi = if g.abs() < HG_ISOTROPIC_G {
        r
    } else {
        let frac = (1.0 - g * g) / (1.0 + g * r);
        (1.0 + g * g - frac * frac) / (2.0 * g)
    };
    cos_phi.clamp(-1.0, 1.0).acos()
}
