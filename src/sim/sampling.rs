//! Initial conditions for photon ensembles.
//!
//! Each function returns `(positions, directions, times)` ready for
//! `PhotonEnsemble::new`.

use anyhow::Result;
use ndarray as nd;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::vecutils::norm;

/// Initial positions `(n, d)`, unit directions `(n, d)` and times `(n)`.
pub type InitialConditions = (nd::Array2<f64>, nd::Array2<f64>, nd::Array1<f64>);

/// Draws `n` unit vectors uniformly distributed on the unit sphere (circle in 2D).
pub fn isotropic(n: usize, dims: usize, rng: &mut impl Rng) -> nd::Array2<f64> {
    let mut out = nd::Array2::<f64>::zeros((n, dims));
    if dims == 0 {
        return out;
    }
    for mut row in out.outer_iter_mut() {
        loop {
            for x in row.iter_mut() {
                *x = rng.sample(StandardNormal);
            }
            let len = row.iter().map(|x| x * x).sum::<f64>().sqrt();
            if len > 0.0 {
                row.mapv_inplace(|x| x / len);
                break;
            }
        }
    }
    out
}

/// `n` photons emitted at a single point `x0` at time `t0`, isotropically.
pub fn cascade(x0: &[f64], t0: f64, n: usize, rng: &mut impl Rng) -> InitialConditions {
    let dims = x0.len();
    let mut positions = nd::Array2::<f64>::zeros((n, dims));
    for mut row in positions.outer_iter_mut() {
        row.assign(&nd::ArrayView1::from(x0));
    }
    let directions = isotropic(n, dims, rng);
    let times = nd::Array1::from_elem(n, t0);
    (positions, directions, times)
}

/// `n_photons` photons emitted along the straight track `x_start -> x_end`.
///
/// The track is traversed at `speed` starting at `t_start`, so a photon
/// emitted at distance `s` from `x_start` starts at `t_start + s / speed`.
///
/// - `n_losses = None`: every photon starts at its own uniform point on the track.
/// - `n_losses = Some(k)`: the track loses energy at `k` uniform points and the
///   photons are split into `k` groups, each emitted from one of them. Group
///   sizes come from `k - 1` sorted uniform cut points in `[1, n_photons)`.
pub fn track(
    x_start: &[f64],
    x_end: &[f64],
    t_start: f64,
    n_photons: usize,
    n_losses: Option<usize>,
    speed: f64,
    rng: &mut impl Rng,
) -> Result<InitialConditions> {
    let dims = x_start.len();
    if x_end.len() != dims {
        anyhow::bail!(
            "Track endpoints differ in dimensionality: {} vs {}",
            dims,
            x_end.len()
        );
    }
    if !(speed > 0.0 && speed.is_finite()) {
        anyhow::bail!("Track speed must be a positive finite number, got {speed}");
    }

    // Fraction along the track for every photon
    let fractions: Vec<f64> = match n_losses {
        None => (0..n_photons).map(|_| rng.r#gen::<f64>()).collect(),
        Some(0) => anyhow::bail!("Number of losses must be at least 1"),
        Some(k) => {
            if n_photons < 2 && k > 1 {
                anyhow::bail!("Cannot split {n_photons} photons into {k} losses");
            }
            let mut cuts: Vec<usize> = (0..k - 1).map(|_| rng.gen_range(1..n_photons)).collect();
            cuts.sort_unstable();
            let mut bounds = Vec::with_capacity(k + 1);
            bounds.push(0);
            bounds.extend(cuts);
            bounds.push(n_photons);

            let mut fractions = Vec::with_capacity(n_photons);
            for w in bounds.windows(2) {
                let frac: f64 = rng.r#gen();
                fractions.extend(std::iter::repeat_n(frac, w[1] - w[0]));
            }
            fractions
        }
    };

    let delta: Vec<f64> = x_start.iter().zip(x_end).map(|(a, b)| b - a).collect();
    let track_len = norm(&delta);

    let mut positions = nd::Array2::<f64>::zeros((n_photons, dims));
    let mut times = nd::Array1::<f64>::zeros(n_photons);
    for (i, &frac) in fractions.iter().enumerate() {
        for k in 0..dims {
            positions[[i, k]] = x_start[k] + delta[k] * frac;
        }
        times[i] = frac * track_len / speed + t_start;
    }
    let directions = isotropic(n_photons, dims, rng);

    Ok((positions, directions, times))
}
