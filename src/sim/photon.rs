use anyhow::Result;
use log::{debug, warn};
use ndarray as nd;
use rand::Rng;

use super::medium::Medium;
use crate::geom::rotation::{scatter_2d, scatter_3d};
use crate::vecutils::interp_bracket;

/// An ensemble of independent photon trajectories in one medium.
///
/// Before `propagate` only the initial state is recorded (one step).
/// `propagate` fills in the whole history once; afterwards the ensemble is
/// read-only apart from sampling queries like `absorb`.
///
/// Shapes: `positions` and `directions` are `(n_photons, n_steps, dims)`,
/// `times` and `weights` are `(n_photons, n_steps)`.
#[derive(Debug, Clone)]
pub struct PhotonEnsemble {
    positions: nd::Array3<f64>,
    directions: nd::Array3<f64>,
    times: nd::Array2<f64>,
    weights: nd::Array2<f64>,
    medium: Medium,
    dims: usize,
    propagated: bool,
}

/// Sampled absorption of every photon of an ensemble.
#[derive(Debug, Clone)]
pub struct Absorption {
    /// Absorption time per photon, shape `(n_photons)`.
    pub times: nd::Array1<f64>,
    /// Interpolated absorption position per photon, shape `(n_photons, dims)`.
    ///
    /// Rows are NaN when the absorption time lies outside the recorded
    /// time span of the photon.
    pub positions: nd::Array2<f64>,
}

impl Absorption {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Whether photon `i` was absorbed within its recorded path.
    pub fn is_inside(&self, i: usize) -> bool {
        self.positions.row(i).iter().all(|x| !x.is_nan())
    }

    /// Number of photons absorbed within their recorded path.
    pub fn num_inside(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_inside(i)).count()
    }

    /// Mean absorption position over the photons absorbed within their path.
    ///
    /// Returns `None` if there are no such photons.
    pub fn mean_position(&self) -> Option<Vec<f64>> {
        let dims = self.positions.ncols();
        let mut sum = vec![0.0; dims];
        let mut count = 0usize;
        for (i, row) in self.positions.outer_iter().enumerate() {
            if !self.is_inside(i) {
                continue;
            }
            for (s, x) in sum.iter_mut().zip(row.iter()) {
                *s += x;
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(sum.into_iter().map(|s| s / count as f64).collect())
    }
}

impl PhotonEnsemble {
    /// Creates an ensemble from initial conditions.
    ///
    /// - `x0`: initial positions, shape `(n_photons, dims)` with `dims` 2 or 3
    /// - `v0`: initial directions, same shape, normalized here
    /// - `t0`: initial times, shape `(n_photons)`
    pub fn new(
        x0: nd::Array2<f64>,
        mut v0: nd::Array2<f64>,
        t0: nd::Array1<f64>,
        medium: Medium,
    ) -> Result<Self> {
        let (n_photons, dims) = x0.dim();
        if dims != 2 && dims != 3 {
            anyhow::bail!("Number of dimensions must be either 2 or 3, got {dims}");
        }
        if v0.dim() != (n_photons, dims) {
            anyhow::bail!(
                "Initial directions have shape {:?}, expected {:?}",
                v0.dim(),
                (n_photons, dims)
            );
        }
        if t0.len() != n_photons {
            anyhow::bail!(
                "Got {} initial times for {} photons",
                t0.len(),
                n_photons
            );
        }
        medium.validate()?;

        for (i, mut row) in v0.outer_iter_mut().enumerate() {
            let len = row.iter().map(|x| x * x).sum::<f64>().sqrt();
            if !(len > 0.0 && len.is_finite()) {
                anyhow::bail!("Initial direction of photon {i} cannot be normalized");
            }
            row.mapv_inplace(|x| x / len);
        }

        debug!("New photon ensemble: {n_photons} photons in {dims}D");

        Ok(Self {
            positions: x0.insert_axis(nd::Axis(1)),
            directions: v0.insert_axis(nd::Axis(1)),
            times: t0.insert_axis(nd::Axis(1)),
            weights: nd::Array2::ones((n_photons, 1)),
            medium,
            dims,
            propagated: false,
        })
    }

    /// Runs the random walk so that `n_steps` states are recorded per photon.
    ///
    /// Every new step samples an exponential free flight with mean
    /// `1 / c_sca`, moves along the previous direction, deflects the
    /// direction by an angle from the scattering model and advances the time
    /// by `flight / c0`. Survival weights `exp(-c_abs (t - t0))` are computed
    /// at the end.
    ///
    /// An ensemble can only be propagated once.
    pub fn propagate(&mut self, n_steps: usize, rng: &mut impl Rng) -> Result<()> {
        if self.propagated {
            anyhow::bail!("Photon ensemble has already been propagated");
        }
        if n_steps == 0 {
            anyhow::bail!("Number of propagation steps must be at least 1");
        }

        let n = self.n_photons();
        let dims = self.dims;
        let mut positions = nd::Array3::<f64>::zeros((n, n_steps, dims));
        let mut directions = nd::Array3::<f64>::zeros((n, n_steps, dims));
        let mut times = nd::Array2::<f64>::zeros((n, n_steps));
        positions
            .index_axis_mut(nd::Axis(1), 0)
            .assign(&self.positions.index_axis(nd::Axis(1), 0));
        directions
            .index_axis_mut(nd::Axis(1), 0)
            .assign(&self.directions.index_axis(nd::Axis(1), 0));
        times.column_mut(0).assign(&self.times.column(0));

        for step in 1..n_steps {
            let flights = self.medium.free_flights(n, rng)?;
            let phi = self.medium.scattering.generate(n, rng)?;

            let v_prev = directions.index_axis(nd::Axis(1), step - 1).to_owned();
            let v_new = match dims {
                2 => scatter_2d(v_prev.view(), &phi),
                _ => scatter_3d(v_prev.view(), &phi, rng),
            };

            for i in 0..n {
                let s = flights[i];
                for k in 0..dims {
                    positions[[i, step, k]] = positions[[i, step - 1, k]] + s * v_prev[[i, k]];
                }
                times[[i, step]] = times[[i, step - 1]] + s / self.medium.c0;
            }
            directions.index_axis_mut(nd::Axis(1), step).assign(&v_new);
        }

        let c_abs = self.medium.c_abs;
        let mut weights = times.clone();
        for mut row in weights.outer_iter_mut() {
            let t_start = row[0];
            row.mapv_inplace(|t| (-c_abs * (t - t_start)).exp());
        }

        self.positions = positions;
        self.directions = directions;
        self.times = times;
        self.weights = weights;
        self.propagated = true;

        debug!("Propagated {n} photons over {n_steps} steps");
        Ok(())
    }

    /// Samples an absorption time for every photon and interpolates where
    /// along its path the photon was at that time.
    ///
    /// The absorption time is `t0 + Exp(mean 1 / c_abs)`. Photons whose
    /// absorption time lies beyond the recorded path get NaN positions.
    pub fn absorb(&self, rng: &mut impl Rng) -> Result<Absorption> {
        let n = self.n_photons();
        let delays = self.medium.absorption_delays(n, rng)?;

        let mut abs_times = nd::Array1::<f64>::zeros(n);
        let mut abs_positions = nd::Array2::from_elem((n, self.dims), f64::NAN);
        let mut outside = 0usize;

        for i in 0..n {
            let t_abs = delays[i] + self.times[[i, 0]];
            abs_times[i] = t_abs;

            let row_times = self.times.row(i);
            let bracket = match row_times.as_slice() {
                Some(ts) => interp_bracket(ts, t_abs),
                None => interp_bracket(&row_times.to_vec(), t_abs),
            };
            let Some((k, frac)) = bracket else {
                outside += 1;
                continue;
            };
            let upper = (k + 1).min(self.n_steps() - 1);
            for d in 0..self.dims {
                let a = self.positions[[i, k, d]];
                let b = self.positions[[i, upper, d]];
                abs_positions[[i, d]] = a + frac * (b - a);
            }
        }

        if outside > 0 {
            warn!(
                "{outside} of {n} absorption times fall outside the recorded paths; \
                 consider more propagation steps"
            );
        }

        Ok(Absorption {
            times: abs_times,
            positions: abs_positions,
        })
    }

    pub fn positions(&self) -> nd::ArrayView3<'_, f64> {
        self.positions.view()
    }

    pub fn directions(&self) -> nd::ArrayView3<'_, f64> {
        self.directions.view()
    }

    pub fn times(&self) -> nd::ArrayView2<'_, f64> {
        self.times.view()
    }

    /// Survival probability `exp(-c_abs (t - t0))` per photon and step.
    pub fn weights(&self) -> nd::ArrayView2<'_, f64> {
        self.weights.view()
    }

    pub fn medium(&self) -> &Medium {
        &self.medium
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn n_photons(&self) -> usize {
        self.times.nrows()
    }

    /// Number of recorded states per photon.
    pub fn n_steps(&self) -> usize {
        self.times.ncols()
    }

    pub fn is_propagated(&self) -> bool {
        self.propagated
    }
}
