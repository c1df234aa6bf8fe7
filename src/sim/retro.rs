use anyhow::Result;
use log::debug;
use ndarray as nd;
use rand::Rng;

use super::detector::HitTable;
use super::medium::Medium;
use super::photon::{Absorption, PhotonEnsemble};
use super::sampling::isotropic;

/// Propagates a new ensemble backwards from detected hits and samples
/// where it is absorbed.
///
/// Every hit spawns `n_photons_per_hit` photons at the sensor center with
/// time `-hit.time` and isotropic directions. The new ensemble shares the
/// `medium` of the detected ensemble and is propagated for `n_steps` steps.
/// The absorption sample estimates where and when the detected light
/// originated.
pub fn retro_propagate(
    medium: &Medium,
    hits: &HitTable,
    n_photons_per_hit: usize,
    n_steps: usize,
    rng: &mut impl Rng,
) -> Result<Absorption> {
    if n_photons_per_hit == 0 {
        anyhow::bail!("Number of photons per hit must be at least 1");
    }
    if hits.is_empty() {
        debug!("No hits to retro-propagate");
        return Ok(Absorption {
            times: nd::Array1::zeros(0),
            positions: nd::Array2::zeros((0, hits.dims())),
        });
    }
    let ensemble = retro_ensemble(medium, hits, n_photons_per_hit, n_steps, rng)?;
    ensemble.absorb(rng)
}

/// Builds and propagates the time-reversed ensemble used by `retro_propagate`.
pub fn retro_ensemble(
    medium: &Medium,
    hits: &HitTable,
    n_photons_per_hit: usize,
    n_steps: usize,
    rng: &mut impl Rng,
) -> Result<PhotonEnsemble> {
    if n_photons_per_hit == 0 {
        anyhow::bail!("Number of photons per hit must be at least 1");
    }
    let dims = hits.dims();
    let n = hits.len() * n_photons_per_hit;

    let mut x0 = nd::Array2::<f64>::zeros((n, dims));
    let mut t0 = nd::Array1::<f64>::zeros(n);
    for (h, rec) in hits.iter().enumerate() {
        if rec.position.len() != dims {
            anyhow::bail!(
                "Hit {h} has a {}D position in a {dims}D hit table",
                rec.position.len()
            );
        }
        for j in 0..n_photons_per_hit {
            let row = h * n_photons_per_hit + j;
            for (k, &x) in rec.position.iter().enumerate() {
                x0[[row, k]] = x;
            }
            t0[row] = -rec.time;
        }
    }
    let v0 = isotropic(n, dims, rng);

    debug!(
        "Retro-propagating {} hits with {} photons each",
        hits.len(),
        n_photons_per_hit
    );

    let mut ensemble = PhotonEnsemble::new(x0, v0, t0, *medium)?;
    ensemble.propagate(n_steps, rng)?;
    Ok(ensemble)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::detector::HitRecord;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn table() -> HitTable {
        let records = vec![
            HitRecord {
                sensor: 0,
                photon: 3,
                position: vec![1.0, 2.0, 3.0],
                time: 4.0,
                emission_time: 0.0,
            },
            HitRecord {
                sensor: 1,
                photon: 5,
                position: vec![-1.0, 0.0, 0.0],
                time: 6.5,
                emission_time: 0.5,
            },
        ];
        HitTable::new(3, records)
    }

    #[test]
    fn test_retro_ensemble_initial_conditions() {
        let mut rng = StdRng::seed_from_u64(1);
        let ens = retro_ensemble(&Medium::default(), &table(), 3, 5, &mut rng).unwrap();
        assert_eq!(ens.n_photons(), 6);
        assert_eq!(ens.n_steps(), 5);
        let x = ens.positions();
        let t = ens.times();
        for row in 0..3 {
            assert_eq!(t[[row, 0]], -4.0);
            assert_eq!(x[[row, 0, 2]], 3.0);
        }
        for row in 3..6 {
            assert_eq!(t[[row, 0]], -6.5);
            assert_eq!(x[[row, 0, 0]], -1.0);
        }
    }

    #[test]
    fn test_retro_keeps_medium() {
        let mut rng = StdRng::seed_from_u64(2);
        let medium = Medium {
            c_sca: 3.0,
            c_abs: 0.7,
            c0: 2.0,
            ..Medium::default()
        };
        let ens = retro_ensemble(&medium, &table(), 1, 2, &mut rng).unwrap();
        assert_eq!(ens.medium(), &medium);
    }

    #[test]
    fn test_retro_propagate_empty_hits() {
        let mut rng = StdRng::seed_from_u64(3);
        let hits = HitTable::new(2, Vec::new());
        let absorption = retro_propagate(&Medium::default(), &hits, 10, 20, &mut rng).unwrap();
        assert!(absorption.is_empty());
        assert_eq!(absorption.positions.dim(), (0, 2));
    }

    #[test]
    fn test_retro_propagate_default_table() {
        let mut rng = StdRng::seed_from_u64(5);
        let absorption =
            retro_propagate(&Medium::default(), &HitTable::default(), 1, 10, &mut rng).unwrap();
        assert!(absorption.is_empty());
        assert_eq!(absorption.num_inside(), 0);
        assert!(absorption.mean_position().is_none());
    }

    #[test]
    fn test_retro_rejects_zero_replication() {
        let mut rng = StdRng::seed_from_u64(4);
        assert!(retro_propagate(&Medium::default(), &table(), 0, 20, &mut rng).is_err());
        assert!(retro_propagate(&Medium::default(), &HitTable::default(), 0, 20, &mut rng).is_err());
    }
}
