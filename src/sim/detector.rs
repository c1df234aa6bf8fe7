use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::{debug, info};
use ndarray as nd;
use rand::Rng;
use rayon::prelude::*;

use super::medium::sample_exponential;
use super::photon::PhotonEnsemble;
use crate::geom::intersection::intersecting_segments;

/// One path segment of one photon crossing one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    /// Index of the sensor in the detector.
    pub sensor: usize,
    /// Index of the photon in the ensemble.
    pub photon: usize,
    /// Center of the sensor that was hit.
    pub position: Vec<f64>,
    /// Time recorded at the end vertex of the crossing segment.
    pub time: f64,
    /// Emission time of the photon (time of its first vertex).
    pub emission_time: f64,
}

impl HitRecord {
    /// Time of flight from emission to the hit.
    pub fn travel_time(&self) -> f64 {
        self.time - self.emission_time
    }
}

/// Ordered collection of hits, grouped by sensor then photon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitTable {
    dims: usize,
    records: Vec<HitRecord>,
}

impl HitTable {
    pub fn new(dims: usize, records: Vec<HitRecord>) -> Self {
        Self { dims, records }
    }

    /// Dimensionality of the hit positions.
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn records(&self) -> &[HitRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HitRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row indices for every `(sensor, photon)` pair.
    pub fn index(&self) -> BTreeMap<(usize, usize), Vec<usize>> {
        let mut index: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        for (row, rec) in self.records.iter().enumerate() {
            index.entry((rec.sensor, rec.photon)).or_default().push(row);
        }
        index
    }

    /// All hits recorded by one sensor.
    pub fn for_sensor(&self, sensor: usize) -> impl Iterator<Item = &HitRecord> {
        self.records.iter().filter(move |r| r.sensor == sensor)
    }

    /// Number of hits per sensor, for `num_sensors` sensors.
    pub fn counts_per_sensor(&self, num_sensors: usize) -> Vec<usize> {
        let mut counts = vec![0; num_sensors];
        for rec in &self.records {
            if let Some(c) = counts.get_mut(rec.sensor) {
                *c += 1;
            }
        }
        counts
    }

    /// Keeps each row with probability `exp(-c_abs * travel_time)`.
    ///
    /// Implemented as inverse-transform rejection: one exponential draw
    /// `s` with mean `1 / c_abs` per row, the row survives if
    /// `travel_time < s`.
    pub fn survival_filter(self, c_abs: f64, rng: &mut impl Rng) -> Result<Self> {
        let draws = sample_exponential(c_abs, self.records.len(), rng)?;
        let records = self
            .records
            .into_iter()
            .zip(draws)
            .filter(|(rec, s)| rec.travel_time() < *s)
            .map(|(rec, _)| rec)
            .collect();
        Ok(Self {
            dims: self.dims,
            records,
        })
    }
}

impl IntoIterator for HitTable {
    type Item = HitRecord;
    type IntoIter = std::vec::IntoIter<HitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a HitTable {
    type Item = &'a HitRecord;
    type IntoIter = std::slice::Iter<'a, HitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Hits of a single sensor: one record per crossing segment.
pub fn sensor_hits(
    positions: nd::ArrayView3<f64>,
    times: nd::ArrayView2<f64>,
    center: &[f64],
    radius: f64,
    sensor: usize,
) -> Result<Vec<HitRecord>> {
    let (n_photons, n_vertices, dims) = positions.dim();
    if times.dim() != (n_photons, n_vertices) {
        anyhow::bail!(
            "Path times have shape {:?}, expected {:?}",
            times.dim(),
            (n_photons, n_vertices)
        );
    }
    if center.len() != dims {
        anyhow::bail!("Sensor {sensor} is {}D but the photon paths are {dims}D", center.len());
    }
    let hits = intersecting_segments(positions, center, radius)
        .into_iter()
        .map(|(photon, segment)| HitRecord {
            sensor,
            photon,
            position: center.to_vec(),
            time: times[[photon, segment + 1]],
            emission_time: times[[photon, 0]],
        })
        .collect();
    Ok(hits)
}

/// A set of spherical sensors sharing one radius.
#[derive(Debug, Clone)]
pub struct Detector {
    sensors: nd::Array2<f64>,
    radius: f64,
}

impl Detector {
    /// Creates a detector from sensor centers of shape `(n_sensors, dims)`.
    pub fn new(sensors: nd::Array2<f64>, radius: f64) -> Result<Self> {
        if !(radius > 0.0 && radius.is_finite()) {
            anyhow::bail!("Sensor radius must be a positive finite number, got {radius}");
        }
        Ok(Self { sensors, radius })
    }

    pub fn sensors(&self) -> nd::ArrayView2<'_, f64> {
        self.sensors.view()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn num_sensors(&self) -> usize {
        self.sensors.nrows()
    }

    pub fn dims(&self) -> usize {
        self.sensors.ncols()
    }

    /// Finds every path segment crossing a sensor and applies the
    /// absorption survival filter.
    ///
    /// Sensors are processed on `n_jobs` threads. Hits are merged in sensor
    /// order, so the result does not depend on `n_jobs` before filtering.
    pub fn detect(
        &self,
        ensemble: &PhotonEnsemble,
        n_jobs: usize,
        rng: &mut impl Rng,
    ) -> Result<HitTable> {
        let raw = self.intersect(ensemble, n_jobs)?;
        let num_raw = raw.len();
        let hits = raw.survival_filter(ensemble.medium().c_abs, rng)?;
        info!(
            "Detected {} of {} geometric hits on {} sensors",
            hits.len(),
            num_raw,
            self.num_sensors()
        );
        Ok(hits)
    }

    /// Geometric hits of all sensors, without the survival filter.
    pub fn intersect(&self, ensemble: &PhotonEnsemble, n_jobs: usize) -> Result<HitTable> {
        self.intersect_paths(ensemble.positions(), ensemble.times(), n_jobs)
    }

    /// Geometric hits of all sensors for explicit paths.
    ///
    /// `positions` has shape `(n_photons, n_vertices, dims)` and `times`
    /// `(n_photons, n_vertices)`.
    pub fn intersect_paths(
        &self,
        positions: nd::ArrayView3<f64>,
        times: nd::ArrayView2<f64>,
        n_jobs: usize,
    ) -> Result<HitTable> {
        if n_jobs == 0 {
            anyhow::bail!("Number of jobs must be at least 1");
        }
        let (n_photons, n_vertices, dims) = positions.dim();
        if times.dim() != (n_photons, n_vertices) {
            anyhow::bail!(
                "Path times have shape {:?}, expected {:?}",
                times.dim(),
                (n_photons, n_vertices)
            );
        }
        if self.num_sensors() > 0 && self.dims() != dims {
            anyhow::bail!(
                "Detector is {}D but the photon paths are {}D",
                self.dims(),
                dims
            );
        }

        let radius = self.radius;
        let per_sensor = |(sensor, center): (usize, nd::ArrayView1<f64>)| {
            sensor_hits(positions, times, &center.to_vec(), radius, sensor)
        };

        let chunks: Vec<Vec<HitRecord>> = if n_jobs == 1 {
            self.sensors
                .outer_iter()
                .enumerate()
                .map(per_sensor)
                .collect::<Result<_>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_jobs)
                .build()
                .context("Failed to build detector thread pool")?;
            let sensors: Vec<(usize, nd::ArrayView1<f64>)> =
                self.sensors.outer_iter().enumerate().collect();
            pool.install(|| sensors.into_par_iter().map(per_sensor).collect::<Result<_>>())?
        };

        let records: Vec<HitRecord> = chunks.into_iter().flatten().collect();
        debug!(
            "Intersected {} photons with {} sensors on {} jobs: {} hits",
            n_photons,
            self.num_sensors(),
            n_jobs,
            records.len()
        );
        Ok(HitTable::new(dims, records))
    }
}
