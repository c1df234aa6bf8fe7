//! Segment-sphere intersection tests for polyline paths.
//!
//! A path is a sequence of vertices; segment `k` joins vertex `k` and `k + 1`.
//! Works for any dimensionality, the sphere is a circle in 2D.

use ndarray as nd;

/// Distance along the segment `w1 -> w2` at which it crosses the sphere
/// of radius `r` centered at the origin.
///
/// Endpoints must already be expressed relative to the sphere center.
/// With `d = v . w1` for the unit direction `v`, the crossing distances are
/// `-d +/- sqrt(delta)` where `delta = d^2 - |w1|^2 + r^2`. The larger root
/// is preferred and the smaller one is used when the larger is not on the
/// segment. Returns `None` when `delta <= 0` (tangent or no crossing),
/// when the segment has zero length, or when neither root satisfies
/// `0 < t <= length`.
pub fn segment_sphere_crossing(w1: &[f64], w2: &[f64], r: f64) -> Option<f64> {
    let length = w1
        .iter()
        .zip(w2)
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt();
    if length <= 0.0 {
        return None;
    }

    let mut d = 0.0;
    let mut w1_sq = 0.0;
    for (a, b) in w1.iter().zip(w2) {
        d += (b - a) / length * a;
        w1_sq += a * a;
    }
    let delta = d * d - w1_sq + r * r;
    if delta <= 0.0 {
        return None;
    }

    let sq = delta.max(0.0).sqrt();
    let mut t = -d + sq;
    if t < 0.0 || t > length {
        t = -d - sq;
    }

    if t > 0.0 && t <= length {
        Some(t)
    } else {
        None
    }
}

/// Finds all `(photon, segment)` pairs of `paths` that cross the sphere.
///
/// `paths` has shape `(n_photons, n_vertices, n_dims)` and `center` has
/// `n_dims` entries. Pairs are ordered by photon, then by segment.
pub fn intersecting_segments(
    paths: nd::ArrayView3<f64>,
    center: &[f64],
    radius: f64,
) -> Vec<(usize, usize)> {
    let (_, n_vertices, n_dims) = paths.dim();
    assert_eq!(center.len(), n_dims, "sphere center must match path dimensionality");

    let mut hits = Vec::new();
    if n_vertices < 2 {
        return hits;
    }

    let mut w1 = vec![0.0; n_dims];
    let mut w2 = vec![0.0; n_dims];
    for (photon, path) in paths.outer_iter().enumerate() {
        for segment in 0..n_vertices - 1 {
            for k in 0..n_dims {
                w1[k] = path[[segment, k]] - center[k];
                w2[k] = path[[segment + 1, k]] - center[k];
            }
            if segment_sphere_crossing(&w1, &w2, radius).is_some() {
                hits.push((photon, segment));
            }
        }
    }
    hits
}

/// For every photon, whether any segment of its path crosses the sphere.
pub fn any_intersection(paths: nd::ArrayView3<f64>, center: &[f64], radius: f64) -> Vec<bool> {
    let mut out = vec![false; paths.dim().0];
    for (photon, _) in intersecting_segments(paths, center, radius) {
        out[photon] = true;
    }
    out
}
