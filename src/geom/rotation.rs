use ndarray as nd;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::geom::EPS;

/// Calculate the 2D rotation matrix for angle `phi` (radians).
///
/// ```text
/// R = [[cos(phi), -sin(phi)],
///      [sin(phi),  cos(phi)]]
/// ```
pub fn rotation_matrix_2d(phi: f64) -> nd::Array2<f64> {
    let (s, c) = phi.sin_cos();
    nd::arr2(&[[c, -s], [s, c]])
}

/// Calculate rotation matrix for a unit vector `u` and angle `phi`.
///
/// A rotation in 3D can be described with an axis and angle around that axis.
/// The axis is described with a unit vector `u` `(ux**2 + uy**2 + uz**2 == 1)`.
///
/// Uses the Rodrigues form, which is more stable numerically than expanding
/// the nine entries explicitly:
/// ```text
/// R = I + sin(phi) * W + 2 * sin(phi / 2)^2 * W^2
/// ```
/// where `W` is the cross-product matrix of `u`.
/// https://en.wikipedia.org/wiki/Rodrigues%27_rotation_formula
pub fn rotation_matrix(u: &[f64; 3], phi: f64) -> nd::Array2<f64> {
    debug_assert!(
        (u[0] * u[0] + u[1] * u[1] + u[2] * u[2] - 1.0).abs() < 1e-9,
        "rotation_matrix() requires u to be a unit vector"
    );

    let w: nd::Array2<f64> = nd::arr2(&[[0., -u[2], u[1]], [u[2], 0., -u[0]], [-u[1], u[0], 0.]]);

    nd::Array::eye(3) + phi.sin() * &w + (2. * (phi / 2.).sin().powi(2)) * w.dot(&w)
}

/// Cross product between 2 vectors.
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Rotates every row of `v` (shape `(n, 2)`) by the matching angle in `phi`.
pub fn scatter_2d(v: nd::ArrayView2<f64>, phi: &[f64]) -> nd::Array2<f64> {
    assert_eq!(v.nrows(), phi.len(), "one angle per direction is required");
    let mut out = nd::Array2::<f64>::zeros(v.raw_dim());
    for ((row, mut out_row), &angle) in v.outer_iter().zip(out.outer_iter_mut()).zip(phi) {
        out_row.assign(&rotation_matrix_2d(angle).dot(&row));
    }
    out
}

/// Deflects every row of `v` (shape `(n, 3)`) by the polar angle in `phi`.
///
/// The rotation axis is a random vector orthogonal to the direction. It is
/// built from a standard-normal draw `a` as a uniform blend of `v x a` and
/// `v x (v x a)`, so the azimuth of the deflection is randomized without
/// sampling it explicitly.
pub fn scatter_3d(v: nd::ArrayView2<f64>, phi: &[f64], rng: &mut impl Rng) -> nd::Array2<f64> {
    assert_eq!(v.nrows(), phi.len(), "one angle per direction is required");
    let mut out = nd::Array2::<f64>::zeros(v.raw_dim());
    for ((row, mut out_row), &angle) in v.outer_iter().zip(out.outer_iter_mut()).zip(phi) {
        let dir = [row[0], row[1], row[2]];
        let axis = random_orthogonal_axis(&dir, rng);
        out_row.assign(&rotation_matrix(&axis, angle).dot(&row));
    }
    out
}

/// Draws a unit vector orthogonal to `v`.
fn random_orthogonal_axis(v: &[f64; 3], rng: &mut impl Rng) -> [f64; 3] {
    loop {
        let a = [
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
        ];
        let u1 = cross(v, &a);
        let u2 = cross(v, &u1);
        let r: f64 = rng.r#gen();
        let u = [
            r * u1[0] + (1.0 - r) * u2[0],
            r * u1[1] + (1.0 - r) * u2[1],
            r * u1[2] + (1.0 - r) * u2[2],
        ];
        let len = (u[0] * u[0] + u[1] * u[1] + u[2] * u[2]).sqrt();
        // Draw parallel to v, try again
        if len > EPS {
            return [u[0] / len, u[1] / len, u[2] / len];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::PI;

    /// Rodrigues formula applied directly to a vector.
    fn rotate_around_axis(v: &[f64; 3], u: &[f64; 3], phi: f64) -> [f64; 3] {
        let (s, c) = phi.sin_cos();
        let uxv = cross(u, v);
        let k = (u[0] * v[0] + u[1] * v[1] + u[2] * v[2]) * (1.0 - c);
        [
            v[0] * c + uxv[0] * s + u[0] * k,
            v[1] * c + uxv[1] * s + u[1] * k,
            v[2] * c + uxv[2] * s + u[2] * k,
        ]
    }

    fn angle_between(a: &[f64; 3], b: &[f64; 3]) -> f64 {
        let d = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        d.clamp(-1.0, 1.0).acos()
    }

    #[test]
    fn test_rotation_matrix_quarter_turn() {
        let u = [0., 1., 0.];
        let rot = rotation_matrix(&u, -PI / 2.);
        let p = nd::arr1(&[0.0, 0.0, 1.0]);
        let rotated = rot.dot(&p);
        assert!((rotated[0] + 1.0).abs() < 1e-12);
        assert!(rotated[1].abs() < 1e-12);
        assert!(rotated[2].abs() < 1e-12);
    }

    #[test]
    fn test_rotate_around_axis_matches_matrix() {
        let u = [1.0 / 3f64.sqrt(), 1.0 / 3f64.sqrt(), -1.0 / 3f64.sqrt()];
        let v = [0.2, -0.5, 0.8];
        let phi = 0.7;
        let by_matrix = rotation_matrix(&u, phi).dot(&nd::arr1(&v));
        let direct = rotate_around_axis(&v, &u, phi);
        for i in 0..3 {
            assert!((by_matrix[i] - direct[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rotation_matrix_2d() {
        let rot = rotation_matrix_2d(PI / 2.);
        let rotated = rot.dot(&nd::arr1(&[1.0, 0.0]));
        assert!(rotated[0].abs() < 1e-12);
        assert!((rotated[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scatter_2d_matches_matrix() {
        let v = nd::arr2(&[[1.0, 0.0], [0.6, 0.8]]);
        let phi = [0.3, -1.2];
        let out = scatter_2d(v.view(), &phi);
        for i in 0..2 {
            let expected = rotation_matrix_2d(phi[i]).dot(&v.row(i));
            assert!((out[[i, 0]] - expected[0]).abs() < 1e-12);
            assert!((out[[i, 1]] - expected[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scatter_3d_deflects_by_phi() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 200;
        let mut v = nd::Array2::<f64>::zeros((n, 3));
        let mut phi = Vec::with_capacity(n);
        for i in 0..n {
            let theta = i as f64 * 0.05;
            v[[i, 0]] = theta.cos() * 0.6;
            v[[i, 1]] = theta.sin() * 0.6;
            v[[i, 2]] = 0.8;
            phi.push(i as f64 / n as f64 * PI);
        }
        let out = scatter_3d(v.view(), &phi, &mut rng);
        for i in 0..n {
            let a = [v[[i, 0]], v[[i, 1]], v[[i, 2]]];
            let b = [out[[i, 0]], out[[i, 1]], out[[i, 2]]];
            let len = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-10, "row {i} has norm {len}");
            assert!(
                (angle_between(&a, &b) - phi[i]).abs() < 1e-6,
                "row {i}: expected deflection {}",
                phi[i]
            );
        }
    }

    #[test]
    fn test_scatter_3d_azimuth_is_spread() {
        // Deflect +z by 90 degrees many times, the results should average out
        // in the xy-plane.
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let mut v = nd::Array2::<f64>::zeros((n, 3));
        v.column_mut(2).fill(1.0);
        let phi = vec![PI / 2.; n];
        let out = scatter_3d(v.view(), &phi, &mut rng);
        let mean_x = out.column(0).sum() / n as f64;
        let mean_y = out.column(1).sum() / n as f64;
        assert!(mean_x.abs() < 0.05, "mean x = {mean_x}");
        assert!(mean_y.abs() < 0.05, "mean y = {mean_y}");
    }
}
