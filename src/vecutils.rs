//! Slice utility functions like norm(), mean(), interp_bracket()

/// Euclidean norm of a slice.
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Locates `x` inside the non-decreasing sequence `xp`.
///
/// Returns `(k, frac)` such that the linear interpolant at `x` is
/// `fp[k] + frac * (fp[k + 1] - fp[k])`. The last knot is returned as
/// `(len - 2, 1.0)`. Returns `None` when `x` lies outside `[xp[0], xp[len-1]]`,
/// when `xp` has fewer than two knots and `x != xp[0]`, or when `x` is NaN.
pub fn interp_bracket(xp: &[f64], x: f64) -> Option<(usize, f64)> {
    let n = xp.len();
    if n == 0 || x.is_nan() {
        return None;
    }
    if n == 1 {
        return if x == xp[0] { Some((0, 0.0)) } else { None };
    }
    if x < xp[0] || x > xp[n - 1] {
        return None;
    }

    // First knot strictly greater than x
    let upper = xp.partition_point(|&v| v <= x);
    if upper >= n {
        return Some((n - 2, 1.0));
    }
    let k = upper.saturating_sub(1);
    let span = xp[k + 1] - xp[k];
    let frac = if span > 0.0 { (x - xp[k]) / span } else { 0.0 };
    Some((k, frac))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm() {
        assert!((norm(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert_eq!(norm(&[]), 0.0);
    }

    #[test]
    fn test_mean() {
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_interp_bracket_inside() {
        let xp = [0.0, 1.0, 3.0];
        let (k, frac) = interp_bracket(&xp, 2.0).unwrap();
        assert_eq!(k, 1);
        assert!((frac - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_interp_bracket_edges() {
        let xp = [0.0, 1.0, 3.0];
        assert_eq!(interp_bracket(&xp, 0.0), Some((0, 0.0)));
        assert_eq!(interp_bracket(&xp, 3.0), Some((1, 1.0)));
        assert!(interp_bracket(&xp, -0.1).is_none());
        assert!(interp_bracket(&xp, 3.1).is_none());
        assert!(interp_bracket(&xp, f64::NAN).is_none());
    }

    #[test]
    fn test_interp_bracket_repeated_knots() {
        let xp = [0.0, 1.0, 1.0, 2.0];
        let (k, frac) = interp_bracket(&xp, 1.0).unwrap();
        assert_eq!(k, 2);
        assert!(frac.abs() < 1e-12);
    }
}
