pub mod intersection;
pub mod rotation;

/// Geometric precision
const EPS: f64 = 1e-13;
