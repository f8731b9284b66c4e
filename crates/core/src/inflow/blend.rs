//! Compactly supported smooth step used to ramp fringe forcing

/// Smooth 0→1 step with all derivatives vanishing at both ends
///
/// ```text
/// blend(x) = 0                                  x <= 0
///          = 1 / (1 + exp(1/(x - 1) + 1/x))     0 < x < 1
///          = 1                                  x >= 1
/// ```
#[inline]
#[must_use]
pub fn blend(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else if x >= 1.0 {
        1.0
    } else {
        1.0 / (1.0 + (1.0 / (x - 1.0) + 1.0 / x).exp())
    }
}
