//! Periodic wraparound of streamwise indices

/// Wrap a 1-based index into `1..=n` using `((index - 1) mod n) + 1`
///
/// Valid for any sign of `index`, so fringe windows may run past either end of
/// the periodic domain.
///
/// # Panics
///
/// Panics if `n` is zero
#[inline]
#[must_use]
pub fn wrap_index(index: i64, n: usize) -> usize {
    assert!(n > 0, "wrap extent must be positive");
    let n = n as i64;
    // Reduce first so `index - 1` cannot overflow at `i64::MIN`
    ((index.rem_euclid(n) + n - 1) % n + 1) as usize
}

/// 1-based index of a fractional streamwise position, `floor(fraction * n + 1)`
///
/// The result is not wrapped and may fall outside `1..=n`.
#[inline]
#[must_use]
pub fn fraction_to_index(fraction: f64, n: usize) -> i64 {
    (fraction * n as f64 + 1.0).floor() as i64
}
