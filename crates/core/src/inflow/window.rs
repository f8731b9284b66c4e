//! Fringe window geometry
//!
//! All positions come from fractions of the streamwise domain length through
//! `floor(fraction * nx + 1)` and stay unwrapped here; the wrapped index is
//! produced only when touching storage. A window may therefore run past the
//! periodic boundary without special cases.

use super::blend::blend;
use crate::config::{InflowConfig, InflowMode};
use crate::error::{ForcingError, ForcingResult};
use crate::grid::{fraction_to_index, wrap_index};

/// Streamwise extent of the fringe on an `nx`-cell periodic domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FringeWindow {
    nx: usize,
    /// Unwrapped 1-based fringe start
    start: i64,
    /// Unwrapped 1-based start of the direct-blend plateau
    mid: i64,
    /// Unwrapped 1-based exit plane
    end: i64,
    /// Unwrapped 1-based sampling plane, for sampled-plane inflow
    sample: Option<i64>,
    dx: f64,
    rise_width: f64,
    fall_width: f64,
}

impl FringeWindow {
    /// Derive the window from the inflow configuration
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::DegenerateFringe`] when the window has no cell
    /// strictly between start and exit, or when the plateau does not lie after
    /// the start.
    pub fn new(config: &InflowConfig, nx: usize, l_x: f64) -> ForcingResult<Self> {
        if nx == 0 {
            return Err(ForcingError::config("nx", "must be positive"));
        }
        let end_frac = config.fringe_region_end;
        let len = config.fringe_region_len;

        let end = fraction_to_index(end_frac, nx);
        let mid = fraction_to_index(end_frac - len / 4.0, nx);
        let start = fraction_to_index(end_frac - len, nx);

        if end - start < 2 || mid <= start || mid > end {
            return Err(ForcingError::DegenerateFringe { start, mid, end });
        }

        let sample = match config.mode {
            InflowMode::SampledPlane { sample_fraction } => {
                Some(fraction_to_index(sample_fraction, nx))
            }
            InflowMode::FileReplay | InflowMode::Uniform => None,
        };

        Ok(Self {
            nx,
            start,
            mid,
            end,
            sample,
            dx: l_x / nx as f64,
            rise_width: 0.5 * len * l_x,
            fall_width: 0.125 * len * l_x,
        })
    }

    /// Wrapped 1-based fringe start
    #[must_use]
    pub fn start(&self) -> usize {
        wrap_index(self.start, self.nx)
    }

    /// Wrapped 1-based exit plane
    #[must_use]
    pub fn exit(&self) -> usize {
        wrap_index(self.end, self.nx)
    }

    /// Wrapped 1-based sampling plane, if the inflow mode samples one
    #[must_use]
    pub fn sample(&self) -> Option<usize> {
        self.sample.map(|i| wrap_index(i, self.nx))
    }

    /// Interior indices strictly between start and exit as `(unwrapped, wrapped)`
    pub fn interior(&self) -> impl Iterator<Item = (i64, usize)> + '_ {
        (self.start + 1..self.end).map(|i| (i, wrap_index(i, self.nx)))
    }

    /// Number of interior cells
    #[must_use]
    pub fn interior_len(&self) -> usize {
        (self.end - self.start - 1) as usize
    }

    /// Relaxation weight `blend(x1) - blend(x2)` at unwrapped index `i`
    ///
    /// `x1` rises from 0 to 1 over half a fringe length after the start, `x2`
    /// rises over the last eighth before the exit plane.
    #[must_use]
    pub fn forcing_weight(&self, i: i64) -> f64 {
        let x1 = (i - self.start) as f64 * self.dx / self.rise_width;
        let x2 = (i - self.end) as f64 * self.dx / self.fall_width + 1.0;
        blend(x1) - blend(x2)
    }

    /// Raised-cosine interpolation factor at unwrapped index `i`
    #[must_use]
    pub fn blend_factor(&self, i: i64) -> f64 {
        if i >= self.mid {
            1.0
        } else {
            let frac = (i - self.start) as f64 / (self.mid - self.start) as f64;
            0.5 * (1.0 - (std::f64::consts::PI * frac).cos())
        }
    }
}
