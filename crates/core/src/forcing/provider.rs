//! Force provider capability and the accumulators providers write into

use crate::error::ForcingResult;
use crate::grid::{ForceTriple, GridDims, VelocityField};

/// Read-only state handed to every provider call
#[derive(Debug, Clone, Copy)]
pub struct ProviderContext<'a> {
    /// Current velocity on the slab
    pub velocity: &'a VelocityField,
    /// Time step
    pub dt: f64,
    /// Number of completed projections
    pub step: u64,
    /// Local grid extents
    pub dims: GridDims,
}

/// External body-force model (actuator lines, turbines, immersed boundaries)
///
/// Providers contribute into a force triple that has already been zeroed for
/// this step. They may add or overwrite; the pipeline never combines their
/// results any other way.
pub trait ForceProvider: Send {
    /// Short name used in logs and error reports
    fn name(&self) -> &str;

    /// Write this provider's contribution into `forces`
    ///
    /// # Errors
    ///
    /// Any error is propagated to the caller of the forcing stage unchanged.
    fn apply(&mut self, ctx: &ProviderContext<'_>, forces: &mut ForceTriple) -> ForcingResult<()>;
}

/// The two force triples consumed by the projection
#[derive(Debug, Clone, PartialEq)]
pub struct ForceAccumulators {
    /// Applied forces `(fxa, fya, fza)`
    pub applied: ForceTriple,
    /// Induced forces `(fx, fy, fz)`
    pub induced: ForceTriple,
}

impl ForceAccumulators {
    /// Zero accumulators for a slab
    #[must_use]
    pub fn new(dims: GridDims) -> Self {
        Self {
            applied: ForceTriple::new(dims),
            induced: ForceTriple::new(dims),
        }
    }

    /// Grid extents of both triples
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.applied.dims()
    }
}
