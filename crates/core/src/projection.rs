//! Explicit velocity update and vertical edge conditions
//!
//! The interior update is
//!
//! ```text
//! u += dt * (-tadv1 * dpdx + fx + fxa)
//! ```
//!
//! with the same form for `v` and `w`. `u` and `v` are advanced on planes
//! `1..nz`; `w` starts at plane 2 on the slab that owns the bottom wall, where
//! plane 1 is the wall itself. Halo exchange and inflow blending happen between
//! [`Projection::advance_interior`] and [`Projection::apply_edge_conditions`],
//! driven by the stepper.

use crate::config::LesConfig;
use crate::decomposition::BoundaryOwnership;
use crate::forcing::ForceAccumulators;
use crate::grid::{Field3, PressureGradient, VelocityField};
use rayon::prelude::*;

/// Velocity condition on the top plane of the topmost slab
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopBoundary {
    /// `u = u`, `v = 0` on the top plane
    Fixed {
        /// Prescribed streamwise velocity
        u: f64,
    },
    /// Zero vertical gradient: `u, v` copied from the plane below
    StressFree,
}

/// Projection stage for one slab
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    dt: f64,
    tadv1: f64,
    ownership: BoundaryOwnership,
    top: TopBoundary,
}

impl Projection {
    /// Create a projection from explicit parameters
    #[must_use]
    pub fn new(dt: f64, tadv1: f64, ownership: BoundaryOwnership, top: TopBoundary) -> Self {
        Self {
            dt,
            tadv1,
            ownership,
            top,
        }
    }

    /// Derive the projection from a slab configuration
    ///
    /// The top is fixed at `face_avg` only when `fixed_top_bottom` is set and
    /// inflow is enabled; otherwise it is stress-free.
    #[must_use]
    pub fn from_config(config: &LesConfig) -> Self {
        let top = if config.fixed_top_bottom && config.inflow_enabled() {
            TopBoundary::Fixed {
                u: config.face_avg,
            }
        } else {
            TopBoundary::StressFree
        };
        Self::new(config.dt, config.tadv1, config.position.ownership(), top)
    }

    /// Physical boundaries owned by this slab
    #[must_use]
    pub fn ownership(&self) -> BoundaryOwnership {
        self.ownership
    }

    /// Top boundary condition
    #[must_use]
    pub fn top(&self) -> TopBoundary {
        self.top
    }

    /// First plane on which `w` is advanced
    #[must_use]
    pub fn w_start(&self) -> usize {
        if self.ownership.bottom {
            2
        } else {
            1
        }
    }

    /// Advance `u, v, w` with the pressure gradient and both force triples
    ///
    /// Planes are processed in parallel. Ghost and overlap planes are untouched.
    pub fn advance_interior(
        &self,
        vel: &mut VelocityField,
        dp: &PressureGradient,
        forces: &ForceAccumulators,
    ) {
        let nz = vel.dims().nz;
        let step = Step {
            dt: self.dt,
            tadv1: self.tadv1,
        };
        step.advance(
            &mut vel.u,
            &dp.dpdx,
            &forces.induced.x,
            &forces.applied.x,
            1,
            nz,
        );
        step.advance(
            &mut vel.v,
            &dp.dpdy,
            &forces.induced.y,
            &forces.applied.y,
            1,
            nz,
        );
        step.advance(
            &mut vel.w,
            &dp.dpdz,
            &forces.induced.z,
            &forces.applied.z,
            self.w_start(),
            nz,
        );
    }

    /// Enforce the top and bottom conditions on the owning slabs
    pub fn apply_edge_conditions(&self, vel: &mut VelocityField) {
        let nz = vel.dims().nz;

        if self.ownership.top {
            match self.top {
                TopBoundary::Fixed { u } => {
                    vel.u.fill_plane(nz, u);
                    vel.v.fill_plane(nz, 0.0);
                }
                TopBoundary::StressFree => {
                    vel.u.copy_plane(nz - 1, nz);
                    vel.v.copy_plane(nz - 1, nz);
                }
            }
            vel.w.fill_plane(nz, 0.0);
        }

        if self.ownership.bottom {
            vel.w.fill_plane(1, 0.0);
        }
    }
}

#[derive(Clone, Copy)]
struct Step {
    dt: f64,
    tadv1: f64,
}

impl Step {
    /// Advance planes `first..end` of `field`
    fn advance(
        self,
        field: &mut Field3,
        dp: &Field3,
        induced: &Field3,
        applied: &Field3,
        first: usize,
        end: usize,
    ) {
        let plane_len = field.dims().plane_len();
        if plane_len == 0 || first >= end {
            return;
        }
        let (dp, induced, applied) = (dp.as_slice(), induced.as_slice(), applied.as_slice());
        let Step { dt, tadv1 } = self;

        field
            .as_mut_slice()
            .par_chunks_mut(plane_len)
            .enumerate()
            .skip(first)
            .take(end - first)
            .for_each(|(k, layer)| {
                let base = k * plane_len;
                for (idx, value) in layer.iter_mut().enumerate() {
                    let n = base + idx;
                    *value += dt * (-tadv1 * dp[n] + induced[n] + applied[n]);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::SlabPosition;
    use crate::grid::GridDims;
    use approx::assert_relative_eq;

    const DIMS: GridDims = GridDims::new(4, 3, 5);

    fn projection(position: SlabPosition, top: TopBoundary) -> Projection {
        Projection::new(0.1, 1.5, position.ownership(), top)
    }

    fn random_like(dims: GridDims, seed: f64) -> Field3 {
        Field3::from_fn(dims, |i, j, k| seed + (i * 7 + j * 3 + k * 11) as f64 * 0.01)
    }

    #[test]
    fn test_zero_inputs_leave_interior_unchanged() {
        let proj = projection(SlabPosition::serial(), TopBoundary::StressFree);
        let mut vel = VelocityField {
            u: random_like(DIMS, 1.0),
            v: random_like(DIMS, -0.5),
            w: random_like(DIMS, 0.2),
        };
        let before = vel.clone();

        proj.advance_interior(
            &mut vel,
            &PressureGradient::new(DIMS),
            &ForceAccumulators::new(DIMS),
        );
        assert_eq!(vel, before);
    }

    #[test]
    fn test_interior_update_formula() {
        let proj = projection(SlabPosition::serial(), TopBoundary::StressFree);
        let mut vel = VelocityField::uniform(DIMS, 1.0);
        let mut dp = PressureGradient::new(DIMS);
        dp.dpdx.fill(2.0);
        let mut forces = ForceAccumulators::new(DIMS);
        forces.induced.x.fill(0.5);
        forces.applied.x.fill(0.25);

        proj.advance_interior(&mut vel, &dp, &forces);

        // 1 + 0.1 * (-1.5 * 2 + 0.5 + 0.25)
        for k in 1..DIMS.nz {
            assert_relative_eq!(vel.u.get(2, 1, k), 0.775, epsilon = 1e-12);
        }
        assert_eq!(vel.u.get(2, 1, 0), 1.0);
        assert_eq!(vel.u.get(2, 1, DIMS.nz), 1.0);
    }

    #[test]
    fn test_w_skips_wall_plane_on_bottom_slab() {
        let mut dp = PressureGradient::new(DIMS);
        dp.dpdz.fill(-1.0);
        let forces = ForceAccumulators::new(DIMS);

        let bottom = projection(SlabPosition { rank: 0, nproc: 2 }, TopBoundary::StressFree);
        let mut vel = VelocityField::new(DIMS);
        bottom.advance_interior(&mut vel, &dp, &forces);
        assert_eq!(vel.w.get(0, 0, 1), 0.0);
        assert_relative_eq!(vel.w.get(0, 0, 2), 0.15, epsilon = 1e-12);

        let upper = projection(SlabPosition { rank: 1, nproc: 2 }, TopBoundary::StressFree);
        let mut vel = VelocityField::new(DIMS);
        upper.advance_interior(&mut vel, &dp, &forces);
        assert_relative_eq!(vel.w.get(0, 0, 1), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_stress_free_top_copies_plane_below() {
        let proj = projection(SlabPosition::serial(), TopBoundary::StressFree);
        let mut vel = VelocityField {
            u: random_like(DIMS, 1.0),
            v: random_like(DIMS, 0.3),
            w: random_like(DIMS, 0.1),
        };
        proj.apply_edge_conditions(&mut vel);

        let nz = DIMS.nz;
        assert_eq!(vel.u.plane(nz), vel.u.plane(nz - 1));
        assert_eq!(vel.v.plane(nz), vel.v.plane(nz - 1));
        assert!(vel.w.plane(nz).iter().all(|&w| w == 0.0));
        assert!(vel.w.plane(1).iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_fixed_top() {
        let proj = projection(SlabPosition::serial(), TopBoundary::Fixed { u: 4.0 });
        let mut vel = VelocityField::uniform(DIMS, 1.0);
        vel.v.fill(0.5);
        proj.apply_edge_conditions(&mut vel);

        assert!(vel.u.plane(DIMS.nz).iter().all(|&u| u == 4.0));
        assert!(vel.v.plane(DIMS.nz).iter().all(|&v| v == 0.0));
        assert_eq!(vel.u.get(0, 0, DIMS.nz - 1), 1.0);
    }

    #[test]
    fn test_middle_slab_owns_no_edges() {
        let proj = projection(SlabPosition { rank: 1, nproc: 3 }, TopBoundary::StressFree);
        let mut vel = VelocityField::uniform(DIMS, 1.0);
        vel.w.fill(0.7);
        let before = vel.clone();
        proj.apply_edge_conditions(&mut vel);
        assert_eq!(vel, before);
    }

    #[test]
    fn test_fixed_top_requires_inflow() {
        let mut config = LesConfig {
            fixed_top_bottom: true,
            ..Default::default()
        };
        assert_eq!(
            Projection::from_config(&config).top(),
            TopBoundary::StressFree
        );

        config.inflow = Some(crate::config::InflowConfig::default());
        config.face_avg = 8.0;
        assert_eq!(
            Projection::from_config(&config).top(),
            TopBoundary::Fixed { u: 8.0 }
        );
    }
}
