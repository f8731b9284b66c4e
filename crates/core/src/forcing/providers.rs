//! Built-in force providers

use super::provider::{ForceProvider, ProviderContext};
use crate::error::{ForcingError, ForcingResult};
use crate::grid::{ForceTriple, GridDims};
use serde::{Deserialize, Serialize};

/// Constant body force, e.g. the mean pressure gradient driving a channel flow
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UniformBodyForce {
    /// Streamwise force per unit mass
    pub fx: f64,
    /// Spanwise force per unit mass
    pub fy: f64,
    /// Vertical force per unit mass
    pub fz: f64,
}

impl UniformBodyForce {
    /// Streamwise-only body force
    #[must_use]
    pub const fn streamwise(fx: f64) -> Self {
        Self {
            fx,
            fy: 0.0,
            fz: 0.0,
        }
    }
}

impl ForceProvider for UniformBodyForce {
    fn name(&self) -> &str {
        "uniform_body_force"
    }

    fn apply(&mut self, _ctx: &ProviderContext<'_>, forces: &mut ForceTriple) -> ForcingResult<()> {
        let components = [
            (&mut forces.x, self.fx),
            (&mut forces.y, self.fy),
            (&mut forces.z, self.fz),
        ];
        for (field, value) in components {
            if value != 0.0 {
                field.as_mut_slice().iter_mut().for_each(|f| *f += value);
            }
        }
        Ok(())
    }
}

/// Direct-forcing immersed boundary over a solid mask
///
/// Inside solid cells the induced force is set to `(target - u) / dt`, so the
/// following projection step lands the cell on the target velocity when the
/// pressure gradient vanishes there.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidMaskForcing {
    dims: GridDims,
    solid: Vec<bool>,
    target: [f64; 3],
}

impl SolidMaskForcing {
    /// Build from a mask laid out like [`crate::grid::Field3`] storage
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::ShapeMismatch`] if `solid.len() != dims.len()`.
    pub fn new(dims: GridDims, solid: Vec<bool>, target: [f64; 3]) -> ForcingResult<Self> {
        if solid.len() != dims.len() {
            return Err(ForcingError::ShapeMismatch {
                what: "solid mask",
                expected: dims.len(),
                actual: solid.len(),
            });
        }
        Ok(Self {
            dims,
            solid,
            target,
        })
    }

    /// Build by evaluating `is_solid(i, j, k)` over every stored cell
    #[must_use]
    pub fn from_fn(
        dims: GridDims,
        target: [f64; 3],
        mut is_solid: impl FnMut(usize, usize, usize) -> bool,
    ) -> Self {
        let mut solid = Vec::with_capacity(dims.len());
        for k in 0..dims.stored_planes() {
            for j in 0..dims.ny {
                for i in 0..dims.nx {
                    solid.push(is_solid(i, j, k));
                }
            }
        }
        Self {
            dims,
            solid,
            target,
        }
    }

    /// Number of solid cells
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.solid.iter().filter(|&&s| s).count()
    }
}

impl ForceProvider for SolidMaskForcing {
    fn name(&self) -> &str {
        "solid_mask"
    }

    fn apply(&mut self, ctx: &ProviderContext<'_>, forces: &mut ForceTriple) -> ForcingResult<()> {
        if ctx.dims != self.dims {
            return Err(ForcingError::ShapeMismatch {
                what: "solid mask",
                expected: ctx.dims.len(),
                actual: self.solid.len(),
            });
        }
        let inv_dt = 1.0 / ctx.dt;
        let vel = ctx.velocity;
        let pairs = [
            (&mut forces.x, &vel.u, self.target[0]),
            (&mut forces.y, &vel.v, self.target[1]),
            (&mut forces.z, &vel.w, self.target[2]),
        ];
        for (force, velocity, target) in pairs {
            let force = force.as_mut_slice();
            let velocity = velocity.as_slice();
            for (idx, &solid) in self.solid.iter().enumerate() {
                if solid {
                    force[idx] = (target - velocity[idx]) * inv_dt;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VelocityField;
    use approx::assert_relative_eq;

    fn dims() -> GridDims {
        GridDims::new(4, 2, 3)
    }

    #[test]
    fn test_uniform_body_force_adds_everywhere() {
        let vel = VelocityField::new(dims());
        let ctx = ProviderContext {
            velocity: &vel,
            dt: 0.1,
            step: 0,
            dims: dims(),
        };
        let mut forces = ForceTriple::new(dims());
        forces.x.fill(1.0);

        UniformBodyForce::streamwise(0.25).apply(&ctx, &mut forces).expect("apply");
        assert!(forces.x.as_slice().iter().all(|&f| f == 1.25));
        assert_eq!(forces.y.max_abs(), 0.0);
    }

    #[test]
    fn test_solid_mask_drives_to_target() {
        let mut vel = VelocityField::uniform(dims(), 2.0);
        vel.w.fill(0.5);
        let ctx = ProviderContext {
            velocity: &vel,
            dt: 0.5,
            step: 3,
            dims: dims(),
        };
        let mut mask = SolidMaskForcing::from_fn(dims(), [0.0; 3], |i, _, k| i == 1 && k <= 1);
        let mut forces = ForceTriple::new(dims());

        mask.apply(&ctx, &mut forces).expect("apply");
        assert_eq!(mask.solid_count(), 2 * 2);
        assert_relative_eq!(forces.x.get(1, 0, 1), -4.0);
        assert_relative_eq!(forces.z.get(1, 1, 0), -1.0);
        assert_eq!(forces.x.get(2, 0, 1), 0.0);
    }

    #[test]
    fn test_mask_shape_checked() {
        let err = SolidMaskForcing::new(dims(), vec![false; 3], [0.0; 3]).expect_err("short mask");
        assert_eq!(
            err,
            ForcingError::ShapeMismatch {
                what: "solid mask",
                expected: dims().len(),
                actual: 3
            }
        );

        let mut mask = SolidMaskForcing::from_fn(dims(), [0.0; 3], |_, _, _| false);
        let other = GridDims::new(8, 2, 3);
        let vel = VelocityField::new(other);
        let ctx = ProviderContext {
            velocity: &vel,
            dt: 0.1,
            step: 0,
            dims: other,
        };
        let mut forces = ForceTriple::new(other);
        assert!(mask.apply(&ctx, &mut forces).is_err());
    }
}
