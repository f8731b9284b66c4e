//! Three-component fields: velocity, body forces and the pressure gradient

use super::field::{Field3, GridDims};

/// Resolved velocity `(u, v, w)` on one slab
///
/// Owned by the time-integration loop; the stepper borrows it mutably.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    /// Streamwise component
    pub u: Field3,
    /// Spanwise component
    pub v: Field3,
    /// Vertical component (stored on the w-grid, `k = 1` is the bottom wall)
    pub w: Field3,
}

impl VelocityField {
    /// Zero velocity over the slab
    #[must_use]
    pub fn new(dims: GridDims) -> Self {
        Self {
            u: Field3::new(dims),
            v: Field3::new(dims),
            w: Field3::new(dims),
        }
    }

    /// Uniform streamwise flow `u = speed`, `v = w = 0`
    #[must_use]
    pub fn uniform(dims: GridDims, speed: f64) -> Self {
        Self {
            u: Field3::with_value(dims, speed),
            v: Field3::new(dims),
            w: Field3::new(dims),
        }
    }

    /// Grid extents shared by all three components
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.u.dims()
    }

    /// Components in `(u, v, w)` order
    pub fn components_mut(&mut self) -> [&mut Field3; 3] {
        [&mut self.u, &mut self.v, &mut self.w]
    }
}

/// Body-force triple `(fx, fy, fz)`
///
/// Used for both the applied (actuator-style) and induced (IBM / fringe)
/// contributions. Providers write into it after [`ForceTriple::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForceTriple {
    /// Streamwise force per unit mass
    pub x: Field3,
    /// Spanwise force per unit mass
    pub y: Field3,
    /// Vertical force per unit mass
    pub z: Field3,
}

impl ForceTriple {
    /// Zero forces over the slab
    #[must_use]
    pub fn new(dims: GridDims) -> Self {
        Self {
            x: Field3::new(dims),
            y: Field3::new(dims),
            z: Field3::new(dims),
        }
    }

    /// Zero all three components over every stored plane
    pub fn reset(&mut self) {
        self.x.fill(0.0);
        self.y.fill(0.0);
        self.z.fill(0.0);
    }

    /// Grid extents shared by all three components
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.x.dims()
    }

    /// True when every component is exactly zero everywhere
    #[must_use]
    pub fn is_zero(&self) -> bool {
        [&self.x, &self.y, &self.z]
            .iter()
            .all(|f| f.as_slice().iter().all(|&v| v == 0.0))
    }
}

/// Pressure gradient `(dpdx, dpdy, dpdz)` from the external Poisson solve
#[derive(Debug, Clone, PartialEq)]
pub struct PressureGradient {
    /// Streamwise derivative
    pub dpdx: Field3,
    /// Spanwise derivative
    pub dpdy: Field3,
    /// Vertical derivative (w-grid)
    pub dpdz: Field3,
}

impl PressureGradient {
    /// Zero gradient over the slab
    #[must_use]
    pub fn new(dims: GridDims) -> Self {
        Self {
            dpdx: Field3::new(dims),
            dpdy: Field3::new(dims),
            dpdz: Field3::new(dims),
        }
    }

    /// Grid extents shared by all three components
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.dpdx.dims()
    }
}
