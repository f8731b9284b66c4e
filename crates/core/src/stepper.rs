//! Per-slab driver for the forcing and projection stages
//!
//! A time step calls, in order:
//!
//! 1. [`SubdomainStepper::forcing_applied`] - zero and fill the applied forces
//! 2. [`SubdomainStepper::forcing_induced`] - zero and fill the induced forces,
//!    then fringe forcing when that treatment is selected
//! 3. the external pressure solve
//! 4. [`SubdomainStepper::project`] - interior update, fringe blending when that
//!    treatment is selected, halo exchange, edge conditions
//!
//! Every slab of a decomposition must make the same sequence of calls, because
//! `project` blocks in the halo exchange until its neighbours arrive.

use crate::config::LesConfig;
use crate::decomposition::{HaloExchange, SyncDirection};
use crate::error::{ForcingError, ForcingResult};
use crate::forcing::{
    AppliedForcing, ForceAccumulators, ForceProvider, InducedForcing, ProviderContext,
};
use crate::grid::{GridDims, PressureGradient, VelocityField};
use crate::inflow::{FringeStage, FringeStrategy, FringeWindow, InflowPlaneReader};
use crate::projection::Projection;
use tracing::{debug, info, warn};

/// Collects providers and the inflow source before validation
pub struct StepperBuilder {
    config: LesConfig,
    applied: AppliedForcing,
    primary: Option<Box<dyn ForceProvider>>,
    correction: Option<Box<dyn ForceProvider>>,
    reader: Option<Box<dyn InflowPlaneReader>>,
}

impl StepperBuilder {
    /// Start a builder for `config`
    #[must_use]
    pub fn new(config: LesConfig) -> Self {
        Self {
            config,
            applied: AppliedForcing::new(),
            primary: None,
            correction: None,
            reader: None,
        }
    }

    /// Register an applied-force provider; providers run in registration order
    #[must_use]
    pub fn applied(mut self, provider: impl ForceProvider + 'static) -> Self {
        self.applied.register(Box::new(provider));
        self
    }

    /// Set the primary induced-force provider
    #[must_use]
    pub fn induced(mut self, provider: impl ForceProvider + 'static) -> Self {
        self.primary = Some(Box::new(provider));
        self
    }

    /// Set the correction that runs after the primary induced provider
    #[must_use]
    pub fn correction(mut self, provider: impl ForceProvider + 'static) -> Self {
        self.correction = Some(Box::new(provider));
        self
    }

    /// Attach the plane source for file-replay inflow
    #[must_use]
    pub fn inflow_reader(mut self, reader: impl InflowPlaneReader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    /// Validate everything and create the stepper
    ///
    /// # Errors
    ///
    /// - [`ForcingError::InvalidConfig`] / [`ForcingError::DegenerateFringe`]
    ///   from [`LesConfig::validate`]
    /// - [`ForcingError::Decomposition`] if `halo` sits at a different position
    ///   than the configuration
    /// - [`ForcingError::InvalidConfig`] for a correction without primary, or an
    ///   inflow reader that does not match the inflow mode
    pub fn build<H: HaloExchange>(self, halo: H) -> ForcingResult<SubdomainStepper<H>> {
        let Self {
            config,
            applied,
            primary,
            correction,
            reader,
        } = self;

        config.validate()?;
        if halo.position() != config.position {
            return Err(ForcingError::Decomposition(format!(
                "halo exchange is at rank {}/{} but the slab is configured as rank {}/{}",
                halo.position().rank,
                halo.position().nproc,
                config.position.rank,
                config.position.nproc
            )));
        }

        let induced = InducedForcing::new(primary, correction)?;
        let fringe = FringeStrategy::from_config(&config, reader)?;
        let projection = Projection::from_config(&config);
        let ownership = projection.ownership();

        info!(
            "Slab {}/{} ready: {}x{}x{} planes, owns bottom={} top={}, fringe stage {:?}",
            config.position.rank,
            config.position.nproc,
            config.grid.nx,
            config.grid.ny,
            config.grid.nz,
            ownership.bottom,
            ownership.top,
            fringe.stage()
        );
        if let Some(window) = fringe.window() {
            debug!(
                "Fringe window start={} exit={} interior={} cells",
                window.start(),
                window.exit(),
                window.interior_len()
            );
        }
        if applied.is_empty() && induced.is_empty() && fringe.stage().is_none() {
            warn!("No force providers and no inflow: forcing stages only zero the accumulators");
        }

        Ok(SubdomainStepper {
            forces: ForceAccumulators::new(config.grid),
            config,
            applied,
            induced,
            fringe,
            projection,
            halo,
            step: 0,
        })
    }
}

/// Forcing and projection for one vertical slab
pub struct SubdomainStepper<H: HaloExchange> {
    config: LesConfig,
    forces: ForceAccumulators,
    applied: AppliedForcing,
    induced: InducedForcing,
    fringe: FringeStrategy,
    projection: Projection,
    halo: H,
    step: u64,
}

impl<H: HaloExchange> SubdomainStepper<H> {
    /// Slab configuration
    #[must_use]
    pub fn config(&self) -> &LesConfig {
        &self.config
    }

    /// Applied and induced force triples from the latest forcing stages
    #[must_use]
    pub fn forces(&self) -> &ForceAccumulators {
        &self.forces
    }

    /// Fringe geometry, when inflow is enabled
    #[must_use]
    pub fn fringe_window(&self) -> Option<&FringeWindow> {
        self.fringe.window()
    }

    /// Projection parameters
    #[must_use]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Completed projections
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    fn check_dims(&self, what: &'static str, dims: GridDims) -> ForcingResult<()> {
        let expected = self.config.grid;
        if dims == expected {
            Ok(())
        } else {
            Err(ForcingError::ShapeMismatch {
                what,
                expected: expected.len(),
                actual: dims.len(),
            })
        }
    }

    fn check_velocity(&self, vel: &VelocityField) -> ForcingResult<()> {
        self.check_dims("u", vel.u.dims())?;
        self.check_dims("v", vel.v.dims())?;
        self.check_dims("w", vel.w.dims())
    }

    fn context<'a>(&self, vel: &'a VelocityField) -> ProviderContext<'a> {
        ProviderContext {
            velocity: vel,
            dt: self.config.dt,
            step: self.step,
            dims: self.config.grid,
        }
    }

    /// Zero the applied forces and run the applied providers
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::ShapeMismatch`] for a velocity of the wrong
    /// shape; provider errors are propagated unchanged.
    pub fn forcing_applied(&mut self, vel: &VelocityField) -> ForcingResult<()> {
        self.check_velocity(vel)?;
        let ctx = self.context(vel);
        self.applied.run(&ctx, &mut self.forces.applied)
    }

    /// Zero the induced forces, run the induced providers, then fringe forcing
    ///
    /// With the forcing treatment the exit plane of `vel` is overwritten with
    /// the inflow velocity, and the fringe interior force replaces whatever
    /// the providers wrote there.
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::ShapeMismatch`] for a velocity of the wrong
    /// shape; provider and inflow source errors are propagated unchanged.
    pub fn forcing_induced(&mut self, vel: &mut VelocityField) -> ForcingResult<()> {
        self.check_velocity(vel)?;
        let ctx = self.context(vel);
        self.induced.run(&ctx, &mut self.forces.induced)?;
        self.fringe
            .run(FringeStage::InducedForcing, vel, &mut self.forces.induced)?;
        Ok(())
    }

    /// Advance velocity with the pressure gradient and the accumulated forces
    ///
    /// Runs the interior update, direct fringe blending when selected, a
    /// down-up halo exchange of `u, v, w`, and finally the top and bottom
    /// edge conditions on the owning slabs.
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::ShapeMismatch`] for inputs of the wrong shape,
    /// and propagates inflow source and halo exchange errors.
    pub fn project(&mut self, vel: &mut VelocityField, dp: &PressureGradient) -> ForcingResult<()> {
        self.check_velocity(vel)?;
        self.check_dims("dpdx", dp.dpdx.dims())?;
        self.check_dims("dpdy", dp.dpdy.dims())?;
        self.check_dims("dpdz", dp.dpdz.dims())?;

        self.projection.advance_interior(vel, dp, &self.forces);
        self.fringe
            .run(FringeStage::PostProjection, vel, &mut self.forces.induced)?;
        for field in vel.components_mut() {
            self.halo.exchange(field, SyncDirection::DownUp)?;
        }
        self.projection.apply_edge_conditions(vel);

        self.step += 1;
        debug!(
            "Slab {} projected step {}",
            self.config.position.rank, self.step
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FringeTreatment, InflowConfig, InflowMode};
    use crate::decomposition::{SerialHalo, SlabPosition};
    use crate::forcing::{SolidMaskForcing, UniformBodyForce};
    use approx::assert_relative_eq;

    fn config() -> LesConfig {
        LesConfig {
            grid: GridDims::new(8, 4, 5),
            l_x: 1.0,
            dt: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_applied_forces_reach_projection() {
        let cfg = config();
        let mut stepper = StepperBuilder::new(cfg.clone())
            .applied(UniformBodyForce::streamwise(2.0))
            .build(SerialHalo)
            .expect("valid stepper");

        let mut vel = VelocityField::uniform(cfg.grid, 1.0);
        let dp = PressureGradient::new(cfg.grid);
        stepper.forcing_applied(&vel).expect("applied");
        stepper.forcing_induced(&mut vel).expect("induced");
        stepper.project(&mut vel, &dp).expect("project");

        assert_relative_eq!(vel.u.get(3, 2, 2), 1.2, epsilon = 1e-12);
        // Stress-free top copies the plane below
        assert_relative_eq!(vel.u.get(3, 2, cfg.grid.nz), 1.2, epsilon = 1e-12);
        assert_eq!(stepper.step(), 1);
    }

    #[test]
    fn test_forces_reset_each_step() {
        let cfg = config();
        let mut stepper = StepperBuilder::new(cfg.clone())
            .induced(SolidMaskForcing::from_fn(cfg.grid, [0.0; 3], |i, _, _| i == 0))
            .build(SerialHalo)
            .expect("valid stepper");

        let mut vel = VelocityField::uniform(cfg.grid, 1.0);
        stepper.forcing_induced(&mut vel).expect("induced");
        assert_relative_eq!(stepper.forces().induced.x.get(0, 1, 2), -10.0);

        vel.u.fill(0.0);
        stepper.forcing_induced(&mut vel).expect("induced");
        assert!(stepper.forces().induced.is_zero());
    }

    #[test]
    fn test_solid_cells_reach_target_after_projection() {
        let cfg = config();
        let mut stepper = StepperBuilder::new(cfg.clone())
            .induced(SolidMaskForcing::from_fn(cfg.grid, [0.0; 3], |i, _, _| i == 2))
            .build(SerialHalo)
            .expect("valid stepper");

        let mut vel = VelocityField::uniform(cfg.grid, 1.5);
        stepper.forcing_applied(&vel).expect("applied");
        stepper.forcing_induced(&mut vel).expect("induced");
        stepper
            .project(&mut vel, &PressureGradient::new(cfg.grid))
            .expect("project");

        for k in 1..cfg.grid.nz {
            assert_relative_eq!(vel.u.get(2, 0, k), 0.0, epsilon = 1e-12);
            assert_eq!(vel.u.get(3, 0, k), 1.5);
        }
    }

    #[test]
    fn test_halo_position_must_match() {
        let cfg = LesConfig {
            position: SlabPosition { rank: 1, nproc: 2 },
            ..config()
        };
        let result = StepperBuilder::new(cfg).build(SerialHalo);
        assert!(matches!(result, Err(ForcingError::Decomposition(_))));
    }

    #[test]
    fn test_file_replay_without_reader_rejected() {
        let cfg = LesConfig {
            inflow: Some(InflowConfig {
                mode: InflowMode::FileReplay,
                treatment: FringeTreatment::Forcing,
                fringe_region_end: 1.0,
                fringe_region_len: 0.5,
            }),
            ..config()
        };
        let result = StepperBuilder::new(cfg).build(SerialHalo);
        assert!(matches!(result, Err(ForcingError::InvalidConfig { .. })));
    }

    #[test]
    fn test_correction_without_primary_rejected() {
        let result = StepperBuilder::new(config())
            .correction(UniformBodyForce::streamwise(1.0))
            .build(SerialHalo);
        assert!(matches!(result, Err(ForcingError::InvalidConfig { .. })));
    }

    #[test]
    fn test_wrong_velocity_shape_rejected() {
        let mut stepper = StepperBuilder::new(config())
            .build(SerialHalo)
            .expect("valid stepper");
        let vel = VelocityField::new(GridDims::new(4, 4, 5));
        let err = stepper.forcing_applied(&vel).expect_err("shape mismatch");
        assert!(matches!(err, ForcingError::ShapeMismatch { what: "u", .. }));
    }
}
