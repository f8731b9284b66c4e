//! Inflow enforcement across the fringe region
//!
//! Each application first fixes the exit-plane velocity from the configured
//! source, then drives the fringe interior toward it, either with a relaxation
//! force written into the induced-force triple or by blending velocity directly.
//! The treatment is chosen once, as a [`FringeStrategy`], and dispatched from a
//! single place so both treatments can never run in the same step.

use super::source::{InflowPlane, InflowPlaneReader};
use super::window::FringeWindow;
use crate::config::{FringeTreatment, InflowConfig, InflowMode, LesConfig};
use crate::error::{ForcingError, ForcingResult};
use crate::grid::{Field3, ForceTriple, VelocityField};
use tracing::debug;

/// Exit-plane source plus fringe geometry for one slab
pub struct InflowEnforcement {
    window: FringeWindow,
    mode: InflowMode,
    face_avg: f64,
    dt: f64,
    reader: Option<Box<dyn InflowPlaneReader>>,
    plane: InflowPlane,
}

impl InflowEnforcement {
    /// Build the enforcement for `inflow` on the slab described by `config`
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::DegenerateFringe`] for a collapsed window and
    /// [`ForcingError::InvalidConfig`] when file replay is selected without a
    /// reader, or a reader is supplied for another mode.
    pub fn new(
        config: &LesConfig,
        inflow: &InflowConfig,
        reader: Option<Box<dyn InflowPlaneReader>>,
    ) -> ForcingResult<Self> {
        let window = FringeWindow::new(inflow, config.grid.nx, config.l_x)?;

        match (inflow.mode, reader.is_some()) {
            (InflowMode::FileReplay, false) => {
                return Err(ForcingError::config(
                    "inflow_mode",
                    "file replay inflow requires an inflow plane reader",
                ))
            }
            (InflowMode::SampledPlane { .. } | InflowMode::Uniform, true) => {
                return Err(ForcingError::config(
                    "inflow_mode",
                    "an inflow plane reader was supplied but file replay is not selected",
                ))
            }
            _ => {}
        }

        Ok(Self {
            window,
            mode: inflow.mode,
            face_avg: config.face_avg,
            dt: config.dt,
            reader,
            plane: InflowPlane::new(config.grid.ny, config.grid.nz),
        })
    }

    /// Fringe geometry
    #[must_use]
    pub fn window(&self) -> &FringeWindow {
        &self.window
    }

    /// Write the prescribed velocity into the exit plane
    ///
    /// # Errors
    ///
    /// Propagates reader failures unchanged.
    pub fn set_exit_plane(&mut self, vel: &mut VelocityField) -> ForcingResult<()> {
        let ie = self.window.exit() - 1;
        let dims = vel.dims();

        match self.mode {
            InflowMode::FileReplay => {
                let reader = self.reader.as_mut().ok_or_else(|| {
                    ForcingError::InflowSource("no inflow plane reader attached".to_string())
                })?;
                reader.read_plane(&mut self.plane)?;
                self.plane.check_shape(dims.ny, dims.nz)?;
                for k in 1..=dims.nz {
                    for j in 0..dims.ny {
                        let off = self.plane.offset(j, k);
                        vel.u.set(ie, j, k, self.plane.u[off]);
                        vel.v.set(ie, j, k, self.plane.v[off]);
                        vel.w.set(ie, j, k, self.plane.w[off]);
                    }
                }
            }
            InflowMode::SampledPlane { .. } => {
                let is = self.window.sample().ok_or_else(|| {
                    ForcingError::config("sample_fraction", "sampling plane is not defined")
                })? - 1;
                for field in vel.components_mut() {
                    copy_column(field, is, ie);
                }
            }
            InflowMode::Uniform => {
                for k in 1..=dims.nz {
                    for j in 0..dims.ny {
                        vel.u.set(ie, j, k, self.face_avg);
                        vel.v.set(ie, j, k, 0.0);
                        vel.w.set(ie, j, k, 0.0);
                    }
                }
            }
        }
        Ok(())
    }

    /// Overwrite the induced force in the fringe interior with a relaxation
    /// toward the exit-plane velocity
    ///
    /// `f = (blend(x1) - blend(x2)) / dt * (U_exit - U)`, so an explicit Euler
    /// step with this force moves the cell to the exit value where the weight
    /// reaches one.
    pub fn apply_forcing(&self, vel: &VelocityField, induced: &mut ForceTriple) {
        let ie = self.window.exit() - 1;
        for (i, iw) in self.window.interior() {
            let rate = self.window.forcing_weight(i) / self.dt;
            let ii = iw - 1;
            relax_column(&vel.u, &mut induced.x, ii, ie, rate);
            relax_column(&vel.v, &mut induced.y, ii, ie, rate);
            relax_column(&vel.w, &mut induced.z, ii, ie, rate);
        }
    }

    /// Replace fringe interior velocity by a raised-cosine interpolation between
    /// the fringe-start and exit-plane velocity
    pub fn apply_direct_blend(&self, vel: &mut VelocityField) {
        let is = self.window.start() - 1;
        let ie = self.window.exit() - 1;
        for (i, iw) in self.window.interior() {
            let factor = self.window.blend_factor(i);
            for field in vel.components_mut() {
                blend_column(field, iw - 1, is, ie, factor);
            }
        }
    }
}

/// Copy streamwise column `src` into column `dst` over planes `1..=nz`
fn copy_column(field: &mut Field3, src: usize, dst: usize) {
    let dims = field.dims();
    for k in 1..=dims.nz {
        for j in 0..dims.ny {
            let value = field.get(src, j, k);
            field.set(dst, j, k, value);
        }
    }
}

fn relax_column(vel: &Field3, force: &mut Field3, i: usize, exit: usize, rate: f64) {
    let dims = vel.dims();
    for k in 1..=dims.nz {
        for j in 0..dims.ny {
            force.set(i, j, k, rate * (vel.get(exit, j, k) - vel.get(i, j, k)));
        }
    }
}

fn blend_column(field: &mut Field3, i: usize, start: usize, exit: usize, factor: f64) {
    let dims = field.dims();
    for k in 1..=dims.nz {
        for j in 0..dims.ny {
            let from = field.get(start, j, k);
            let to = field.get(exit, j, k);
            field.set(i, j, k, from + factor * (to - from));
        }
    }
}

/// Point in the step at which a fringe treatment may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FringeStage {
    /// After the induced-force providers, inside `forcing_induced`
    InducedForcing,
    /// After the interior velocity update, inside `project`
    PostProjection,
}

/// Fringe treatment selected once at configuration time
pub enum FringeStrategy {
    /// Inflow enforcement is off
    Disabled,
    /// Relaxation force written during `forcing_induced`
    Forcing(InflowEnforcement),
    /// Velocity blend applied during `project`
    DirectBlend(InflowEnforcement),
}

impl FringeStrategy {
    /// Select the strategy for `config`
    ///
    /// # Errors
    ///
    /// See [`InflowEnforcement::new`]; also rejects a reader when inflow is off.
    pub fn from_config(
        config: &LesConfig,
        reader: Option<Box<dyn InflowPlaneReader>>,
    ) -> ForcingResult<Self> {
        let Some(inflow) = &config.inflow else {
            if reader.is_some() {
                return Err(ForcingError::config(
                    "inflow",
                    "an inflow plane reader was supplied but inflow is disabled",
                ));
            }
            return Ok(Self::Disabled);
        };

        let enforcement = InflowEnforcement::new(config, inflow, reader)?;
        Ok(match inflow.treatment {
            FringeTreatment::Forcing => Self::Forcing(enforcement),
            FringeTreatment::DirectBlend => Self::DirectBlend(enforcement),
        })
    }

    /// Stage at which this strategy acts, if any
    #[must_use]
    pub fn stage(&self) -> Option<FringeStage> {
        match self {
            Self::Disabled => None,
            Self::Forcing(_) => Some(FringeStage::InducedForcing),
            Self::DirectBlend(_) => Some(FringeStage::PostProjection),
        }
    }

    /// Fringe geometry, when inflow is enabled
    #[must_use]
    pub fn window(&self) -> Option<&FringeWindow> {
        match self {
            Self::Disabled => None,
            Self::Forcing(e) | Self::DirectBlend(e) => Some(e.window()),
        }
    }

    /// Run the strategy if it belongs to `stage`; returns whether it ran
    ///
    /// # Errors
    ///
    /// Propagates inflow source failures.
    pub fn run(
        &mut self,
        stage: FringeStage,
        vel: &mut VelocityField,
        induced: &mut ForceTriple,
    ) -> ForcingResult<bool> {
        match (self, stage) {
            (Self::Forcing(enforcement), FringeStage::InducedForcing) => {
                enforcement.set_exit_plane(vel)?;
                enforcement.apply_forcing(vel, induced);
                debug!(
                    "fringe forcing applied over {} columns",
                    enforcement.window().interior_len()
                );
                Ok(true)
            }
            (Self::DirectBlend(enforcement), FringeStage::PostProjection) => {
                enforcement.set_exit_plane(vel)?;
                enforcement.apply_direct_blend(vel);
                debug!(
                    "fringe velocity blended over {} columns",
                    enforcement.window().interior_len()
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
