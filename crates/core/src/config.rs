//! Configuration for the forcing and projection stage
//!
//! `LesConfig` carries everything a slab needs to run `forcing_applied`,
//! `forcing_induced` and `project`. Inflow options are expressed as enums so a
//! well-typed config can never select two exit-plane sources or two fringe
//! treatments at once; callers that only have boolean switches go through
//! [`InflowFlags`], which rejects conflicting or missing selections.

use crate::decomposition::SlabPosition;
use crate::error::{ForcingError, ForcingResult};
use crate::grid::GridDims;
use crate::inflow::FringeWindow;
use serde::{Deserialize, Serialize};

/// Second-order Adams–Bashforth weight on the current time level
pub const DEFAULT_TADV1: f64 = 1.5;

/// Where the exit-plane velocity of the fringe comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflowMode {
    /// Replay planes recorded from a precursor simulation
    FileReplay,
    /// Copy the plane at `sample_fraction` of the domain length
    SampledPlane {
        /// Streamwise position of the sampling plane, as a fraction of `l_x`
        sample_fraction: f64,
    },
    /// `u = face_avg`, `v = w = 0`
    Uniform,
}

/// How the fringe interior is driven toward the exit-plane velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FringeTreatment {
    /// Write a relaxation force into the induced-force triple
    Forcing,
    /// Overwrite velocity with a raised-cosine blend after projection
    DirectBlend,
}

/// Inflow/fringe options, present only when inflow is enabled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflowConfig {
    /// Exit-plane source
    pub mode: InflowMode,
    /// Fringe interior treatment
    pub treatment: FringeTreatment,
    /// Streamwise position of the fringe exit plane, fraction of `l_x`
    pub fringe_region_end: f64,
    /// Fringe length, fraction of `l_x`
    pub fringe_region_len: f64,
}

impl Default for InflowConfig {
    fn default() -> Self {
        Self {
            mode: InflowMode::Uniform,
            treatment: FringeTreatment::Forcing,
            fringe_region_end: 1.0,
            fringe_region_len: 0.25,
        }
    }
}

/// Complete configuration of one slab
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LesConfig {
    /// Local grid extents
    pub grid: GridDims,
    /// Streamwise domain length
    pub l_x: f64,
    /// Time step
    pub dt: f64,
    /// Time-advancement weight on the pressure gradient
    pub tadv1: f64,
    /// Face-averaged inflow speed, also used for a fixed top velocity
    pub face_avg: f64,
    /// Fix `u, v` at the top boundary when inflow is enabled
    pub fixed_top_bottom: bool,
    /// Position of this slab in the vertical decomposition
    pub position: SlabPosition,
    /// Inflow/fringe options; `None` disables inflow enforcement
    pub inflow: Option<InflowConfig>,
}

impl Default for LesConfig {
    fn default() -> Self {
        Self {
            grid: GridDims::default(),
            l_x: 2.0 * std::f64::consts::PI,
            dt: 2.0e-4,
            tadv1: DEFAULT_TADV1,
            face_avg: 1.0,
            fixed_top_bottom: false,
            position: SlabPosition::serial(),
            inflow: None,
        }
    }
}

impl LesConfig {
    /// Streamwise grid spacing, `l_x / nx`
    #[must_use]
    pub fn dx(&self) -> f64 {
        self.l_x / self.grid.nx as f64
    }

    /// True when inflow enforcement is enabled
    #[must_use]
    pub fn inflow_enabled(&self) -> bool {
        self.inflow.is_some()
    }

    /// Check every option before the first step
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::InvalidConfig`] for out-of-range scalars and
    /// [`ForcingError::DegenerateFringe`] when the fringe fractions collapse the
    /// window.
    pub fn validate(&self) -> ForcingResult<()> {
        if self.grid.nx == 0 {
            return Err(ForcingError::config("nx", "must be positive"));
        }
        if self.grid.ny == 0 {
            return Err(ForcingError::config("ny", "must be positive"));
        }
        if self.grid.nz < 2 {
            return Err(ForcingError::config(
                "nz",
                format!("must be at least 2, got {}", self.grid.nz),
            ));
        }
        positive("l_x", self.l_x)?;
        positive("dt", self.dt)?;
        finite("tadv1", self.tadv1)?;
        finite("face_avg", self.face_avg)?;
        self.position.validate()?;

        if let Some(inflow) = &self.inflow {
            finite("fringe_region_end", inflow.fringe_region_end)?;
            representable("fringe_region_end", inflow.fringe_region_end, self.grid.nx)?;
            if !(inflow.fringe_region_len > 0.0 && inflow.fringe_region_len <= 1.0) {
                return Err(ForcingError::config(
                    "fringe_region_len",
                    format!("must be in (0, 1], got {}", inflow.fringe_region_len),
                ));
            }
            if let InflowMode::SampledPlane { sample_fraction } = inflow.mode {
                finite("sample_fraction", sample_fraction)?;
                representable("sample_fraction", sample_fraction, self.grid.nx)?;
            }
            FringeWindow::new(inflow, self.grid.nx, self.l_x)?;
        }

        Ok(())
    }
}

fn finite(param: &'static str, value: f64) -> ForcingResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ForcingError::config(param, format!("must be finite, got {value}")))
    }
}

/// Reject streamwise fractions whose grid index `fraction * nx + 1` leaves `i64`
fn representable(param: &'static str, fraction: f64, nx: usize) -> ForcingResult<()> {
    let scaled = fraction * nx as f64 + 1.0;
    if scaled > i64::MIN as f64 && scaled < i64::MAX as f64 {
        Ok(())
    } else {
        Err(ForcingError::config(
            param,
            format!("{fraction} of {nx} cells is outside the index range"),
        ))
    }
}

fn positive(param: &'static str, value: f64) -> ForcingResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ForcingError::config(
            param,
            format!("must be finite and positive, got {value}"),
        ))
    }
}

/// Boolean inflow switches as exposed by flag-based front ends
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct InflowFlags {
    /// Master inflow switch
    pub inflow: bool,
    /// Exit plane from recorded precursor planes
    pub read_inflow_file: bool,
    /// Exit plane copied from a sampling plane
    pub sample_plane: bool,
    /// Exit plane set to the face-average speed
    pub uniform_inflow: bool,
    /// Fringe driven by induced forcing
    pub use_fringe_forcing: bool,
    /// Fringe driven by direct velocity blending
    pub use_direct_blend: bool,
    /// Fringe exit position, fraction of `l_x`
    pub fringe_region_end: f64,
    /// Fringe length, fraction of `l_x`
    pub fringe_region_len: f64,
    /// Sampling plane position, fraction of `l_x`
    pub sample_fraction: f64,
}

impl InflowFlags {
    /// Convert to the typed inflow configuration
    ///
    /// Returns `Ok(None)` when inflow is switched off.
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::InvalidConfig`] when inflow is on and either no
    /// exit-plane source or more than one is selected, or when the fringe
    /// treatment is missing or ambiguous.
    pub fn into_config(self) -> ForcingResult<Option<InflowConfig>> {
        if !self.inflow {
            return Ok(None);
        }

        let selected = [self.read_inflow_file, self.sample_plane, self.uniform_inflow]
            .iter()
            .filter(|&&f| f)
            .count();
        let mode = match selected {
            0 => {
                return Err(ForcingError::config(
                    "inflow_mode",
                    "inflow is enabled but no inflow mode is selected",
                ))
            }
            1 if self.read_inflow_file => InflowMode::FileReplay,
            1 if self.sample_plane => InflowMode::SampledPlane {
                sample_fraction: self.sample_fraction,
            },
            1 => InflowMode::Uniform,
            _ => {
                return Err(ForcingError::config(
                    "inflow_mode",
                    format!("exactly one inflow mode may be selected, got {selected}"),
                ))
            }
        };

        let treatment = match (self.use_fringe_forcing, self.use_direct_blend) {
            (true, false) => FringeTreatment::Forcing,
            (false, true) => FringeTreatment::DirectBlend,
            (true, true) => {
                return Err(ForcingError::config(
                    "fringe_treatment",
                    "fringe forcing and direct blending are mutually exclusive",
                ))
            }
            (false, false) => {
                return Err(ForcingError::config(
                    "fringe_treatment",
                    "inflow is enabled but no fringe treatment is selected",
                ))
            }
        };

        Ok(Some(InflowConfig {
            mode,
            treatment,
            fringe_region_end: self.fringe_region_end,
            fringe_region_len: self.fringe_region_len,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_flags() -> InflowFlags {
        InflowFlags {
            inflow: true,
            uniform_inflow: true,
            use_fringe_forcing: true,
            fringe_region_end: 1.0,
            fringe_region_len: 0.25,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(LesConfig::default().validate().is_ok());
    }

    #[test]
    fn test_dx_from_domain_length() {
        let config = LesConfig {
            grid: GridDims::new(8, 4, 4),
            l_x: 4.0,
            ..Default::default()
        };
        assert_eq!(config.dx(), 0.5);
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        let config = LesConfig {
            dt: 0.0,
            ..Default::default()
        };
        let err = config.validate().expect_err("dt=0 must be rejected");
        assert!(matches!(err, ForcingError::InvalidConfig { param: "dt", .. }));
    }

    #[test]
    fn test_rejects_single_plane_slab() {
        let config = LesConfig {
            grid: GridDims::new(8, 8, 1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_fringe_length_out_of_range() {
        let config = LesConfig {
            inflow: Some(InflowConfig {
                fringe_region_len: 0.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = config.validate().expect_err("zero-length fringe");
        assert!(matches!(
            err,
            ForcingError::InvalidConfig {
                param: "fringe_region_len",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_collapsed_fringe_window() {
        // 0.05 * 8 cells leaves no interior index between start and exit
        let config = LesConfig {
            grid: GridDims::new(8, 4, 4),
            inflow: Some(InflowConfig {
                fringe_region_len: 0.05,
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = config.validate().expect_err("collapsed fringe");
        assert!(matches!(err, ForcingError::DegenerateFringe { .. }));
    }

    #[test]
    fn test_rejects_fractions_beyond_index_range() {
        let sampled = LesConfig {
            grid: GridDims::new(8, 4, 4),
            inflow: Some(InflowConfig {
                mode: InflowMode::SampledPlane {
                    sample_fraction: -1e300,
                },
                fringe_region_len: 0.5,
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = sampled.validate().expect_err("sample plane out of range");
        assert!(matches!(
            err,
            ForcingError::InvalidConfig {
                param: "sample_fraction",
                ..
            }
        ));

        let far_exit = LesConfig {
            grid: GridDims::new(8, 4, 4),
            inflow: Some(InflowConfig {
                fringe_region_end: 1e300,
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = far_exit.validate().expect_err("fringe exit out of range");
        assert!(matches!(
            err,
            ForcingError::InvalidConfig {
                param: "fringe_region_end",
                ..
            }
        ));
    }

    #[test]
    fn test_flags_disabled_inflow() {
        let flags = InflowFlags::default();
        assert_eq!(flags.into_config(), Ok(None));
    }

    #[test]
    fn test_flags_uniform_forcing() {
        let inflow = uniform_flags()
            .into_config()
            .expect("valid flags")
            .expect("inflow enabled");
        assert_eq!(inflow.mode, InflowMode::Uniform);
        assert_eq!(inflow.treatment, FringeTreatment::Forcing);
    }

    #[test]
    fn test_flags_sampled_plane_carries_fraction() {
        let flags = InflowFlags {
            uniform_inflow: false,
            sample_plane: true,
            sample_fraction: 0.5,
            ..uniform_flags()
        };
        let inflow = flags.into_config().expect("valid").expect("enabled");
        assert_eq!(
            inflow.mode,
            InflowMode::SampledPlane {
                sample_fraction: 0.5
            }
        );
    }

    #[test]
    fn test_flags_reject_missing_mode() {
        let flags = InflowFlags {
            uniform_inflow: false,
            ..uniform_flags()
        };
        assert!(flags.into_config().is_err());
    }

    #[test]
    fn test_flags_reject_two_modes() {
        let flags = InflowFlags {
            read_inflow_file: true,
            ..uniform_flags()
        };
        assert!(flags.into_config().is_err());
    }

    #[test]
    fn test_flags_reject_both_treatments() {
        let flags = InflowFlags {
            use_direct_blend: true,
            ..uniform_flags()
        };
        let err = flags.into_config().expect_err("conflicting treatments");
        assert!(matches!(
            err,
            ForcingError::InvalidConfig {
                param: "fringe_treatment",
                ..
            }
        ));
    }

    #[test]
    fn test_flags_reject_missing_treatment() {
        let flags = InflowFlags {
            use_fringe_forcing: false,
            ..uniform_flags()
        };
        assert!(flags.into_config().is_err());
    }
}
