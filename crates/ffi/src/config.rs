use lesflow_core::{
    ForcingResult, FringeTreatment, GridDims, InflowConfig, InflowFlags, InflowMode, LesConfig,
    SlabPosition,
};

/// C-compatible slab configuration.
///
/// Inflow options use the boolean switch surface; exactly one of
/// `read_inflow_file`, `sample_plane`, `uniform_inflow` and exactly one of
/// `use_fringe_forcing`, `use_direct_blend` must be set when `inflow` is true.
/// Obtain a populated value from `lesflow_config_default` and edit it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct LesFlowConfig {
    /// Streamwise cell count
    pub nx: usize,
    /// Spanwise cell count
    pub ny: usize,
    /// Local top-plane index; fields hold `nx * ny * (nz + 1)` values
    pub nz: usize,
    /// Streamwise domain length
    pub l_x: f64,
    /// Time step
    pub dt: f64,
    /// Time-advancement weight on the pressure gradient
    pub tadv1: f64,
    /// Face-averaged inflow speed
    pub face_avg: f64,
    /// Fix `u, v` at the top plane when inflow is enabled
    pub fixed_top_bottom: bool,
    /// Rank of this slab, counted from the bottom
    pub rank: usize,
    /// Number of slabs
    pub nproc: usize,
    /// Master inflow switch
    pub inflow: bool,
    /// Exit plane from the `read_inflow_plane` callback
    pub read_inflow_file: bool,
    /// Exit plane copied from the sampling plane
    pub sample_plane: bool,
    /// Exit plane set to `face_avg`
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

impl LesFlowConfig {
    /// Convert to the core configuration.
    ///
    /// # Errors
    ///
    /// Propagates conflicting or missing inflow selections.
    pub(crate) fn to_core(self) -> ForcingResult<LesConfig> {
        let flags = InflowFlags {
            inflow: self.inflow,
            read_inflow_file: self.read_inflow_file,
            sample_plane: self.sample_plane,
            uniform_inflow: self.uniform_inflow,
            use_fringe_forcing: self.use_fringe_forcing,
            use_direct_blend: self.use_direct_blend,
            fringe_region_end: self.fringe_region_end,
            fringe_region_len: self.fringe_region_len,
            sample_fraction: self.sample_fraction,
        };
        Ok(LesConfig {
            grid: GridDims::new(self.nx, self.ny, self.nz),
            l_x: self.l_x,
            dt: self.dt,
            tadv1: self.tadv1,
            face_avg: self.face_avg,
            fixed_top_bottom: self.fixed_top_bottom,
            position: SlabPosition {
                rank: self.rank,
                nproc: self.nproc,
            },
            inflow: flags.into_config()?,
        })
    }
}

impl From<&LesConfig> for LesFlowConfig {
    fn from(config: &LesConfig) -> Self {
        let fringe = config.inflow.unwrap_or_default();
        let (sample_plane, sample_fraction) = match fringe.mode {
            InflowMode::SampledPlane { sample_fraction } => (true, sample_fraction),
            InflowMode::FileReplay | InflowMode::Uniform => (false, 0.0),
        };
        Self {
            nx: config.grid.nx,
            ny: config.grid.ny,
            nz: config.grid.nz,
            l_x: config.l_x,
            dt: config.dt,
            tadv1: config.tadv1,
            face_avg: config.face_avg,
            fixed_top_bottom: config.fixed_top_bottom,
            rank: config.position.rank,
            nproc: config.position.nproc,
            inflow: config.inflow_enabled(),
            read_inflow_file: fringe.mode == InflowMode::FileReplay,
            sample_plane,
            uniform_inflow: fringe.mode == InflowMode::Uniform,
            use_fringe_forcing: fringe.treatment == FringeTreatment::Forcing,
            use_direct_blend: fringe.treatment == FringeTreatment::DirectBlend,
            fringe_region_end: fringe.fringe_region_end,
            fringe_region_len: fringe.fringe_region_len,
            sample_fraction,
        }
    }
}

/// Default slab configuration: serial, inflow off, uniform-inflow forcing
/// preselected for when `inflow` is switched on.
#[no_mangle]
pub extern "C" fn lesflow_config_default() -> LesFlowConfig {
    let config = LesConfig {
        inflow: Some(InflowConfig::default()),
        ..Default::default()
    };
    let mut ffi = LesFlowConfig::from(&config);
    ffi.inflow = false;
    ffi
}
