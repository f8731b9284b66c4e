//! LES Forcing and Projection Core
//!
//! Per-slab body-force accumulation, inflow enforcement through a streamwise
//! fringe region, and the explicit velocity projection of a pseudo-spectral
//! large-eddy simulation whose vertical direction is split into slabs.
//!
//! ## Step sequence
//!
//! - `forcing_applied`: zero the applied forces, run actuator-style providers
//! - `forcing_induced`: zero the induced forces, run the immersed-boundary
//!   provider and its correction, then fringe forcing
//! - external pressure solve
//! - `project`: interior update, fringe blending, halo exchange, edge conditions
//!
//! [`SubdomainStepper`] runs the sequence for one slab. Slabs on separate
//! threads are coupled with [`ChannelHalo`] endpoints from [`slab_chain`].

// Configuration and errors
pub mod config;
pub mod error;

// Storage and decomposition
pub mod decomposition;
pub mod grid;

// Stages
pub mod forcing;
pub mod inflow;
pub mod projection;
pub mod stepper;

pub use config::{FringeTreatment, InflowConfig, InflowFlags, InflowMode, LesConfig};
pub use decomposition::{
    decompose_z, slab_chain, BoundaryOwnership, ChannelHalo, HaloExchange, SerialHalo,
    SlabExtent, SlabPosition, SyncDirection,
};
pub use error::{ForcingError, ForcingResult};
pub use forcing::{
    ForceAccumulators, ForceProvider, ProviderContext, SolidMaskForcing, UniformBodyForce,
};
pub use grid::{Field3, ForceTriple, GridDims, PressureGradient, VelocityField};
pub use inflow::{blend, FringeWindow, InflowPlane, InflowPlaneReader, PrecursorRecord};
pub use projection::{Projection, TopBoundary};
pub use stepper::{StepperBuilder, SubdomainStepper};
