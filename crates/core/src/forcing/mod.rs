//! Body-force stages: applied and induced providers
//!
//! Both stages own a [`ForceTriple`](crate::grid::ForceTriple) inside
//! [`ForceAccumulators`], zero it once, then hand it to providers in a fixed
//! order. Inflow fringe forcing is layered on top of the induced stage by the
//! stepper.

pub mod pipeline;
pub mod provider;
pub mod providers;

pub use pipeline::{AppliedForcing, InducedForcing};
pub use provider::{ForceAccumulators, ForceProvider, ProviderContext};
pub use providers::{SolidMaskForcing, UniformBodyForce};
