//! Vertical slab decomposition and ghost-plane exchange

pub mod halo;
pub mod slab;

pub use halo::{slab_chain, ChannelHalo, HaloExchange, SerialHalo, SyncDirection};
pub use slab::{decompose_z, BoundaryOwnership, SlabExtent, SlabPosition};
