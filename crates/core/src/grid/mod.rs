//! Slab-local grid storage

pub mod components;
pub mod field;
pub mod wrap;

// Re-export main types
pub use components::*;
pub use field::*;
pub use wrap::*;
