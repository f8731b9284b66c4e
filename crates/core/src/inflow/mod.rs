//! Inflow enforcement through a streamwise fringe region

pub mod blend;
pub mod enforcement;
pub mod source;
pub mod window;

pub use blend::blend;
pub use enforcement::{FringeStage, FringeStrategy, InflowEnforcement};
pub use source::{InflowPlane, InflowPlaneReader, PrecursorRecord};
pub use window::FringeWindow;
