//! C ABI for the LES forcing and projection core
//!
//! One `LesFlowInstance` drives one slab. A host step is
//!
//! ```c
//! lesflow_write_field(les, U, u, len);            /* ... V, W */
//! lesflow_forcing_applied(les);
//! lesflow_forcing_induced(les);
//! lesflow_write_field(les, Dpdx, dpdx, len);      /* ... Dpdy, Dpdz */
//! lesflow_project(les);
//! lesflow_read_field(les, U, u, len);
//! ```
//!
//! Every function returns a `LesFlowErrorCode`; details of the last failure on
//! the calling thread are available from `lesflow_get_last_error`.

mod callbacks;
mod config;
mod error;
mod fields;
mod helpers;
mod instance;

pub use callbacks::{
    LesFlowCallbacks, LesFlowForceFn, LesFlowHaloFn, LesFlowInflowFn, LesFlowSyncDirection,
};
pub use config::{lesflow_config_default, LesFlowConfig};
pub use error::{lesflow_get_last_error, lesflow_get_last_error_code, LesFlowErrorCode};
pub use fields::{lesflow_field_len, lesflow_read_field, lesflow_write_field, LesFlowField};
pub use instance::{
    lesflow_destroy, lesflow_forcing_applied, lesflow_forcing_induced, lesflow_new,
    lesflow_project, lesflow_step_count, LesFlowInstance,
};
