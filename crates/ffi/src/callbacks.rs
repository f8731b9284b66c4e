//! Host callbacks wrapped as core collaborators
//!
//! Every callback returns `0` on success; any other value is reported as a
//! failure of the matching stage.

use lesflow_core::{
    Field3, ForceProvider, ForceTriple, ForcingError, ForcingResult, HaloExchange, InflowPlane,
    InflowPlaneReader, ProviderContext, SlabPosition, SyncDirection,
};
use std::os::raw::c_void;

/// Force provider callback.
///
/// Reads `u, v, w` and writes `fx, fy, fz`, all of length `len`
/// (`nx * ny * (nz + 1)`, x fastest). The force arrays are already zeroed for
/// this step, except for contributions of earlier providers.
pub type LesFlowForceFn = Option<
    unsafe extern "C" fn(
        user_data: *mut c_void,
        u: *const f64,
        v: *const f64,
        w: *const f64,
        fx: *mut f64,
        fy: *mut f64,
        fz: *mut f64,
        len: usize,
        dt: f64,
    ) -> i32,
>;

/// Inflow plane callback.
///
/// Fills `u, v, w`, each of length `ny * nz`, stored as `(k - 1) * ny + j`.
pub type LesFlowInflowFn = Option<
    unsafe extern "C" fn(
        user_data: *mut c_void,
        u: *mut f64,
        v: *mut f64,
        w: *mut f64,
        len: usize,
    ) -> i32,
>;

/// Halo exchange callback.
///
/// Exchanges boundary planes of `field` (`nx * ny * (nz + 1)` values) in place
/// with the neighbouring slabs, as described by `direction`.
pub type LesFlowHaloFn = Option<
    unsafe extern "C" fn(
        user_data: *mut c_void,
        field: *mut f64,
        nx: usize,
        ny: usize,
        nz: usize,
        direction: LesFlowSyncDirection,
    ) -> i32,
>;

/// Which ghost planes a halo exchange refreshes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LesFlowSyncDirection {
    /// Send plane `1` down, receive plane `nz` from above
    Down = 0,
    /// Send plane `nz - 1` up, receive plane `0` from below
    Up = 1,
    /// Both directions
    DownUp = 2,
}

impl From<SyncDirection> for LesFlowSyncDirection {
    fn from(direction: SyncDirection) -> Self {
        match direction {
            SyncDirection::Down => Self::Down,
            SyncDirection::Up => Self::Up,
            SyncDirection::DownUp => Self::DownUp,
        }
    }
}

/// Host callbacks; any entry may be null.
///
/// `user_data` is passed back unchanged to every callback. The host must keep
/// it valid for the lifetime of the instance and make the callbacks safe to
/// call from whichever thread drives the instance.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LesFlowCallbacks {
    /// Opaque host pointer
    pub user_data: *mut c_void,
    /// Applied force provider (actuator lines, turbines)
    pub applied_force: LesFlowForceFn,
    /// Primary induced force provider (immersed boundary)
    pub induced_force: LesFlowForceFn,
    /// Correction run after `induced_force`
    pub induced_correction: LesFlowForceFn,
    /// Exit-plane source for file-replay inflow
    pub read_inflow_plane: LesFlowInflowFn,
    /// Plane exchange with neighbouring slabs; required when `nproc > 1`
    pub halo_exchange: LesFlowHaloFn,
}

/// Host pointer moved into the stepper.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UserData(*mut c_void);

// SAFETY: the host guarantees `user_data` may be used from the driving thread.
unsafe impl Send for UserData {}

impl UserData {
    pub(crate) fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }
}

/// Force provider backed by a host callback.
pub(crate) struct CallbackForce {
    name: &'static str,
    callback: unsafe extern "C" fn(
        *mut c_void,
        *const f64,
        *const f64,
        *const f64,
        *mut f64,
        *mut f64,
        *mut f64,
        usize,
        f64,
    ) -> i32,
    user_data: UserData,
}

impl CallbackForce {
    pub(crate) fn from_option(
        name: &'static str,
        callback: LesFlowForceFn,
        user_data: UserData,
    ) -> Option<Self> {
        callback.map(|callback| Self {
            name,
            callback,
            user_data,
        })
    }
}

impl ForceProvider for CallbackForce {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&mut self, ctx: &ProviderContext<'_>, forces: &mut ForceTriple) -> ForcingResult<()> {
        let vel = ctx.velocity;
        let len = ctx.dims.len();
        // SAFETY: every array holds `len` values for the lifetime of the call.
        let rc = unsafe {
            (self.callback)(
                self.user_data.0,
                vel.u.as_slice().as_ptr(),
                vel.v.as_slice().as_ptr(),
                vel.w.as_slice().as_ptr(),
                forces.x.as_mut_slice().as_mut_ptr(),
                forces.y.as_mut_slice().as_mut_ptr(),
                forces.z.as_mut_slice().as_mut_ptr(),
                len,
                ctx.dt,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(ForcingError::provider(self.name, format!("callback returned {rc}")))
        }
    }
}

/// Inflow plane source backed by a host callback.
pub(crate) struct CallbackInflow {
    callback: unsafe extern "C" fn(*mut c_void, *mut f64, *mut f64, *mut f64, usize) -> i32,
    user_data: UserData,
}

impl CallbackInflow {
    pub(crate) fn from_option(callback: LesFlowInflowFn, user_data: UserData) -> Option<Self> {
        callback.map(|callback| Self {
            callback,
            user_data,
        })
    }
}

impl InflowPlaneReader for CallbackInflow {
    fn read_plane(&mut self, plane: &mut InflowPlane) -> ForcingResult<()> {
        let len = plane.len();
        // SAFETY: each component holds `len` values for the lifetime of the call.
        let rc = unsafe {
            (self.callback)(
                self.user_data.0,
                plane.u.as_mut_ptr(),
                plane.v.as_mut_ptr(),
                plane.w.as_mut_ptr(),
                len,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(ForcingError::InflowSource(format!(
                "read_inflow_plane callback returned {rc}"
            )))
        }
    }
}

/// Halo exchange delegated to the host, or a no-op for a serial slab.
pub(crate) struct CallbackHalo {
    position: SlabPosition,
    callback: LesFlowHaloFn,
    user_data: UserData,
}

impl CallbackHalo {
    /// # Errors
    ///
    /// A decomposed slab (`nproc > 1`) needs a halo callback.
    pub(crate) fn new(
        position: SlabPosition,
        callback: LesFlowHaloFn,
        user_data: UserData,
    ) -> ForcingResult<Self> {
        if position.nproc > 1 && callback.is_none() {
            return Err(ForcingError::Decomposition(format!(
                "rank {} of {} slabs needs a halo_exchange callback",
                position.rank, position.nproc
            )));
        }
        Ok(Self {
            position,
            callback,
            user_data,
        })
    }
}

impl HaloExchange for CallbackHalo {
    fn position(&self) -> SlabPosition {
        self.position
    }

    fn exchange(&mut self, field: &mut Field3, direction: SyncDirection) -> ForcingResult<()> {
        let Some(callback) = self.callback else {
            return Ok(());
        };
        let dims = field.dims();
        // SAFETY: `field` holds `nx * ny * (nz + 1)` values for the lifetime of the call.
        let rc = unsafe {
            callback(
                self.user_data.0,
                field.as_mut_slice().as_mut_ptr(),
                dims.nx,
                dims.ny,
                dims.nz,
                direction.into(),
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(ForcingError::HaloExchange {
                rank: self.position.rank,
                message: format!("halo_exchange callback returned {rc}"),
            })
        }
    }
}
