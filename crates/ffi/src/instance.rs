use lesflow_core::{
    ForcingResult, PressureGradient, StepperBuilder, SubdomainStepper, VelocityField,
};
use std::ptr;
use std::sync::Mutex;
use tracing::debug;

use crate::callbacks::{CallbackForce, CallbackHalo, CallbackInflow, LesFlowCallbacks, UserData};
use crate::config::LesFlowConfig;
use crate::error::{DefaultLesFlowError, LesFlowErrorCode};
use crate::helpers::{clear_last_error, track_error, with_instance};

/// Mutable state of one slab behind the instance lock.
pub(crate) struct InstanceState {
    pub(crate) stepper: SubdomainStepper<CallbackHalo>,
    pub(crate) velocity: VelocityField,
    pub(crate) pressure: PressureGradient,
}

/// One slab of the LES forcing/projection core.
///
/// Owns the velocity and pressure-gradient arrays; the host writes them with
/// `lesflow_write_field` and reads results with `lesflow_read_field`.
///
/// # Thread Safety
/// All calls lock an internal `Mutex`, so an instance may be shared between
/// threads. Calls on one instance are serialised.
pub struct LesFlowInstance {
    pub(crate) state: Mutex<InstanceState>,
}

impl LesFlowInstance {
    /// Build the slab from a C configuration and optional callbacks.
    ///
    /// # Errors
    ///
    /// Any configuration error reported by the core crate.
    fn new(config: &LesFlowConfig, callbacks: Option<&LesFlowCallbacks>) -> ForcingResult<Self> {
        let core = config.to_core()?;
        let callbacks = callbacks.copied().unwrap_or(LesFlowCallbacks {
            user_data: ptr::null_mut(),
            applied_force: None,
            induced_force: None,
            induced_correction: None,
            read_inflow_plane: None,
            halo_exchange: None,
        });
        let user_data = UserData::new(callbacks.user_data);

        let mut builder = StepperBuilder::new(core.clone());
        if let Some(provider) =
            CallbackForce::from_option("applied_force", callbacks.applied_force, user_data)
        {
            builder = builder.applied(provider);
        }
        if let Some(provider) =
            CallbackForce::from_option("induced_force", callbacks.induced_force, user_data)
        {
            builder = builder.induced(provider);
        }
        if let Some(provider) = CallbackForce::from_option(
            "induced_correction",
            callbacks.induced_correction,
            user_data,
        ) {
            builder = builder.correction(provider);
        }
        if let Some(reader) = CallbackInflow::from_option(callbacks.read_inflow_plane, user_data) {
            builder = builder.inflow_reader(reader);
        }

        let halo = CallbackHalo::new(core.position, callbacks.halo_exchange, user_data)?;
        let stepper = builder.build(halo)?;

        Ok(Self {
            state: Mutex::new(InstanceState {
                stepper,
                velocity: VelocityField::new(core.grid),
                pressure: PressureGradient::new(core.grid),
            }),
        })
    }
}

/// Create a slab instance and return it via out-parameter.
///
/// Returns
/// - `Ok` - `out_instance` holds the new instance
/// - `NullPointer` - `config` or `out_instance` is null
/// - `InvalidConfig`, `DegenerateFringe`, `Decomposition` - configuration rejected
///
/// # Safety
///
/// - `config` must point to a valid `LesFlowConfig`.
/// - `callbacks` may be null; otherwise it must point to a valid
///   `LesFlowCallbacks` whose function pointers and `user_data` stay valid until
///   `lesflow_destroy`.
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller owns the instance and MUST call `lesflow_destroy` exactly once.
#[no_mangle]
pub unsafe extern "C" fn lesflow_new(
    config: *const LesFlowConfig,
    callbacks: *const LesFlowCallbacks,
    out_instance: *mut *mut LesFlowInstance,
) -> LesFlowErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultLesFlowError::null_pointer("out_instance"));
    }
    if config.is_null() {
        unsafe {
            *out_instance = ptr::null_mut();
        }
        return track_error(&DefaultLesFlowError::null_pointer("config"));
    }

    // SAFETY: non-null pointers are valid per the contract above.
    let (config, callbacks) = unsafe { (&*config, callbacks.as_ref()) };
    match LesFlowInstance::new(config, callbacks) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(Box::new(instance));
            }
            clear_last_error();
            LesFlowErrorCode::Ok
        }
        Err(error) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            track_error(&DefaultLesFlowError::from(error))
        }
    }
}

/// Destroy an instance previously created by `lesflow_new`.
///
/// Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `lesflow_new` and not freed already.
/// - The caller must not use the pointer again.
#[no_mangle]
pub unsafe extern "C" fn lesflow_destroy(ptr: *mut LesFlowInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: created by `Box::into_raw` in `lesflow_new` and not yet freed.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

/// Zero the applied forces and run the applied force callback.
///
/// # Safety
/// `instance` must be null or a live pointer returned by `lesflow_new`.
#[no_mangle]
pub unsafe extern "C" fn lesflow_forcing_applied(
    instance: *const LesFlowInstance,
) -> LesFlowErrorCode {
    unsafe {
        with_instance(instance, |state| {
            state.stepper.forcing_applied(&state.velocity)?;
            Ok(())
        })
    }
}

/// Zero the induced forces, run the induced callbacks, then fringe forcing.
///
/// # Safety
/// `instance` must be null or a live pointer returned by `lesflow_new`.
#[no_mangle]
pub unsafe extern "C" fn lesflow_forcing_induced(
    instance: *const LesFlowInstance,
) -> LesFlowErrorCode {
    unsafe {
        with_instance(instance, |state| {
            state.stepper.forcing_induced(&mut state.velocity)?;
            Ok(())
        })
    }
}

/// Advance velocity with the stored pressure gradient and forces.
///
/// # Safety
/// `instance` must be null or a live pointer returned by `lesflow_new`.
#[no_mangle]
pub unsafe extern "C" fn lesflow_project(instance: *const LesFlowInstance) -> LesFlowErrorCode {
    unsafe {
        with_instance(instance, |state| {
            state.stepper.project(&mut state.velocity, &state.pressure)?;
            debug!("ffi projection step {}", state.stepper.step());
            Ok(())
        })
    }
}

/// Number of completed projections, or `0` for a null instance.
///
/// # Safety
/// `instance` must be null or a live pointer returned by `lesflow_new`.
#[no_mangle]
pub unsafe extern "C" fn lesflow_step_count(instance: *const LesFlowInstance) -> u64 {
    let mut step = 0;
    unsafe {
        with_instance(instance, |state| {
            step = state.stepper.step();
            Ok(())
        });
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::lesflow_config_default;
    use crate::error::lesflow_get_last_error_code;
    use crate::fields::{lesflow_field_len, lesflow_read_field, lesflow_write_field, LesFlowField};
    use std::os::raw::c_void;
    use std::slice;

    #[allow(clippy::too_many_arguments)]
    unsafe extern "C" fn add_body_force(
        user_data: *mut c_void,
        _u: *const f64,
        _v: *const f64,
        _w: *const f64,
        fx: *mut f64,
        _fy: *mut f64,
        _fz: *mut f64,
        len: usize,
        _dt: f64,
    ) -> i32 {
        let calls = unsafe { &mut *user_data.cast::<u32>() };
        *calls += 1;
        let fx = unsafe { slice::from_raw_parts_mut(fx, len) };
        fx.iter_mut().for_each(|f| *f += 1.0);
        0
    }

    #[allow(clippy::too_many_arguments)]
    unsafe extern "C" fn failing_force(
        _user_data: *mut c_void,
        _u: *const f64,
        _v: *const f64,
        _w: *const f64,
        _fx: *mut f64,
        _fy: *mut f64,
        _fz: *mut f64,
        _len: usize,
        _dt: f64,
    ) -> i32 {
        3
    }

    fn small_config() -> LesFlowConfig {
        let mut config = lesflow_config_default();
        config.nx = 8;
        config.ny = 2;
        config.nz = 4;
        config.l_x = 1.0;
        config.dt = 0.1;
        config
    }

    fn callbacks(user_data: *mut c_void) -> LesFlowCallbacks {
        LesFlowCallbacks {
            user_data,
            applied_force: None,
            induced_force: None,
            induced_correction: None,
            read_inflow_plane: None,
            halo_exchange: None,
        }
    }

    #[test]
    fn test_full_step_through_c_abi() {
        let mut calls: u32 = 0;
        let mut cbs = callbacks(ptr::from_mut(&mut calls).cast());
        cbs.applied_force = Some(add_body_force);
        let config = small_config();

        let mut les: *mut LesFlowInstance = ptr::null_mut();
        unsafe {
            assert_eq!(lesflow_new(&config, &cbs, &mut les), LesFlowErrorCode::Ok);
            let len = lesflow_field_len(les);
            assert_eq!(len, 8 * 2 * 5);

            let u = vec![2.0; len];
            assert_eq!(
                lesflow_write_field(les, LesFlowField::U, u.as_ptr(), len),
                LesFlowErrorCode::Ok
            );
            assert_eq!(lesflow_forcing_applied(les), LesFlowErrorCode::Ok);
            assert_eq!(lesflow_forcing_induced(les), LesFlowErrorCode::Ok);
            assert_eq!(lesflow_project(les), LesFlowErrorCode::Ok);
            assert_eq!(lesflow_step_count(les), 1);

            let mut out = vec![0.0; len];
            assert_eq!(
                lesflow_read_field(les, LesFlowField::U, out.as_mut_ptr(), len),
                LesFlowErrorCode::Ok
            );
            // Plane k = 2, any column: 2 + dt * 1
            assert!((out[2 * 16 + 3] - 2.1).abs() < 1e-12);

            let mut fxa = vec![0.0; len];
            lesflow_read_field(les, LesFlowField::Fxa, fxa.as_mut_ptr(), len);
            assert!(fxa.iter().all(|&f| f == 1.0));
            lesflow_destroy(les);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_callback_failure_reports_provider_code() {
        let mut cbs = callbacks(ptr::null_mut());
        cbs.induced_force = Some(failing_force);
        let config = small_config();

        let mut les: *mut LesFlowInstance = ptr::null_mut();
        unsafe {
            assert_eq!(lesflow_new(&config, &cbs, &mut les), LesFlowErrorCode::Ok);
            assert_eq!(
                lesflow_forcing_induced(les),
                LesFlowErrorCode::ProviderFailure
            );
            assert_eq!(
                lesflow_get_last_error_code(),
                LesFlowErrorCode::ProviderFailure
            );
            assert!(!crate::error::lesflow_get_last_error().is_null());
            lesflow_destroy(les);
        }
    }

    #[test]
    fn test_decomposed_slab_requires_halo_callback() {
        let mut config = small_config();
        config.nproc = 2;
        let mut les: *mut LesFlowInstance = ptr::null_mut();
        let code = unsafe { lesflow_new(&config, ptr::null(), &mut les) };
        assert_eq!(code, LesFlowErrorCode::Decomposition);
        assert!(les.is_null());
    }

    #[test]
    fn test_forces_are_read_only_and_buffers_checked() {
        let config = small_config();
        let mut les: *mut LesFlowInstance = ptr::null_mut();
        unsafe {
            assert_eq!(
                lesflow_new(&config, ptr::null(), &mut les),
                LesFlowErrorCode::Ok
            );
            let data = vec![0.0; 80];
            assert_eq!(
                lesflow_write_field(les, LesFlowField::Fx, data.as_ptr(), 80),
                LesFlowErrorCode::InvalidParameter
            );
            assert_eq!(
                lesflow_write_field(les, LesFlowField::U, data.as_ptr(), 79),
                LesFlowErrorCode::InvalidParameter
            );
            assert_eq!(lesflow_project(ptr::null()), LesFlowErrorCode::NullPointer);
            lesflow_destroy(les);
        }
    }
}
