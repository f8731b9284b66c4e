use std::slice;

use lesflow_core::Field3;

use crate::error::{DefaultLesFlowError, LesFlowErrorCode};
use crate::helpers::with_instance;
use crate::instance::{InstanceState, LesFlowInstance};

/// Field selector for `lesflow_read_field` / `lesflow_write_field`.
///
/// Every field holds `nx * ny * (nz + 1)` values, index
/// `k * nx * ny + j * nx + i`. Force fields are read-only.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LesFlowField {
    /// Streamwise velocity
    U = 0,
    /// Spanwise velocity
    V = 1,
    /// Vertical velocity
    W = 2,
    /// Streamwise pressure gradient
    Dpdx = 3,
    /// Spanwise pressure gradient
    Dpdy = 4,
    /// Vertical pressure gradient
    Dpdz = 5,
    /// Induced force, x
    Fx = 6,
    /// Induced force, y
    Fy = 7,
    /// Induced force, z
    Fz = 8,
    /// Applied force, x
    Fxa = 9,
    /// Applied force, y
    Fya = 10,
    /// Applied force, z
    Fza = 11,
}

fn field_ref(state: &InstanceState, which: LesFlowField) -> &Field3 {
    let forces = state.stepper.forces();
    match which {
        LesFlowField::U => &state.velocity.u,
        LesFlowField::V => &state.velocity.v,
        LesFlowField::W => &state.velocity.w,
        LesFlowField::Dpdx => &state.pressure.dpdx,
        LesFlowField::Dpdy => &state.pressure.dpdy,
        LesFlowField::Dpdz => &state.pressure.dpdz,
        LesFlowField::Fx => &forces.induced.x,
        LesFlowField::Fy => &forces.induced.y,
        LesFlowField::Fz => &forces.induced.z,
        LesFlowField::Fxa => &forces.applied.x,
        LesFlowField::Fya => &forces.applied.y,
        LesFlowField::Fza => &forces.applied.z,
    }
}

fn field_mut(
    state: &mut InstanceState,
    which: LesFlowField,
) -> Result<&mut Field3, DefaultLesFlowError> {
    match which {
        LesFlowField::U => Ok(&mut state.velocity.u),
        LesFlowField::V => Ok(&mut state.velocity.v),
        LesFlowField::W => Ok(&mut state.velocity.w),
        LesFlowField::Dpdx => Ok(&mut state.pressure.dpdx),
        LesFlowField::Dpdy => Ok(&mut state.pressure.dpdy),
        LesFlowField::Dpdz => Ok(&mut state.pressure.dpdz),
        other => Err(DefaultLesFlowError::invalid_parameter(format!(
            "field {other:?} is computed by the forcing stages and cannot be written"
        ))),
    }
}

fn check_len(field: &Field3, len: usize) -> Result<(), DefaultLesFlowError> {
    let expected = field.as_slice().len();
    if len == expected {
        Ok(())
    } else {
        Err(DefaultLesFlowError::invalid_parameter(format!(
            "buffer holds {len} values, field needs {expected}"
        )))
    }
}

/// Number of values in every field of the instance, or `0` for null.
///
/// # Safety
/// `instance` must be null or a live pointer returned by `lesflow_new`.
#[no_mangle]
pub unsafe extern "C" fn lesflow_field_len(instance: *const LesFlowInstance) -> usize {
    let mut len = 0;
    unsafe {
        with_instance(instance, |state| {
            len = state.velocity.u.as_slice().len();
            Ok(())
        });
    }
    len
}

/// Copy a field into a caller-owned buffer of `len` values.
///
/// # Safety
/// - `instance` must be null or a live pointer returned by `lesflow_new`.
/// - `out` must be valid for writes of `len` values.
#[no_mangle]
pub unsafe extern "C" fn lesflow_read_field(
    instance: *const LesFlowInstance,
    which: LesFlowField,
    out: *mut f64,
    len: usize,
) -> LesFlowErrorCode {
    unsafe {
        with_instance(instance, |state| {
            if out.is_null() {
                return Err(DefaultLesFlowError::null_pointer("out"));
            }
            let field = field_ref(state, which);
            check_len(field, len)?;
            // SAFETY: non-null and valid for `len` writes per the contract above.
            let out = slice::from_raw_parts_mut(out, len);
            out.copy_from_slice(field.as_slice());
            Ok(())
        })
    }
}

/// Overwrite a velocity or pressure-gradient field from `len` values.
///
/// # Safety
/// - `instance` must be null or a live pointer returned by `lesflow_new`.
/// - `data` must be valid for reads of `len` values.
#[no_mangle]
pub unsafe extern "C" fn lesflow_write_field(
    instance: *const LesFlowInstance,
    which: LesFlowField,
    data: *const f64,
    len: usize,
) -> LesFlowErrorCode {
    unsafe {
        with_instance(instance, |state| {
            if data.is_null() {
                return Err(DefaultLesFlowError::null_pointer("data"));
            }
            let field = field_mut(state, which)?;
            check_len(field, len)?;
            // SAFETY: non-null and valid for `len` reads per the contract above.
            let data = slice::from_raw_parts(data, len);
            field.as_mut_slice().copy_from_slice(data);
            Ok(())
        })
    }
}
