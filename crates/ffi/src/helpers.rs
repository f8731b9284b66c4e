use crate::error::{with_last_error_mut, DefaultLesFlowError, LesFlowError, LesFlowErrorCode};
use crate::instance::{InstanceState, LesFlowInstance};
use std::ffi::CString;

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl LesFlowError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl LesFlowError) -> LesFlowErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = LesFlowErrorCode::Ok;
    });
}

/// Record the outcome of a fallible call and return the matching code.
pub(crate) fn track_result<E>(result: Result<(), E>) -> LesFlowErrorCode
where
    E: LesFlowError,
{
    match result {
        Ok(()) => {
            clear_last_error();
            LesFlowErrorCode::Ok
        }
        Err(error) => track_error(&error),
    }
}

/// Lock the instance behind `ptr` and run `f` on its state.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `lesflow_new`.
pub(crate) unsafe fn with_instance<F>(ptr: *const LesFlowInstance, f: F) -> LesFlowErrorCode
where
    F: FnOnce(&mut InstanceState) -> Result<(), DefaultLesFlowError>,
{
    if ptr.is_null() {
        return track_error(&DefaultLesFlowError::null_pointer("instance"));
    }
    // SAFETY: non-null and, per the contract above, created by `lesflow_new`.
    let instance = unsafe { &*ptr };
    let Ok(mut state) = instance.state.lock() else {
        return track_error(&DefaultLesFlowError::lock_poisoned("Mutex"));
    };
    track_result(f(&mut state))
}
