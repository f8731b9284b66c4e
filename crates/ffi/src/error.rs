use lesflow_core::ForcingError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for errors crossing the FFI boundary.
///
/// - `code()` - the code returned to the caller
/// - `msg()` - the message stored for `lesflow_get_last_error`
pub(crate) trait LesFlowError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> LesFlowErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `LesFlowError` for FFI-level failures and
/// errors raised by the core crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultLesFlowError {
    code: LesFlowErrorCode,
    msg: String,
}

impl DefaultLesFlowError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: LesFlowErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    ///
    /// # Arguments
    /// * `lock_name` - The name of the lock that was poisoned
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: LesFlowErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for an invalid call argument.
    ///
    /// # Arguments
    /// * `message` - Description of the error
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: LesFlowErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl From<ForcingError> for DefaultLesFlowError {
    fn from(error: ForcingError) -> Self {
        let code = match &error {
            ForcingError::InvalidConfig { .. } => LesFlowErrorCode::InvalidConfig,
            ForcingError::DegenerateFringe { .. } => LesFlowErrorCode::DegenerateFringe,
            ForcingError::Decomposition(_) => LesFlowErrorCode::Decomposition,
            ForcingError::ShapeMismatch { .. } => LesFlowErrorCode::ShapeMismatch,
            ForcingError::Provider { .. } => LesFlowErrorCode::ProviderFailure,
            ForcingError::InflowSource(_) => LesFlowErrorCode::InflowSource,
            ForcingError::HaloExchange { .. } => LesFlowErrorCode::HaloExchange,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl LesFlowError for DefaultLesFlowError {
    fn code(&self) -> LesFlowErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by `lesflow_*` functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LesFlowErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function.
    InvalidParameter = 3,

    /// Configuration values are out of range or inconsistent.
    InvalidConfig = 4,

    /// The fringe window has no interior cells.
    DegenerateFringe = 5,

    /// Vertical decomposition does not fit the slab configuration.
    Decomposition = 6,

    /// An array does not match the local grid.
    ShapeMismatch = 7,

    /// A force provider callback reported failure.
    ProviderFailure = 8,

    /// The inflow plane callback reported failure.
    InflowSource = 9,

    /// The halo exchange callback reported failure.
    HaloExchange = 10,
}

impl From<DefaultLesFlowError> for LesFlowErrorCode {
    fn from(error: DefaultLesFlowError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored to keep the pointer returned to C alive.
    static LAST_ERROR: RefCell<(Option<CString>, LesFlowErrorCode)> = const { RefCell::new((None, LesFlowErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, LesFlowErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, LesFlowErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if the last call on this thread failed.
/// - `null` if the last call succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next `lesflow_*` call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// if (lesflow_project(les) != Ok) {
///     const char* error = lesflow_get_last_error();
///     if (error) {
///         fprintf(stderr, "projection failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn lesflow_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code on this thread.
#[no_mangle]
pub extern "C" fn lesflow_get_last_error_code() -> LesFlowErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
