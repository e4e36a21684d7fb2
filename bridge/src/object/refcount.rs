//! Reference lifecycle management for foreign objects
//!
//! `ForeignRef` attributes exactly one CPython strong reference to exactly
//! one host-side owner. The lifecycle states from the design are realized
//! structurally rather than checked at runtime:
//!
//! - *unbound*: a raw `*mut pyo3_ffi::PyObject` freshly returned by the C
//!   API, not yet claimed;
//! - *owned*: a `ForeignRef` exists (`from_owned` steals the count,
//!   `clone_ref` takes an additional one for a second owner);
//! - *released*: `Drop` ran and decremented exactly once.
//!
//! Move semantics make double-release and use-after-release unrepresentable;
//! `into_raw` is the only way back to an unbound pointer, for handing the
//! count to a reference-stealing C API.

use std::ptr::NonNull;

use pyo3_ffi as ffi;

use crate::runtime::{self, Gil};

/// Owning handle to one strong reference on one interpreter object
#[derive(Debug)]
pub(crate) struct ForeignRef {
    ptr: NonNull<ffi::PyObject>,
}

impl ForeignRef {
    /// Claim a strong reference the C API just produced (steals it).
    ///
    /// Returns `None` for NULL, which in the C API signals a pending
    /// exception that the caller must translate.
    ///
    /// # Safety
    ///
    /// `ptr` must be NULL or a strong reference the caller is entitled to
    /// transfer, and the GIL must be held.
    pub(crate) unsafe fn from_owned(ptr: *mut ffi::PyObject) -> Option<ForeignRef> {
        NonNull::new(ptr).map(|ptr| ForeignRef { ptr })
    }

    /// Raw pointer for C API calls that borrow the reference
    pub(crate) fn as_ptr(&self) -> *mut ffi::PyObject {
        self.ptr.as_ptr()
    }

    /// Transfer the strong count out, for reference-stealing C APIs such as
    /// `PyTuple_SetItem`. The handle is consumed without decrementing.
    pub(crate) fn into_raw(self) -> *mut ffi::PyObject {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// Explicit share: one more strong count, one more independent owner.
    ///
    /// This is the only sanctioned way to get two handles onto one referent;
    /// copying the raw pointer would break the one-count-per-owner ledger.
    pub(crate) fn clone_ref(&self, _py: Gil<'_>) -> ForeignRef {
        unsafe { ffi::Py_IncRef(self.ptr.as_ptr()) };
        ForeignRef { ptr: self.ptr }
    }
}

// All refcount traffic happens under the GIL; the pointer itself carries no
// thread affinity.
unsafe impl Send for ForeignRef {}
unsafe impl Sync for ForeignRef {}

impl Drop for ForeignRef {
    fn drop(&mut self) {
        // The operation mutex is deliberately not taken here. The GIL alone
        // serializes refcount traffic, and PyGILState_Ensure is reentrant,
        // so handles may be dropped from inside an in-flight operation
        // without deadlocking on the mutex. The shared finalization gate is
        // taken instead: `stop` holds it exclusively across Py_FinalizeEx,
        // so the liveness check below stays valid for the whole decrement.
        let _gate = runtime::drop_guard();
        if !runtime::is_live() {
            // The interpreter has been finalized (or never started); its
            // heap is gone, and leaking the count is the only safe option.
            return;
        }
        unsafe {
            let gil = ffi::PyGILState_Ensure();
            ffi::Py_DecRef(self.ptr.as_ptr());
            ffi::PyGILState_Release(gil);
        }
    }
}
