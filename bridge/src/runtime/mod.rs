//! Embedded interpreter lifecycle and serialization point
//!
//! CPython is process-wide state: one interpreter, one reference-count space,
//! one GIL. This module owns that state machine (uninitialized → live → shut
//! down) and funnels every wrapper operation through a single guard so that
//! at most one host-visible operation runs against the interpreter at a time.
//!
//! All operations are synchronous blocking calls; the interpreter offers no
//! cancellation or timeout, so neither does the bridge.

use std::marker::PhantomData;
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard};

use pyo3_ffi as ffi;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::marshal::convert;
use crate::marshal::NativeValue;
use crate::object::refcount::ForeignRef;
use crate::object::PyObject;

const STATE_UNINITIALIZED: u8 = 0;
const STATE_LIVE: u8 = 1;
const STATE_SHUT_DOWN: u8 = 2;

/// Process-wide interpreter state
static STATE: AtomicU8 = AtomicU8::new(STATE_UNINITIALIZED);

/// Thread state saved when the starting thread released the GIL
static MAIN_THREAD_STATE: AtomicPtr<ffi::PyThreadState> = AtomicPtr::new(ptr::null_mut());

/// Serializes host-visible operations against the interpreter
static OP_LOCK: Mutex<()> = Mutex::new(());

/// Gate between wrapper drops and finalization: drops hold it shared while
/// decrementing, `stop` holds it exclusively across `Py_FinalizeEx`. A drop
/// that observed the live state therefore finishes its decrement before the
/// interpreter heap goes away.
static FINALIZE_LOCK: RwLock<()> = RwLock::new(());

/// Proof that the current scope holds the GIL and the operation lock.
///
/// Only `with_gil` (and the lifecycle transitions, which hold both locks by
/// construction) can mint one; code taking `Gil` may touch the C API.
#[derive(Clone, Copy)]
pub(crate) struct Gil<'a> {
    _marker: PhantomData<&'a ()>,
}

impl Gil<'_> {
    fn new() -> Self {
        Gil {
            _marker: PhantomData,
        }
    }
}

/// RAII wrapper around `PyGILState_Ensure`/`PyGILState_Release`
struct GilGuard {
    state: ffi::PyGILState_STATE,
}

impl GilGuard {
    fn acquire() -> Self {
        GilGuard {
            state: unsafe { ffi::PyGILState_Ensure() },
        }
    }
}

impl Drop for GilGuard {
    fn drop(&mut self) {
        unsafe { ffi::PyGILState_Release(self.state) };
    }
}

/// Whether the interpreter is inside its live window.
///
/// Used by `ForeignRef::drop` to decide between a real decrement and a leak.
pub(crate) fn is_live() -> bool {
    STATE.load(Ordering::Acquire) == STATE_LIVE
}

/// Shared side of the finalization gate, for `ForeignRef::drop`.
///
/// While the returned guard lives, `stop` cannot begin finalizing, so a
/// liveness check made under it stays valid for the whole decrement.
pub(crate) fn drop_guard() -> RwLockReadGuard<'static, ()> {
    FINALIZE_LOCK
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run one serialized operation against the live interpreter.
///
/// Checks the lifecycle window, takes the process-wide operation lock, then
/// acquires the GIL for the duration of `f`. Fails fast with
/// `RuntimeNotInitialized` / `RuntimeShutDown` outside the live window.
pub(crate) fn with_gil<R>(
    f: impl FnOnce(Gil<'_>) -> Result<R, BridgeError>,
) -> Result<R, BridgeError> {
    match STATE.load(Ordering::Acquire) {
        STATE_LIVE => {}
        STATE_SHUT_DOWN => return Err(BridgeError::RuntimeShutDown),
        _ => return Err(BridgeError::RuntimeNotInitialized),
    }
    let _serial = OP_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    // stop flips the state and finalizes while holding the operation lock,
    // so an operation that blocked on the lock during shutdown must refuse
    // here rather than touch the finalized interpreter. Only the live →
    // shut-down transition can have happened since the check above.
    if STATE.load(Ordering::Acquire) == STATE_SHUT_DOWN {
        return Err(BridgeError::RuntimeShutDown);
    }
    let _gil = GilGuard::acquire();
    f(Gil::new())
}

/// Handle to the embedded interpreter's live window
///
/// # Example
/// ```no_run
/// use python_bridge_core_rs::{NativeValue, Runtime};
///
/// let runtime = Runtime::start(Vec::<String>::new()).unwrap();
/// let string = runtime.import("string").unwrap();
/// assert!(string.has_attr("ascii_letters").unwrap());
/// ```
#[derive(Debug)]
pub struct Runtime {
    _priv: (),
}

impl Runtime {
    /// Start the embedded interpreter and append `search_paths` to
    /// `sys.path` in order.
    ///
    /// Must happen before any wrapper is constructed. Starting an already
    /// live runtime is an idempotent no-op that still appends the given
    /// paths and returns another handle; reference counts are untouched.
    /// Restarting after `stop` is refused with `RuntimeShutDown` — CPython
    /// does not support reliable re-initialization in one process.
    ///
    /// # Errors
    ///
    /// `RuntimeShutDown` after a previous `stop`; `InvalidName` for a path
    /// containing an interior NUL; `Foreign` if `sys.path` manipulation
    /// raises inside the interpreter.
    pub fn start<I, S>(search_paths: I) -> Result<Runtime, BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _serial = OP_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match STATE.load(Ordering::Acquire) {
            STATE_SHUT_DOWN => return Err(BridgeError::RuntimeShutDown),
            STATE_LIVE => {
                let _gil = GilGuard::acquire();
                append_search_paths(Gil::new(), search_paths)?;
                return Ok(Runtime { _priv: () });
            }
            _ => {}
        }

        unsafe {
            ffi::Py_Initialize();
            // The starting thread holds the GIL here; release it so any
            // thread can take it through PyGILState_Ensure from now on.
            let ts = ffi::PyEval_SaveThread();
            MAIN_THREAD_STATE.store(ts, Ordering::Release);
        }
        STATE.store(STATE_LIVE, Ordering::Release);
        info!("embedded python interpreter started");

        let _gil = GilGuard::acquire();
        append_search_paths(Gil::new(), search_paths)?;
        Ok(Runtime { _priv: () })
    }

    /// Import a Python module and wrap the module object.
    ///
    /// # Errors
    ///
    /// `ModuleNotFound` if resolution fails; `Foreign` if the module body
    /// raises while executing.
    pub fn import(&self, name: &str) -> Result<PyObject, BridgeError> {
        let cname = crate::object::cstring(name)?;
        with_gil(|py| {
            debug!(module = name, "importing python module");
            let ptr = unsafe { ffi::PyImport_ImportModule(cname.as_ptr()) };
            match unsafe { ForeignRef::from_owned(ptr) } {
                Some(module) => Ok(PyObject::from_ref(module)),
                None => unsafe {
                    if ffi::PyErr_ExceptionMatches(ffi::PyExc_ImportError) != 0 {
                        ffi::PyErr_Clear();
                        Err(BridgeError::ModuleNotFound {
                            name: name.to_string(),
                        })
                    } else {
                        Err(convert::foreign_error(py))
                    }
                },
            }
        })
    }

    /// Import `module`, look up `function` on it, call it with `args`
    /// marshalled into a tuple, and unwrap the result.
    ///
    /// Use `builtins` as the module for a built-in function.
    ///
    /// # Example
    /// ```no_run
    /// use python_bridge_core_rs::{NativeValue, Runtime};
    ///
    /// let runtime = Runtime::start(Vec::<String>::new()).unwrap();
    /// let sum = runtime
    ///     .call_function("operator", "add", &[NativeValue::Int(2), NativeValue::Int(3)])
    ///     .unwrap();
    /// assert_eq!(sum, NativeValue::Int(5));
    /// ```
    pub fn call_function(
        &self,
        module: &str,
        function: &str,
        args: &[NativeValue],
    ) -> Result<NativeValue, BridgeError> {
        let func = self.import(module)?.get_attr(function)?;
        let wrapped = args
            .iter()
            .map(PyObject::new)
            .collect::<Result<Vec<_>, _>>()?;
        let tuple = PyObject::make_tuple(&wrapped)?;
        func.call(&tuple)?.to_native()
    }

    /// Finalize the interpreter.
    ///
    /// Every outstanding wrapper becomes permanently invalid; wrappers must
    /// be dropped before calling this, and ones that survive leak their
    /// reference count rather than touching finalized interpreter memory.
    /// The runtime cannot be started again in this process afterwards.
    pub fn stop(self) -> Result<(), BridgeError> {
        let _serial = OP_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match STATE.load(Ordering::Acquire) {
            STATE_LIVE => {}
            STATE_SHUT_DOWN => return Err(BridgeError::RuntimeShutDown),
            _ => return Err(BridgeError::RuntimeNotInitialized),
        }
        // Wait for in-flight wrapper drops, then shut the gate for the whole
        // finalization window.
        let _drops = FINALIZE_LOCK
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Flip state first: operations and wrapper drops must stop touching
        // the interpreter before finalization begins.
        STATE.store(STATE_SHUT_DOWN, Ordering::Release);
        let ts = MAIN_THREAD_STATE.swap(ptr::null_mut(), Ordering::AcqRel);
        unsafe {
            ffi::PyEval_RestoreThread(ts);
            if ffi::Py_FinalizeEx() < 0 {
                warn!("python interpreter finalization reported errors");
            }
        }
        info!("embedded python interpreter shut down");
        Ok(())
    }
}

/// Append each entry to `sys.path`, preserving order
fn append_search_paths<I, S>(py: Gil<'_>, paths: I) -> Result<(), BridgeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut paths = paths.into_iter().peekable();
    if paths.peek().is_none() {
        return Ok(());
    }
    unsafe {
        let sys = convert::claim(py, ffi::PyImport_ImportModule(b"sys\0".as_ptr() as *const c_char))?;
        let sys_path = convert::claim(
            py,
            ffi::PyObject_GetAttrString(sys.as_ptr(), b"path\0".as_ptr() as *const c_char),
        )?;
        for path in paths {
            let entry = convert::new_str(py, path.as_ref())?;
            // PyList_Append takes its own reference; ours drops normally
            if ffi::PyList_Append(sys_path.as_ptr(), entry.as_ptr()) != 0 {
                return Err(convert::foreign_error(py));
            }
            debug!(path = path.as_ref(), "appended interpreter search path");
        }
    }
    Ok(())
}
