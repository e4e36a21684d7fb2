//! Foreign object wrapper
//!
//! `PyObject` owns exactly one strong interpreter reference and exposes the
//! bridged operation set against it: attribute access, invocation, three-way
//! comparison, tuple/list construction and type classification. Operations
//! that produce foreign results return new wrappers; reading a value back
//! into Rust goes through the conversion engine.
//!
//! Classification deliberately asks the interpreter's own introspection
//! (`inspect.isroutine` / `inspect.isclass`) instead of switching on object
//! shape host-side: Python distinguishes callables-that-are-types from
//! callables-that-are-functions in ways the host cannot observe directly.

use std::cmp::Ordering;
use std::ffi::CString;
use std::os::raw::c_char;

use pyo3_ffi as ffi;
use tracing::debug;

use crate::error::BridgeError;
use crate::marshal::{convert, NativeValue};
use crate::runtime;

pub(crate) mod refcount;

use refcount::ForeignRef;

/// Host-side handle to one interpreter object
///
/// The handle is immutable once constructed; the referent object may mutate
/// underneath it. Dropping the wrapper releases its reference count exactly
/// once. Sharing a referent between wrappers goes through [`PyObject::clone_ref`],
/// never through copying the handle.
///
/// # Example
/// ```no_run
/// use python_bridge_core_rs::{NativeValue, PyObject, Runtime};
///
/// let _runtime = Runtime::start(Vec::<String>::new()).unwrap();
/// let obj = PyObject::new(&NativeValue::from("abc")).unwrap();
/// assert_eq!(obj.to_native().unwrap(), NativeValue::from("abc"));
/// ```
#[derive(Debug)]
pub struct PyObject {
    inner: ForeignRef,
}

impl PyObject {
    /// Wrap a native value as an interpreter object
    ///
    /// # Errors
    ///
    /// `RuntimeNotInitialized` / `RuntimeShutDown` outside the live window;
    /// `Foreign` if construction raises inside the interpreter (for example
    /// an unhashable mapping key).
    pub fn new(value: &NativeValue) -> Result<PyObject, BridgeError> {
        runtime::with_gil(|py| Ok(PyObject::from_ref(convert::to_foreign(py, value)?)))
    }

    pub(crate) fn from_ref(inner: ForeignRef) -> PyObject {
        PyObject { inner }
    }

    pub(crate) fn as_ptr(&self) -> *mut ffi::PyObject {
        self.inner.as_ptr()
    }

    /// Read the wrapped object back into a native value
    ///
    /// # Errors
    ///
    /// `UnsupportedConversion` for kinds outside the defined mapping;
    /// `ConversionCycle` for self-referential containers.
    pub fn to_native(&self) -> Result<NativeValue, BridgeError> {
        runtime::with_gil(|py| convert::to_native(py, self.as_ptr()))
    }

    /// Whether the wrapped object has the named attribute.
    ///
    /// "Not found" is a defined non-error outcome (`Ok(false)`), never a
    /// suppressed error.
    pub fn has_attr(&self, name: &str) -> Result<bool, BridgeError> {
        let cname = cstring(name)?;
        runtime::with_gil(|_py| {
            Ok(unsafe { ffi::PyObject_HasAttrString(self.as_ptr(), cname.as_ptr()) } != 0)
        })
    }

    /// Fetch the named attribute as a new wrapper
    ///
    /// # Errors
    ///
    /// `AttributeNotFound` when the attribute is absent; `Foreign` when the
    /// attribute protocol raises anything else.
    pub fn get_attr(&self, name: &str) -> Result<PyObject, BridgeError> {
        let cname = cstring(name)?;
        runtime::with_gil(|py| {
            let ptr = unsafe { ffi::PyObject_GetAttrString(self.as_ptr(), cname.as_ptr()) };
            match unsafe { ForeignRef::from_owned(ptr) } {
                Some(attr) => Ok(PyObject::from_ref(attr)),
                None => unsafe {
                    if ffi::PyErr_ExceptionMatches(ffi::PyExc_AttributeError) != 0 {
                        ffi::PyErr_Clear();
                        Err(BridgeError::AttributeNotFound {
                            name: name.to_string(),
                        })
                    } else {
                        Err(convert::foreign_error(py))
                    }
                },
            }
        })
    }

    /// Set (creating if absent, overwriting if present) the named attribute
    ///
    /// # Errors
    ///
    /// `Foreign` if the object forbids attribute assignment.
    pub fn set_attr(&self, name: &str, value: &PyObject) -> Result<(), BridgeError> {
        let cname = cstring(name)?;
        runtime::with_gil(|py| {
            let rc =
                unsafe { ffi::PyObject_SetAttrString(self.as_ptr(), cname.as_ptr(), value.as_ptr()) };
            if rc != 0 {
                return Err(convert::foreign_error(py));
            }
            Ok(())
        })
    }

    /// Three-way comparison per the interpreter's own ordering.
    ///
    /// Python 3 has no `cmp`; the ordering is synthesized from rich
    /// comparison (EQ, then LT, then GT), which preserves antisymmetry
    /// (`a.compare(b)` is the reverse of `b.compare(a)`) and reflexivity
    /// (`a.compare(a) == Equal`).
    ///
    /// # Errors
    ///
    /// `Foreign` for unorderable operands (the interpreter's `TypeError`),
    /// or for operand pairs no relation admits (such as float NaN).
    pub fn compare(&self, other: &PyObject) -> Result<Ordering, BridgeError> {
        runtime::with_gil(|py| {
            for (op, ordering) in [
                (ffi::Py_EQ, Ordering::Equal),
                (ffi::Py_LT, Ordering::Less),
                (ffi::Py_GT, Ordering::Greater),
            ] {
                match unsafe { ffi::PyObject_RichCompareBool(self.as_ptr(), other.as_ptr(), op) } {
                    -1 => return Err(convert::foreign_error(py)),
                    0 => continue,
                    _ => return Ok(ordering),
                }
            }
            Err(BridgeError::Foreign {
                kind: "TypeError".to_string(),
                message: "objects admit no ordering relation".to_string(),
                payload: None,
            })
        })
    }

    /// Build an immutable tuple from the given wrappers, preserving order.
    ///
    /// A single argument is wrapped in a one-element tuple, never passed
    /// through unwrapped; an empty slice yields the empty tuple, the
    /// argument pack for a zero-parameter [`PyObject::call`]. Each element
    /// is shared into the tuple via the lifecycle manager's increment path.
    pub fn make_tuple(items: &[PyObject]) -> Result<PyObject, BridgeError> {
        runtime::with_gil(|py| {
            let tuple =
                unsafe { convert::claim(py, ffi::PyTuple_New(items.len() as ffi::Py_ssize_t))? };
            for (i, item) in items.iter().enumerate() {
                let elem = item.inner.clone_ref(py);
                // PyTuple_SetItem steals the element's strong count
                let rc = unsafe {
                    ffi::PyTuple_SetItem(tuple.as_ptr(), i as ffi::Py_ssize_t, elem.into_raw())
                };
                if rc != 0 {
                    return Err(convert::foreign_error(py));
                }
            }
            Ok(PyObject::from_ref(tuple))
        })
    }

    /// Build a mutable list from the given wrappers (zero or more),
    /// preserving order
    pub fn new_list(items: &[PyObject]) -> Result<PyObject, BridgeError> {
        runtime::with_gil(|py| {
            let list =
                unsafe { convert::claim(py, ffi::PyList_New(items.len() as ffi::Py_ssize_t))? };
            for (i, item) in items.iter().enumerate() {
                let elem = item.inner.clone_ref(py);
                let rc = unsafe {
                    ffi::PyList_SetItem(list.as_ptr(), i as ffi::Py_ssize_t, elem.into_raw())
                };
                if rc != 0 {
                    return Err(convert::foreign_error(py));
                }
            }
            Ok(PyObject::from_ref(list))
        })
    }

    /// Invoke the wrapped object as a callable with an argument tuple
    /// (built with [`PyObject::make_tuple`]).
    ///
    /// # Errors
    ///
    /// `NotCallable` if the object cannot be invoked; `Foreign` if the call
    /// raises inside the interpreter.
    pub fn call(&self, args: &PyObject) -> Result<PyObject, BridgeError> {
        runtime::with_gil(|py| {
            if unsafe { ffi::PyCallable_Check(self.as_ptr()) } == 0 {
                return Err(BridgeError::NotCallable);
            }
            debug!("invoking foreign callable");
            let ptr = unsafe { ffi::PyObject_CallObject(self.as_ptr(), args.as_ptr()) };
            match unsafe { ForeignRef::from_owned(ptr) } {
                Some(result) => Ok(PyObject::from_ref(result)),
                None => Err(convert::foreign_error(py)),
            }
        })
    }

    /// True for free functions and bound/unbound methods, including
    /// builtins; false for classes and plain instances.
    pub fn is_function_or_method(&self) -> Result<bool, BridgeError> {
        self.inspect_predicate(b"isroutine\0")
    }

    /// True for class objects, including builtin types; false for instances
    /// of any class.
    pub fn is_class(&self) -> Result<bool, BridgeError> {
        self.inspect_predicate(b"isclass\0")
    }

    /// Ask the interpreter's `inspect` module to classify the wrapped object
    fn inspect_predicate(&self, predicate: &'static [u8]) -> Result<bool, BridgeError> {
        runtime::with_gil(|py| unsafe {
            let inspect = convert::claim(
                py,
                ffi::PyImport_ImportModule(b"inspect\0".as_ptr() as *const c_char),
            )?;
            let func = convert::claim(
                py,
                ffi::PyObject_GetAttrString(inspect.as_ptr(), predicate.as_ptr() as *const c_char),
            )?;
            let args = convert::claim(py, ffi::PyTuple_New(1))?;
            let target = self.inner.clone_ref(py);
            if ffi::PyTuple_SetItem(args.as_ptr(), 0, target.into_raw()) != 0 {
                return Err(convert::foreign_error(py));
            }
            let verdict = convert::claim(py, ffi::PyObject_CallObject(func.as_ptr(), args.as_ptr()))?;
            match ffi::PyObject_IsTrue(verdict.as_ptr()) {
                -1 => Err(convert::foreign_error(py)),
                0 => Ok(false),
                _ => Ok(true),
            }
        })
    }

    /// Second independent wrapper onto the same referent, via an explicit
    /// reference-count increment
    pub fn clone_ref(&self) -> Result<PyObject, BridgeError> {
        runtime::with_gil(|py| Ok(PyObject::from_ref(self.inner.clone_ref(py))))
    }
}

/// Validate a name for the C string boundary
pub(crate) fn cstring(name: &str) -> Result<CString, BridgeError> {
    CString::new(name).map_err(|_| BridgeError::InvalidName {
        name: name.to_string(),
    })
}
