//! Bidirectional conversion between NativeValue and interpreter objects
//!
//! `to_foreign` wraps (native → Python), `to_native` unwraps (Python →
//! native); both recurse over containers. Unwrapping dispatches on the
//! interpreter's own kind tag and refuses anything outside the defined
//! mapping with `UnsupportedConversion`, naming the Python type.
//!
//! Self-referential foreign containers are detected with a visited-pointer
//! stack and fail with `ConversionCycle`; native input is an owned tree and
//! cannot cycle.

use std::os::raw::c_char;
use std::ptr;

use pyo3_ffi as ffi;

use crate::error::BridgeError;
use crate::marshal::NativeValue;
use crate::object::refcount::ForeignRef;
use crate::runtime::Gil;

/// Build the interpreter-side representation of a native value.
///
/// `Str` and `Symbol` both become Python `str` objects; the symbol's
/// textual form is what crosses the boundary. Sequences become mutable
/// lists; immutable tuples are only built through the explicit
/// tuple-construction operation on the wrapper.
pub(crate) fn to_foreign(py: Gil<'_>, value: &NativeValue) -> Result<ForeignRef, BridgeError> {
    match value {
        NativeValue::Str(s) | NativeValue::Symbol(s) => new_str(py, s),
        NativeValue::Int(i) => unsafe { claim(py, ffi::PyLong_FromLongLong(*i)) },
        NativeValue::Float(f) => unsafe { claim(py, ffi::PyFloat_FromDouble(*f)) },
        NativeValue::List(items) => {
            let list = unsafe { claim(py, ffi::PyList_New(items.len() as ffi::Py_ssize_t))? };
            for (i, item) in items.iter().enumerate() {
                let elem = to_foreign(py, item)?;
                // PyList_SetItem steals the element's strong count
                let rc = unsafe {
                    ffi::PyList_SetItem(list.as_ptr(), i as ffi::Py_ssize_t, elem.into_raw())
                };
                if rc != 0 {
                    return Err(foreign_error(py));
                }
            }
            Ok(list)
        }
        NativeValue::Map(pairs) => {
            let dict = unsafe { claim(py, ffi::PyDict_New())? };
            for (key, value) in pairs {
                let key = to_foreign(py, key)?;
                let value = to_foreign(py, value)?;
                // PyDict_SetItem takes its own counts; ours drop normally.
                // An unhashable key raises TypeError inside the interpreter.
                let rc = unsafe { ffi::PyDict_SetItem(dict.as_ptr(), key.as_ptr(), value.as_ptr()) };
                if rc != 0 {
                    return Err(foreign_error(py));
                }
            }
            Ok(dict)
        }
    }
}

/// Read an interpreter object back into a native value.
///
/// Total over str, int, float, list, tuple and dict. `bool` is refused
/// before the int check: NativeValue has no boolean kind and `True` must not
/// silently degrade to `Int(1)`.
pub(crate) fn to_native(py: Gil<'_>, obj: *mut ffi::PyObject) -> Result<NativeValue, BridgeError> {
    let mut visiting = Vec::new();
    to_native_inner(py, obj, &mut visiting)
}

fn to_native_inner(
    py: Gil<'_>,
    obj: *mut ffi::PyObject,
    visiting: &mut Vec<usize>,
) -> Result<NativeValue, BridgeError> {
    unsafe {
        if ffi::PyBool_Check(obj) != 0 {
            return Err(BridgeError::UnsupportedConversion {
                kind: "bool".to_string(),
            });
        }
        if ffi::PyUnicode_Check(obj) != 0 {
            return Ok(NativeValue::Str(str_contents(py, obj)?));
        }
        if ffi::PyLong_Check(obj) != 0 {
            let value = ffi::PyLong_AsLongLong(obj);
            if value == -1 && !ffi::PyErr_Occurred().is_null() {
                // out of i64 range; surface the interpreter's OverflowError
                return Err(foreign_error(py));
            }
            return Ok(NativeValue::Int(value));
        }
        if ffi::PyFloat_Check(obj) != 0 {
            let value = ffi::PyFloat_AsDouble(obj);
            if value == -1.0 && !ffi::PyErr_Occurred().is_null() {
                return Err(foreign_error(py));
            }
            return Ok(NativeValue::Float(value));
        }
        if ffi::PyList_Check(obj) != 0 {
            enter_container(obj, visiting)?;
            let len = ffi::PyList_Size(obj);
            let mut items = Vec::with_capacity(len as usize);
            for i in 0..len {
                // borrowed reference, kept alive by the list we hold
                let elem = ffi::PyList_GetItem(obj, i);
                if elem.is_null() {
                    return Err(foreign_error(py));
                }
                items.push(to_native_inner(py, elem, visiting)?);
            }
            visiting.pop();
            return Ok(NativeValue::List(items));
        }
        if ffi::PyTuple_Check(obj) != 0 {
            enter_container(obj, visiting)?;
            let len = ffi::PyTuple_Size(obj);
            let mut items = Vec::with_capacity(len as usize);
            for i in 0..len {
                let elem = ffi::PyTuple_GetItem(obj, i);
                if elem.is_null() {
                    return Err(foreign_error(py));
                }
                items.push(to_native_inner(py, elem, visiting)?);
            }
            visiting.pop();
            return Ok(NativeValue::List(items));
        }
        if ffi::PyDict_Check(obj) != 0 {
            enter_container(obj, visiting)?;
            let mut pairs = Vec::new();
            let mut pos: ffi::Py_ssize_t = 0;
            let mut key: *mut ffi::PyObject = ptr::null_mut();
            let mut value: *mut ffi::PyObject = ptr::null_mut();
            // iterates in the dict's own (insertion) order
            while ffi::PyDict_Next(obj, &mut pos, &mut key, &mut value) != 0 {
                let k = to_native_inner(py, key, visiting)?;
                let v = to_native_inner(py, value, visiting)?;
                pairs.push((k, v));
            }
            visiting.pop();
            return Ok(NativeValue::Map(pairs));
        }
        Err(BridgeError::UnsupportedConversion {
            kind: type_name(py, obj),
        })
    }
}

/// Push a container onto the visiting stack, refusing re-entry.
///
/// The stack is popped only on the success path; error paths unwind out of
/// the whole conversion, so stale entries cannot affect a sibling. Sharing
/// without cycles (the same list referenced twice by one parent) is legal
/// because the entry is popped between the two visits.
fn enter_container(obj: *mut ffi::PyObject, visiting: &mut Vec<usize>) -> Result<(), BridgeError> {
    let addr = obj as usize;
    if visiting.contains(&addr) {
        return Err(BridgeError::ConversionCycle);
    }
    visiting.push(addr);
    Ok(())
}

/// Build a Python `str` from UTF-8 text
pub(crate) fn new_str(py: Gil<'_>, text: &str) -> Result<ForeignRef, BridgeError> {
    unsafe {
        claim(
            py,
            ffi::PyUnicode_FromStringAndSize(
                text.as_ptr() as *const c_char,
                text.len() as ffi::Py_ssize_t,
            ),
        )
    }
}

/// Claim an owned result pointer, translating NULL into the pending
/// interpreter exception.
///
/// # Safety
///
/// `ptr` must be NULL (with an exception pending) or a strong reference the
/// caller is entitled to transfer.
pub(crate) unsafe fn claim(
    py: Gil<'_>,
    ptr: *mut ffi::PyObject,
) -> Result<ForeignRef, BridgeError> {
    ForeignRef::from_owned(ptr).ok_or_else(|| foreign_error(py))
}

/// UTF-8 contents of a Python `str`
pub(crate) fn str_contents(py: Gil<'_>, obj: *mut ffi::PyObject) -> Result<String, BridgeError> {
    unsafe {
        let mut size: ffi::Py_ssize_t = 0;
        let data = ffi::PyUnicode_AsUTF8AndSize(obj, &mut size);
        if data.is_null() {
            return Err(foreign_error(py));
        }
        let bytes = std::slice::from_raw_parts(data as *const u8, size as usize);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// The interpreter's own name for an object's type (`type(obj).__name__`)
pub(crate) fn type_name(py: Gil<'_>, obj: *mut ffi::PyObject) -> String {
    unsafe {
        let tp = ffi::Py_TYPE(obj) as *mut ffi::PyObject;
        let name = ffi::PyObject_GetAttrString(tp, b"__name__\0".as_ptr() as *const c_char);
        match ForeignRef::from_owned(name) {
            Some(name) => {
                str_contents(py, name.as_ptr()).unwrap_or_else(|_| "<unknown>".to_string())
            }
            None => {
                ffi::PyErr_Clear();
                "<unknown>".to_string()
            }
        }
    }
}

/// Capture the pending interpreter exception as `BridgeError::Foreign`.
///
/// Fetches and normalizes the raised exception, records its class name and
/// rendered message, and converts the exception value to a NativeValue on a
/// best-effort basis (falling back to the message text). Always leaves the
/// interpreter with no pending error.
pub(crate) fn foreign_error(py: Gil<'_>) -> BridgeError {
    unsafe {
        let mut ptype: *mut ffi::PyObject = ptr::null_mut();
        let mut pvalue: *mut ffi::PyObject = ptr::null_mut();
        let mut ptraceback: *mut ffi::PyObject = ptr::null_mut();
        ffi::PyErr_Fetch(&mut ptype, &mut pvalue, &mut ptraceback);
        if ptype.is_null() {
            return BridgeError::Foreign {
                kind: "<unknown>".to_string(),
                message: "operation failed without a python exception".to_string(),
                payload: None,
            };
        }
        ffi::PyErr_NormalizeException(&mut ptype, &mut pvalue, &mut ptraceback);

        let exc_type = ForeignRef::from_owned(ptype);
        let exc_value = ForeignRef::from_owned(pvalue);
        let _traceback = ForeignRef::from_owned(ptraceback);

        let kind = match &exc_type {
            Some(tp) => {
                let name =
                    ffi::PyObject_GetAttrString(tp.as_ptr(), b"__name__\0".as_ptr() as *const c_char);
                match ForeignRef::from_owned(name) {
                    Some(name) => str_contents(py, name.as_ptr())
                        .unwrap_or_else(|_| "<unknown>".to_string()),
                    None => {
                        ffi::PyErr_Clear();
                        "<unknown>".to_string()
                    }
                }
            }
            None => "<unknown>".to_string(),
        };

        let message = match &exc_value {
            Some(value) => {
                let rendered = ffi::PyObject_Str(value.as_ptr());
                match ForeignRef::from_owned(rendered) {
                    Some(rendered) => {
                        str_contents(py, rendered.as_ptr()).unwrap_or_default()
                    }
                    None => {
                        ffi::PyErr_Clear();
                        String::new()
                    }
                }
            }
            None => String::new(),
        };

        let payload = exc_value
            .as_ref()
            .and_then(|value| to_native(py, value.as_ptr()).ok())
            .or_else(|| Some(NativeValue::Str(message.clone())));

        // introspection above must not leave its own error behind
        ffi::PyErr_Clear();

        BridgeError::Foreign {
            kind,
            message,
            payload,
        }
    }
}
