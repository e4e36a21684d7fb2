//! Python Bridge Core - Rust Engine
//!
//! Embeds the CPython interpreter and exposes Python objects to Rust as
//! wrappers that preserve Python's own semantics: the attribute protocol,
//! callable/class distinctions, rich comparison and reference lifetime.
//!
//! # Architecture
//!
//! - **marshal**: NativeValue model, classifier and the bidirectional
//!   conversion engine
//! - **object**: foreign object wrapper and reference lifecycle manager
//! - **runtime**: interpreter lifecycle, GIL serialization and module import
//! - **error**: unified error taxonomy
//!
//! # Critical Invariants
//!
//! 1. Every wrapper owns exactly one strong interpreter reference,
//!    released exactly once on drop
//! 2. At most one host-visible operation runs against the interpreter at a
//!    time (process mutex + GIL)
//! 3. Conversion never silently loses type fidelity; undefined mappings
//!    fail, they do not approximate
//!
//! # Example
//!
//! ```no_run
//! use python_bridge_core_rs::{NativeValue, PyObject, Runtime};
//!
//! let runtime = Runtime::start(Vec::<String>::new())?;
//!
//! // wrap and unwrap a native value
//! let greeting = PyObject::new(&NativeValue::from("abc"))?;
//! assert_eq!(greeting.to_native()?, NativeValue::from("abc"));
//!
//! // call a builtin: str(42) == "42"
//! let builtins = runtime.import("builtins")?;
//! let str_class = builtins.get_attr("str")?;
//! let args = PyObject::make_tuple(&[PyObject::new(&NativeValue::Int(42))?])?;
//! assert_eq!(str_class.call(&args)?.to_native()?, NativeValue::from("42"));
//! # Ok::<(), python_bridge_core_rs::BridgeError>(())
//! ```

// Module declarations
pub mod error;
pub mod marshal;
pub mod object;
pub mod runtime;

// Re-exports for convenience
pub use error::BridgeError;
pub use marshal::{NativeValue, ValueKind};
pub use object::PyObject;
pub use runtime::Runtime;
