//! Error taxonomy for the bridge
//!
//! Every fallible operation in the crate returns `BridgeError`. Errors are
//! never swallowed: the only defined non-error outcome is `has_attr` mapping
//! "attribute absent" to `Ok(false)`. No operation retries; exceptions raised
//! inside the interpreter are assumed non-transient.

use thiserror::Error;

use crate::marshal::NativeValue;

/// Errors surfaced by wrapper operations, conversion and runtime lifecycle
#[derive(Debug, Error, PartialEq)]
pub enum BridgeError {
    /// A foreign or native value has no defined mapping.
    ///
    /// `kind` is the interpreter's own type name for the offending object
    /// (e.g. "NoneType", "set", "bool").
    #[error("no conversion defined for foreign kind '{kind}'")]
    UnsupportedConversion { kind: String },

    /// A self-referential container was met while unwrapping.
    ///
    /// Policy is fail-fast: conversion never loops on cyclic input.
    #[error("self-referential container detected during conversion")]
    ConversionCycle,

    /// `get_attr` on an attribute the foreign object does not have
    #[error("foreign object has no attribute '{name}'")]
    AttributeNotFound { name: String },

    /// `call` on a foreign object that is not invokable
    #[error("foreign object is not callable")]
    NotCallable,

    /// Module import failed to resolve
    #[error("python module '{name}' not found")]
    ModuleNotFound { name: String },

    /// An exception was raised inside the interpreter during an operation.
    ///
    /// `kind` is the exception class name, `message` its rendered text and
    /// `payload` a best-effort conversion of the exception value.
    #[error("python raised {kind}: {message}")]
    Foreign {
        kind: String,
        message: String,
        payload: Option<NativeValue>,
    },

    /// Operation attempted before `Runtime::start`
    #[error("python runtime has not been initialized")]
    RuntimeNotInitialized,

    /// Operation attempted after `Runtime::stop`
    #[error("python runtime has been shut down")]
    RuntimeShutDown,

    /// Attribute or module name contains an interior NUL byte and cannot
    /// cross the C string boundary
    #[error("invalid attribute or module name '{name}'")]
    InvalidName { name: String },
}
