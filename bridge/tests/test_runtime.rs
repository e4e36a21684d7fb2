//! Tests for the interpreter lifecycle collaborator
//!
//! Module import, search-path configuration, the one-step module-function
//! call convenience, and double-start behavior.

use python_bridge_core_rs::{BridgeError, NativeValue, Runtime};

mod common;

#[test]
fn test_import_returns_module_wrapper() {
    let sys = common::runtime().import("sys").unwrap();
    assert!(sys.has_attr("path").unwrap());
}

#[test]
fn test_search_path_makes_helper_module_importable() {
    // the fixture put tests/python on sys.path
    let objects = common::runtime().import("objects").unwrap();
    assert!(objects.has_attr("X").unwrap());
    assert!(!objects.has_attr("nope").unwrap());
}

#[test]
fn test_import_unknown_module_fails_with_module_not_found() {
    assert_eq!(
        common::runtime().import("no_such_module_anywhere").unwrap_err(),
        BridgeError::ModuleNotFound {
            name: "no_such_module_anywhere".to_string()
        }
    );
}

#[test]
fn test_import_rejects_interior_nul() {
    assert_eq!(
        common::runtime().import("bad\0module").unwrap_err(),
        BridgeError::InvalidName {
            name: "bad\0module".to_string()
        }
    );
}

#[test]
fn test_call_function_with_module_name() {
    let sum = common::runtime()
        .call_function(
            "operator",
            "add",
            &[NativeValue::Int(2), NativeValue::Int(3)],
        )
        .unwrap();
    assert_eq!(sum, NativeValue::Int(5));
}

#[test]
fn test_call_function_reaches_builtins() {
    let rendered = common::runtime()
        .call_function("builtins", "str", &[NativeValue::Int(42)])
        .unwrap();
    assert_eq!(rendered, NativeValue::from("42"));
}

#[test]
fn test_call_function_unknown_function() {
    assert_eq!(
        common::runtime()
            .call_function("operator", "no_such_callable", &[])
            .unwrap_err(),
        BridgeError::AttributeNotFound {
            name: "no_such_callable".to_string()
        }
    );
}

#[test]
fn test_second_start_is_idempotent() {
    common::runtime();
    // must not corrupt reference counts or re-initialize the interpreter
    let again = Runtime::start(Vec::<String>::new()).unwrap();
    let value = again
        .call_function("operator", "neg", &[NativeValue::Int(7)])
        .unwrap();
    assert_eq!(value, NativeValue::Int(-7));
}
