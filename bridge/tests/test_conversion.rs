//! Tests for the bidirectional conversion engine
//!
//! Round-trip fidelity for the supported kinds, the documented symbol
//! asymmetry, and the failure modes (unsupported kinds, cycles, foreign
//! exceptions during construction).

use proptest::prelude::*;
use python_bridge_core_rs::{BridgeError, NativeValue, PyObject};

mod common;

fn sample_map() -> NativeValue {
    NativeValue::Map(vec![
        (NativeValue::from("a"), NativeValue::Int(1)),
        (NativeValue::from("b"), NativeValue::Float(2.5)),
        (NativeValue::from("c"), NativeValue::from("three")),
    ])
}

#[test]
fn test_wraps_every_native_kind() {
    common::runtime();

    let values = [
        NativeValue::from("a string"),
        NativeValue::Int(10),
        NativeValue::Float(1.2),
        NativeValue::List(vec![NativeValue::Int(1), NativeValue::from("two")]),
        NativeValue::Symbol("sym".to_string()),
        sample_map(),
    ];
    for value in &values {
        assert!(PyObject::new(value).is_ok(), "failed to wrap {:?}", value);
    }
}

#[test]
fn test_faithfully_unwraps_string() {
    common::runtime();
    let obj = PyObject::new(&NativeValue::from("abc")).unwrap();
    assert_eq!(obj.to_native().unwrap(), NativeValue::from("abc"));
}

#[test]
fn test_faithfully_unwraps_int() {
    common::runtime();
    let obj = PyObject::new(&NativeValue::Int(10)).unwrap();
    assert_eq!(obj.to_native().unwrap(), NativeValue::Int(10));
}

#[test]
fn test_faithfully_unwraps_negative_one() {
    // -1 is the C API's in-band error value for PyLong_AsLongLong
    common::runtime();
    let obj = PyObject::new(&NativeValue::Int(-1)).unwrap();
    assert_eq!(obj.to_native().unwrap(), NativeValue::Int(-1));
}

#[test]
fn test_faithfully_unwraps_float() {
    common::runtime();
    let obj = PyObject::new(&NativeValue::Float(1.2)).unwrap();
    assert_eq!(obj.to_native().unwrap(), NativeValue::Float(1.2));
}

#[test]
fn test_faithfully_unwraps_sequence() {
    common::runtime();
    let value = NativeValue::List(vec![
        NativeValue::Int(1),
        NativeValue::from("two"),
        NativeValue::Float(3.0),
        NativeValue::List(vec![NativeValue::Int(4)]),
    ]);
    let obj = PyObject::new(&value).unwrap();
    assert_eq!(obj.to_native().unwrap(), value);
}

#[test]
fn test_unwraps_empty_containers() {
    common::runtime();
    let empty_list = NativeValue::List(vec![]);
    assert_eq!(
        PyObject::new(&empty_list).unwrap().to_native().unwrap(),
        empty_list
    );

    let empty_str = NativeValue::from("");
    assert_eq!(
        PyObject::new(&empty_str).unwrap().to_native().unwrap(),
        empty_str
    );
}

#[test]
fn test_symbol_unwraps_as_text() {
    common::runtime();
    let obj = PyObject::new(&NativeValue::Symbol("sym".to_string())).unwrap();
    assert_eq!(obj.to_native().unwrap(), NativeValue::from("sym"));
}

#[test]
fn test_symbol_conversion_is_lossy_but_stable() {
    // every conversion yields the textual form, not just the first
    common::runtime();
    for _ in 0..3 {
        let obj = PyObject::new(&NativeValue::Symbol("sym".to_string())).unwrap();
        assert_eq!(obj.to_native().unwrap(), NativeValue::from("sym"));
        assert_eq!(obj.to_native().unwrap(), NativeValue::from("sym"));
    }
}

#[test]
fn test_mapping_round_trip() {
    common::runtime();
    let value = sample_map();
    let obj = PyObject::new(&value).unwrap();
    // python dicts preserve insertion order, so pair order survives too
    assert_eq!(obj.to_native().unwrap(), value);
}

#[test]
fn test_mapping_with_converted_keys_and_values() {
    common::runtime();
    let value = NativeValue::Map(vec![(
        NativeValue::Symbol("key".to_string()),
        NativeValue::List(vec![NativeValue::Int(1), NativeValue::Int(2)]),
    )]);
    let expected = NativeValue::Map(vec![(
        NativeValue::from("key"),
        NativeValue::List(vec![NativeValue::Int(1), NativeValue::Int(2)]),
    )]);
    let obj = PyObject::new(&value).unwrap();
    assert_eq!(obj.to_native().unwrap(), expected);
}

#[test]
fn test_unhashable_mapping_key_surfaces_foreign_error() {
    common::runtime();
    let value = NativeValue::Map(vec![(
        NativeValue::List(vec![NativeValue::Int(1)]),
        NativeValue::Int(2),
    )]);
    match PyObject::new(&value) {
        Err(BridgeError::Foreign { kind, .. }) => assert_eq!(kind, "TypeError"),
        other => panic!("expected foreign TypeError, got {:?}", other),
    }
}

#[test]
fn test_unsupported_foreign_kind_is_named() {
    let runtime = common::runtime();
    let objects = runtime.import("objects").unwrap();
    let none = objects.get_attr("none_value").unwrap();
    assert_eq!(
        none.to_native().unwrap_err(),
        BridgeError::UnsupportedConversion {
            kind: "NoneType".to_string()
        }
    );
}

#[test]
fn test_bool_has_no_defined_mapping() {
    // True must not degrade to Int(1)
    let runtime = common::runtime();
    let objects = runtime.import("objects").unwrap();
    let flag = objects.get_attr("flag").unwrap();
    assert_eq!(
        flag.to_native().unwrap_err(),
        BridgeError::UnsupportedConversion {
            kind: "bool".to_string()
        }
    );
}

#[test]
fn test_out_of_range_int_surfaces_overflow() {
    let runtime = common::runtime();
    let objects = runtime.import("objects").unwrap();
    let big = objects.get_attr("big_int").unwrap();
    match big.to_native() {
        Err(BridgeError::Foreign { kind, .. }) => assert_eq!(kind, "OverflowError"),
        other => panic!("expected foreign OverflowError, got {:?}", other),
    }
}

#[test]
fn test_self_referential_container_fails_with_cycle() {
    let runtime = common::runtime();
    let objects = runtime.import("objects").unwrap();
    let cycle = objects.get_attr("cycle").unwrap();
    assert_eq!(cycle.to_native().unwrap_err(), BridgeError::ConversionCycle);
}

#[test]
fn test_shared_subcontainer_is_not_a_cycle() {
    // the same inner list appearing twice under one parent is sharing, not
    // self-reference
    common::runtime();
    let inner = PyObject::new(&NativeValue::List(vec![NativeValue::Int(1)])).unwrap();
    let shared = inner.clone_ref().unwrap();
    let outer = PyObject::new_list(&[inner, shared]).unwrap();
    assert_eq!(
        outer.to_native().unwrap(),
        NativeValue::List(vec![
            NativeValue::List(vec![NativeValue::Int(1)]),
            NativeValue::List(vec![NativeValue::Int(1)]),
        ])
    );
}

fn scalar_value() -> impl Strategy<Value = NativeValue> {
    prop_oneof![
        any::<i64>().prop_map(NativeValue::Int),
        (-1.0e9..1.0e9f64).prop_map(NativeValue::Float),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(NativeValue::Str),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_scalar_round_trip(value in scalar_value()) {
        common::runtime();
        let obj = PyObject::new(&value).unwrap();
        prop_assert_eq!(obj.to_native().unwrap(), value);
    }

    #[test]
    fn prop_sequence_round_trip(items in proptest::collection::vec(scalar_value(), 0..8)) {
        common::runtime();
        let value = NativeValue::List(items);
        let obj = PyObject::new(&value).unwrap();
        prop_assert_eq!(obj.to_native().unwrap(), value);
    }

    #[test]
    fn prop_text_keyed_mapping_round_trip(
        entries in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..6)
    ) {
        common::runtime();
        let value = NativeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (NativeValue::Str(k), NativeValue::Int(v)))
                .collect(),
        );
        let obj = PyObject::new(&value).unwrap();
        prop_assert_eq!(obj.to_native().unwrap(), value);
    }
}
