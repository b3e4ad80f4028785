//! Transport frame tests for Cortex core

use cortex_core::frame::{self, infer_arg};
use cortex_core::{codec, Arg, Error, Message};
use serde_json::json;

#[test]
fn test_parse_plain_scalars() {
    let msg = frame::parse(r#"{"address":"/daemon/lorenz/create","args":["lorenz1",10,28,2.667]}"#)
        .expect("parse failed");

    assert_eq!(msg.address, "/daemon/lorenz/create");
    assert_eq!(msg.type_tags(), "siif");
    assert_eq!(msg.args[0], Arg::String("lorenz1".to_string()));
    assert_eq!(msg.args[1], Arg::Int(10));
    assert_eq!(msg.args[2], Arg::Int(28));
    match msg.args[3] {
        Arg::Float(f) => assert!((f - 2.667).abs() < 1e-6),
        ref other => panic!("expected float, got {:?}", other),
    }
}

#[test]
fn test_parse_missing_args_is_empty() {
    let msg = frame::parse(r#"{"address":"/brahma/demo/start"}"#).unwrap();
    assert!(msg.args.is_empty());

    let msg = frame::parse(r#"{"address":"/brahma/demo/start","args":null}"#).unwrap();
    assert!(msg.args.is_empty());
}

#[test]
fn test_parse_malformed() {
    let cases = [
        "not json",
        "[1,2,3]",
        r#"{"args":[1]}"#,
        r#"{"address":42,"args":[]}"#,
        r#"{"address":"","args":[]}"#,
        r#"{"address":"/daemon/x","args":"nope"}"#,
        r#"{"address":"/daemon/x","args":{"a":1}}"#,
    ];

    for case in cases {
        let result = frame::parse(case);
        assert!(
            matches!(result, Err(Error::MalformedTransportFrame(_))),
            "expected malformed frame for {}, got {:?}",
            case,
            result
        );
    }
}

#[test]
fn test_inference_rules() {
    assert_eq!(infer_arg(&json!(0)), Arg::Int(0));
    assert_eq!(infer_arg(&json!(-0.0)), Arg::Int(0));
    assert_eq!(infer_arg(&json!(1.5)), Arg::Float(1.5));
    assert_eq!(infer_arg(&json!("10")), Arg::String("10".to_string()));
    assert_eq!(infer_arg(&json!(true)), Arg::String("true".to_string()));
    assert_eq!(infer_arg(&json!(null)), Arg::String("null".to_string()));
    assert_eq!(infer_arg(&json!([1, 2])), Arg::String("[1,2]".to_string()));
    assert_eq!(infer_arg(&json!({"a": 1})), Arg::String(r#"{"a":1}"#.to_string()));
}

#[test]
fn test_tagged_args_keep_their_type() {
    assert_eq!(infer_arg(&json!({"type": "f", "value": 1.0})), Arg::Float(1.0));
    assert_eq!(infer_arg(&json!({"type": "d", "value": 2})), Arg::Double(2.0));
    assert_eq!(infer_arg(&json!({"type": "i", "value": 5})), Arg::Int(5));
    assert_eq!(
        infer_arg(&json!({"type": "s", "value": "x"})),
        Arg::String("x".to_string())
    );
}

#[test]
fn test_transport_roundtrip_preserves_types() {
    let msg = Message::new("/brahma/module/set")
        .arg("lorenz1")
        .arg(3)
        .arg(1.0f32)
        .arg(0.125f64);

    let text = frame::to_json(&msg).unwrap();
    let back = frame::parse(&text).unwrap();

    assert_eq!(back, msg);
}

#[test]
fn test_wire_to_transport_pipeline() {
    // engine datagram -> message -> browser frame
    let msg = Message::new("/brahma/organism/update")
        .arg("o1")
        .arg("Proteus")
        .arg(0.5f32)
        .arg(2);
    let decoded = codec::decode(&codec::encode(&msg).unwrap()).unwrap();

    let value: serde_json::Value = serde_json::from_str(&frame::to_json(&decoded).unwrap()).unwrap();
    assert_eq!(value["address"], "/brahma/organism/update");
    assert_eq!(value["args"][0]["value"], "o1");
    assert_eq!(value["args"][2]["type"], "f");
    assert_eq!(value["args"][3]["type"], "i");
    assert_eq!(value["args"][3]["value"], 2);
}

#[test]
fn test_plain_scalar_roundtrip_modulo_inference() {
    // 2.0 sent as a float comes back as an int once tags are stripped
    let msg = Message::new("/x").arg(2.0f32).arg(2.5f32);
    let stripped = json!({
        "address": msg.address,
        "args": [2.0, 2.5],
    });

    let back = frame::from_transport_frame(&stripped).unwrap();
    assert_eq!(back.args, vec![Arg::Int(2), Arg::Float(2.5)]);
}
