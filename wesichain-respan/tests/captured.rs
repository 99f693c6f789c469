use serde::Serialize;
use serde_json::{json, Value};

use wesichain_respan::{Capture, Captured, FieldAccess};

#[derive(Serialize)]
struct ChatRequest {
    query: String,
    conversation_id: Option<String>,
    response_mode: &'static str,
}

#[test]
fn fields_read_the_same_from_maps_and_objects() {
    let map = Captured::from(json!({"outer": {"inner": "value"}}));
    let object = Captured::object(
        "Response",
        [(
            "outer",
            Captured::object("Inner", [("inner", Captured::from("value"))]),
        )],
    );

    for captured in [&map, &object] {
        assert_eq!(
            captured.path(&["outer", "inner"]).and_then(Captured::as_str),
            Some("value")
        );
        assert!(captured.path(&["outer", "missing"]).is_none());
        assert!(captured.path(&["outer", "inner", "deeper"]).is_none());
    }
}

#[test]
fn null_and_empty_values_are_skipped_when_probing() {
    let captured = Captured::from(json!({"id": null, "message_id": "", "uuid": "u-1"}));

    assert!(captured.field("id").is_none());
    assert_eq!(
        captured
            .first_non_empty(&[&["id"], &["message_id"], &["uuid"]])
            .map(Captured::to_text),
        Some("u-1".to_string())
    );
    assert!(Captured::from("plain").field("anything").is_none());
}

#[test]
fn serialized_structs_become_typed_objects() {
    let request = ChatRequest {
        query: "hi".to_string(),
        conversation_id: None,
        response_mode: "blocking",
    };
    let captured = Captured::from_serialize("ChatRequest", &request);

    assert_eq!(captured.class_name(), Some("ChatRequest"));
    assert_eq!(captured.field("query").and_then(Captured::as_str), Some("hi"));
    assert!(captured.field("conversation_id").is_none());
    assert_eq!(
        captured.to_json(),
        json!({"query": "hi", "conversation_id": null, "response_mode": "blocking"})
    );
}

#[test]
fn enum_wrappers_serialize_as_their_value() {
    let mode = Captured::enumeration("ResponseMode::Streaming", "streaming");

    assert_eq!(mode.unwrap_enum(), &Captured::from("streaming"));
    assert_eq!(mode.to_json(), json!("streaming"));
    assert_eq!(mode.to_text(), "streaming");
}

#[test]
fn deep_values_degrade_past_the_depth_bound() {
    let deep = Captured::from(json!({"a": {"b": {"c": {"d": 1}}}}));

    assert_eq!(deep.to_json_bounded(10), json!({"a": {"b": {"c": {"d": 1}}}}));
    assert_eq!(deep.to_json_bounded(2), json!({"a": {"b": {"c": "{1 keys}"}}}));

    let list = Captured::from(json!([[1, 2], "x"]));
    assert_eq!(list.to_json_bounded(0), json!(["[2 items]", "x"]));
}

#[test]
fn text_rendering_keeps_strings_verbatim() {
    assert_eq!(Captured::from("hello").to_text(), "hello");
    assert_eq!(Captured::from(json!({"k": 1})).to_text(), "{\"k\":1}");
    assert_eq!(Captured::from(7_i64).to_text(), "7");
}

#[test]
fn capture_covers_common_result_types() {
    assert_eq!(().capture(), Captured::Null);
    assert_eq!(Some("x".to_string()).capture(), Captured::from("x"));
    assert_eq!(None::<String>.capture(), Captured::Null);
    assert_eq!(
        vec![json!(1), Value::Null].capture(),
        Captured::List(vec![Captured::from(1_i64), Captured::Null])
    );
    assert_eq!("borrowed".capture(), Captured::from("borrowed"));
    assert!(Captured::from("").is_empty());
    assert!(!Captured::from(json!({})).is_empty());
}
