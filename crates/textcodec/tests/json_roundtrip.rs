//! Whole-document behavior of the JSON value codec: formatting, key
//! policies, and diagnostic positions.

use std::sync::Arc;

use rstest::rstest;
use textcodec::{Codec, DecodeError, Ratio, Record, RecordCodec, Value, json};

fn record(pairs: &[(&str, Value)]) -> Value {
    let mut fields = Record::new();
    for (key, value) in pairs {
        fields.insert((*key).to_owned(), value.clone());
    }
    Value::Record(fields)
}

#[test]
fn nested_document_round_trips_through_both_layouts() {
    let document = record(&[
        ("name", Value::String("séance\n".to_owned())),
        (
            "xs",
            Value::Array(vec![
                Value::Integer(-3),
                Value::Float(2.5),
                Value::Rational(Ratio::new(1, 3)),
                Value::Null,
            ]),
        ),
        ("ok", Value::Boolean(false)),
        ("empty", Value::Record(Record::new())),
    ]);
    for codec in [json::value_codec(), json::value_codec_single_line()] {
        let text = codec.encode(&document).unwrap();
        assert_eq!(codec.decode(&text).unwrap(), document);
    }
}

#[test]
fn multiline_layout_is_stable() {
    let codec = json::value_codec();
    let document = record(&[
        ("a", Value::Integer(1)),
        ("b", Value::Array(vec![Value::Boolean(true), Value::Null])),
    ]);
    let text = codec.encode(&document).unwrap();
    assert_eq!(
        text,
        "{\n    \"a\": 1,\n    \"b\": [\n        true,\n        null\n    ]\n}"
    );
    // Re-encoding the decoded value reproduces the same text.
    assert_eq!(codec.encode(&codec.decode(&text).unwrap()).unwrap(), text);
}

#[rstest]
#[case("[1, 2 3]", "Unexpected character on line 1, character 7 (got '3]', expected ',' or ']')")]
#[case("{\"a\" 1}", "Unexpected character on line 1, character 6 (got '1}', expected ':')")]
fn syntax_errors_carry_positions(#[case] text: &str, #[case] message: &str) {
    let err = json::value_codec().decode(text).unwrap_err();
    assert_eq!(err.to_string(), message);
}

#[test]
fn unterminated_string_is_incomplete() {
    let err = json::value_codec().decode("[\"abc").unwrap_err();
    assert!(matches!(err, DecodeError::Incomplete));
}

#[test]
fn trailing_data_is_rejected() {
    let err = json::value_codec().decode("1 2").unwrap_err();
    assert!(matches!(err, DecodeError::TrailingData { .. }), "{err}");
}

fn strict_point() -> RecordCodec {
    RecordCodec::new(
        "point",
        Arc::new(json::string_codec()),
        json::value_codec(),
    )
    .require("x")
    .require("y")
    .allow("label")
    .deny_unknown()
}

#[test]
fn required_keys_are_enforced() {
    let err = strict_point().decode("{\"x\": 1}").unwrap_err();
    assert!(err.to_string().contains("Required key 'y' missing"), "{err}");

    let value = strict_point()
        .decode("{\"x\": 1, \"y\": 2, \"label\": \"origin\"}")
        .unwrap();
    assert_eq!(
        value,
        record(&[
            ("x", Value::Integer(1)),
            ("y", Value::Integer(2)),
            ("label", Value::String("origin".to_owned())),
        ])
    );
}

#[test]
fn unknown_and_repeated_keys_are_rejected() {
    let codec = strict_point();
    let err = codec.decode("{\"x\": 1, \"z\": 2}").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected key 'z' on line 1, character 10"
    );

    let err = codec.decode("{\"x\": 1, \"x\": 2}").unwrap_err();
    assert_eq!(err.to_string(), "Key 'x' repeated on line 1, character 10");
}

#[test]
fn typed_records_round_trip_with_their_class() {
    let circle = json::typed_record("circle", "circle");
    let text = "{\n    \"class\": \"circle\",\n    \"radius\": 2\n}";
    let value = circle.decode(text).unwrap();
    assert_eq!(value, record(&[("radius", Value::Integer(2))]));
    assert_eq!(circle.encode(&value).unwrap(), text);
}

#[rstest]
#[case("\"a\\tb\"", "a\tb")]
#[case("\"\\x41\\u00e9\\U0001f600\"", "Aé😀")]
#[case("\"\"", "")]
fn string_escapes_decode(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(
        json::value_codec().decode(text).unwrap(),
        Value::String(expected.to_owned())
    );
}
